//! Heuristic decomposition of `Received` headers into relay hops.
//!
//! There is no single grammar for `Received` in the wild: dozens of MTAs
//! stamp mutually incompatible banners. Instead of a formal parser this
//! module follows the long-standing spam-filter approach (see the
//! SpamAssassin `Received.pm` heuristics): normalize aggressively,
//! reject whole categories of non-routing banners, then extract whatever
//! fields match. Each value runs through `Raw → Normalized → (Ignored |
//! Decomposed)`; only the normalization stage can exclude a hop, field
//! extraction never fails.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use crate::error::{EmailError, Result};
use crate::model::transport::{ReceivedChain, Transport};
use crate::parser::fields::parse_date;

lazy_static! {
    /// Routing stamps start with `from `, occasionally parenthesized.
    static ref FROM_START: Regex = Regex::new(r"(?i)^\(?from ").unwrap();

    /// `from <token> by <token>;` skeleton. When it matches, the first
    /// token must be a bracketed literal IP for the value to qualify.
    static ref FROM_BY_SKELETON: Regex =
        Regex::new(r"(?i)^from (\S+) by [^\s;]+ ?;").unwrap();
    static ref BRACKETED_IP: Regex = Regex::new(r"^\[[\d.]+\]$").unwrap();

    /// Local-delivery stamps carry no routing information.
    static ref WITH_LOCAL_FOR: Regex = Regex::new(r"\bwith\s+local\s+for\b").unwrap();

    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    /// `id <token>` or `id token`, token length >= 3, excluding angle
    /// brackets, semicolons and whitespace.
    static ref ID_TOKEN: Regex = Regex::new(r"id <?([^\s<>;]{3,})").unwrap();

    // Hostname charset per the SpamAssassin HELO heuristics.
    static ref HELO_ATTR: Regex = Regex::new(
        r"(?i)\bhelo=([-A-Za-z0-9.^+_&:=?!@%*$\\/]+)(?:[^-A-Za-z0-9.^+_&:=?!@%*$\\/]|$)"
    )
    .unwrap();
    static ref HELO_VERB: Regex = Regex::new(
        r"(?i)\b(?:HELO|EHLO) ([-A-Za-z0-9.^+_&:=?!@%*$\\/]+)(?:[^-A-Za-z0-9.^+_&:=?!@%*$\\/]|$)"
    )
    .unwrap();

    /// ` by <host>` bounded by a non-host character or end of string.
    static ref BY_HOST: Regex = Regex::new(r" by (\S+)(?:[^-A-Za-z0-9;.]|$)").unwrap();
}

/// Parse a list of raw `Received` values into an ordered chain.
///
/// Values recognized as non-routing banners are skipped (a shorter
/// chain, not an error). Any other per-hop failure propagates.
pub fn parse_received_chain(values: &[String]) -> Result<ReceivedChain> {
    let mut chain = ReceivedChain::new();

    for value in values {
        match decode_transport(value) {
            Ok(transport) => chain.push(transport),
            Err(EmailError::IgnoreTransport) => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(chain)
}

/// Decode a single `Received` value.
///
/// Fails with [`EmailError::IgnoreTransport`] for values that do not
/// carry routing information; otherwise returns a [`Transport`] with
/// whatever subset of fields could be extracted.
pub fn decode_transport(value: &str) -> Result<Transport> {
    let normalized = normalize_received(value)?;

    let mut transport = Transport::default();
    let mut rest = normalized.as_str();

    // The suffix after the last `;` is the hop timestamp. A malformed
    // timestamp is logged, not fatal.
    if let Some(last_semi) = rest.rfind(';') {
        let dt = &rest[last_semi + 1..];
        if !dt.is_empty() {
            match parse_date(dt) {
                Some(date) => transport.date = Some(date),
                None => warn!(
                    received = %normalized,
                    date = dt,
                    "failed to parse hop timestamp"
                ),
            }
        }
        rest = &rest[..last_semi];
    }

    if let Some(caps) = ID_TOKEN.captures(rest) {
        transport.id = Some(caps[1].to_string());
    }

    transport.helo = extract_helo(rest);
    transport.by = extract_by(rest);

    Ok(transport)
}

/// Normalize a raw value and apply the shape filter.
///
/// Lowercases, trims, collapses whitespace runs, requires the
/// (optionally parenthesized) `from ` start and the from/by skeleton,
/// splices missing spaces around the first occurrence of each routing
/// keyword, and finally rejects `with local for` local-delivery stamps.
fn normalize_received(value: &str) -> Result<String> {
    let lowered = value.trim().to_lowercase();
    let collapsed = WHITESPACE.replace_all(&lowered, " ").into_owned();

    if !FROM_START.is_match(&collapsed) || !passes_from_by_skeleton(&collapsed) {
        return Err(EmailError::IgnoreTransport);
    }

    let spaced = normalize_keywords(collapsed, &["by", "with", "for", "id", "via"]);

    if WITH_LOCAL_FOR.is_match(&spaced) {
        return Err(EmailError::IgnoreTransport);
    }

    Ok(spaced)
}

fn passes_from_by_skeleton(value: &str) -> bool {
    match FROM_BY_SKELETON.captures(value) {
        Some(caps) => BRACKETED_IP.is_match(&caps[1]),
        None => true,
    }
}

/// Ensure a single space before and after the first occurrence of each
/// keyword. Source banners frequently omit one side (`id 846CF2117for`);
/// occurrences beyond the first are left untouched.
fn normalize_keywords(mut value: String, keys: &[&str]) -> String {
    for key in keys {
        let Some(index) = value.find(key) else {
            continue;
        };
        if index == 0 {
            continue;
        }

        let after = index + key.len();
        if after < value.len() && value.as_bytes()[after] != b' ' {
            value.insert(after, ' ');
        }
        if value.as_bytes()[index - 1] != b' ' {
            value.insert(index, ' ');
        }
    }

    value
}

/// Announced hostname: the `helo=` attribute form wins over the
/// `HELO`/`EHLO` verb form.
fn extract_helo(value: &str) -> Option<String> {
    if let Some(caps) = HELO_ATTR.captures(value) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = HELO_VERB.captures(value) {
        return Some(caps[1].to_string());
    }
    None
}

fn extract_by(value: &str) -> Option<String> {
    BY_HOST.captures(value).map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ignored(value: &str) {
        assert!(
            matches!(decode_transport(value), Err(EmailError::IgnoreTransport)),
            "expected '{value}' to be ignored"
        );
    }

    // Non-routing banner corpus, after the SpamAssassin metadata
    // heuristics these rules derive from.
    #[test]
    fn test_ignores_non_routing_banners() {
        ignored("(qmail 27981 invoked by uid 225); 14 Mar 2003 07:24:34 -0000");
        ignored("(qmail 84907 invoked from network); 13 Feb 2003 20:59:28 -0000");
        ignored("(ofmipd 208.31.42.38); 17 Mar 2003 04:09:01 -0000");
        ignored(
            "by faerber.muc.de (OpenXP/32 v3.9.4 (Win32) alpha @ 2003-03-07-1751d); \
             07 Mar 2003 22:10:29 +0000",
        );
        ignored("by x.x.org (bulk_mailer v1.13); Wed, 26 Mar 2003 20:44:41 -0600");
        ignored(
            "by SPIDERMAN with Internet Mail Service (5.5.2653.19) id <19AF8VY2>; \
             Tue, 25 Mar 2003 11:58:27 -0500",
        );
        ignored(
            "by oak.ein.cz (Postfix, from userid 1002) id DABBD1BED3; \
             Thu, 13 Feb 2003 14:02:21 +0100 (CET)",
        );
        ignored("OTM-MIX(otm-mix00) id k5N1aDtp040896; Fri, 23 Jun 2006 10:36:14 +0900 (JST)");
        ignored(
            "at Infodrom Oldenburg (/##/ Smail-3.2.0.102 1998-Aug-2 #2) from infodrom.org \
             by finlandia.Infodrom.North.DE via smail from stdin \
             id <m1FglM8-000okjC@finlandia.Infodrom.North.DE> \
             for debian-security-announce@lists.debian.org; Thu, 18 May 2006 18:28:08 +0200 (CEST)",
        );
        ignored(
            "with ECARTIS (v1.0.0; list bind-announce); Fri, 18 Aug 2006 07:19:58 +0000 (UTC)",
        );
        ignored(
            "Message by Barricade wilhelm.eyp.ee with ESMTP id h1I7hGU06122 \
             for <spamassassin-talk@lists.sourceforge.net>; Tue, 18 Feb 2003 09:43:16 +0200",
        );
    }

    #[test]
    fn test_ignores_with_local_for() {
        ignored(
            "from www-data by wwwmail.documenta.de (Exim 4.50) with local \
             for <example@vandinter.org> id 1GFbZc-0006QV-L8; Tue, 22 Aug 2006 21:06:04 +0200",
        );
        ignored(
            "from server.yourhostingaccount.com with local  for example@vandinter.org  \
             id 1GDtdl-0002GU-QE (8710); Thu, 17 Aug 2006 21:59:17 -0400",
        );
    }

    #[test]
    fn test_ignores_plain_hostname_from_by_skeleton() {
        // `from host by host ;` with a non-IP first token is a known
        // forgery/banner shape.
        ignored("from virtual-access.org by bolero.conactive.com ; Thu, 20 Feb 2003 23:32:58 +0100");
        ignored("FROM ca-ex-bridge1.nai.com BY scwsout1.nai.com ; Fri Feb 07 10:18:12 2003 -0800");
    }

    #[test]
    fn test_accepts_bracketed_ip_skeleton() {
        let t = decode_transport(
            "from [86.122.158.69] by mta2.iomartmail.com; Thu, 2 Aug 2007 21:50:04 -0200",
        )
        .unwrap();
        assert_eq!(t.by.as_deref(), Some("mta2.iomartmail.com"));
        let date = t.date.expect("hop timestamp must parse");
        assert_eq!(date.format("%Y-%m-%d").to_string(), "2007-08-02");
    }

    #[test]
    fn test_accepts_squashed_postfix_stamp() {
        // Missing spaces around `by` and `for` must be repaired before
        // extraction.
        let t = decode_transport(
            "from av0001.technodiva.com (localhost [127.0.0.1])by  localhost.technodiva.com \
             (Postfix) with ESMTP id 846CF2117for  <proftp-user@lists.sourceforge.net>; \
             Mon,  7 Aug 2006 17:48:07 +0200 (MEST)",
        )
        .unwrap();
        assert_eq!(t.id.as_deref(), Some("846cf2117"));
        assert!(t.date.is_some());
    }

    #[test]
    fn test_extracts_helo_attribute() {
        let t = decode_transport(
            "from mail.example.org (helo=announcer.example.org) by mx.example.net \
             with esmtp id 1ABCDE-000001-AA; Thu, 20 Feb 2003 23:32:58 +0100",
        )
        .unwrap();
        assert_eq!(t.helo.as_deref(), Some("announcer.example.org"));
        assert_eq!(t.by.as_deref(), Some("mx.example.net"));
        assert_eq!(t.id.as_deref(), Some("1abcde-000001-aa"));
    }

    #[test]
    fn test_extracts_ehlo_verb() {
        let t = decode_transport(
            "from relay.example.com (EHLO outbound.example.com) (10.0.0.1) \
             by mx.example.net with SMTP; Thu, 20 Feb 2003 23:32:58 +0100",
        )
        .unwrap();
        assert_eq!(t.helo.as_deref(), Some("outbound.example.com"));
    }

    #[test]
    fn test_malformed_timestamp_is_not_fatal() {
        let t = decode_transport(
            "from relay.example.com by mx.example.net with esmtp id abc123; not a date",
        )
        .unwrap();
        assert!(t.date.is_none());
        assert_eq!(t.id.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_short_id_token_not_matched() {
        // id tokens shorter than three characters are noise.
        let t = decode_transport(
            "from relay.example.com by mx.example.net with esmtp id ab; \
             Thu, 20 Feb 2003 23:32:58 +0100",
        )
        .unwrap();
        assert!(t.id.is_none());
    }

    #[test]
    fn test_chain_skips_ignored_hops() {
        let values = vec![
            "from [86.122.158.69] by mta2.iomartmail.com; Thu, 2 Aug 2007 21:50:04 -0200"
                .to_string(),
            "(qmail 27981 invoked by uid 225); 14 Mar 2003 07:24:34 -0000".to_string(),
            "from relay.example.com by mx.example.net with esmtp id xyz789; \
             Thu, 20 Feb 2003 23:32:58 +0100"
                .to_string(),
        ];
        let chain = parse_received_chain(&values).unwrap();
        assert_eq!(chain.len(), 2);
        // Header order preserved: most recent hop first.
        assert_eq!(chain[0].by.as_deref(), Some("mta2.iomartmail.com"));
        assert_eq!(chain[1].id.as_deref(), Some("xyz789"));
    }

    #[test]
    fn test_empty_chain() {
        assert!(parse_received_chain(&[]).unwrap().is_empty());
    }
}
