//! URL extraction and safe-link unwrapping.
//!
//! Security gateways rewrite URLs through "safe link" redirectors; for
//! threat-intel purposes the original destination is what matters, so
//! extracted links are unwrapped before they are reported.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;
use url::Url;

use crate::error::{EmailError, Result};

lazy_static! {
    static ref URL_PATTERN: Regex =
        Regex::new(r"https?://[^\s]+|ftp://[^\s]+").unwrap();
}

/// Host suffixes of known safe-link redirectors.
pub const KNOWN_SAFE_LINK_SUFFIXES: &[&str] = &["safelinks.protection.outlook.com"];

/// Extract every URL from `data`, deduplicated in first-seen order, with
/// safe-link wrappers removed.
///
/// Unparseable and unrecoverable candidates are logged and skipped;
/// link extraction never fails the caller.
pub fn extract_links(data: &str) -> Vec<Url> {
    extract_links_with(data, KNOWN_SAFE_LINK_SUFFIXES)
}

/// [`extract_links`] with an explicit redirector suffix list.
pub fn extract_links_with(data: &str, safe_suffixes: &[impl AsRef<str>]) -> Vec<Url> {
    let mut out = Vec::new();
    let mut seen_raw = std::collections::HashSet::new();
    let mut seen_out = std::collections::HashSet::new();

    for found in URL_PATTERN.find_iter(data) {
        let candidate = found
            .as_str()
            .trim_end_matches('>')
            .trim_end_matches('"');

        if !seen_raw.insert(candidate.to_string()) {
            continue;
        }

        let parsed = match Url::parse(candidate) {
            Ok(u) => u,
            Err(e) => {
                warn!(url = candidate, error = %e, "skipping unparseable URL");
                continue;
            }
        };

        let unwrapped = match strip_safe_link(parsed, safe_suffixes) {
            Ok(u) => u,
            Err(e) => {
                warn!(url = candidate, error = %e, "skipping unrecoverable safe link");
                continue;
            }
        };

        // The unwrapped form may collide with a link already collected.
        if seen_out.insert(unwrapped.as_str().to_string()) {
            out.push(unwrapped);
        }
    }

    out
}

/// Remove the safe-link wrapper from a URL whose host ends with one of
/// the known redirector suffixes, recovering the `url` query parameter.
///
/// Non-wrapped URLs pass through untouched. A wrapper without a
/// recoverable target fails with [`EmailError::EmptySafeLink`].
pub fn strip_safe_link(link: Url, safe_suffixes: &[impl AsRef<str>]) -> Result<Url> {
    let host = link.host_str().unwrap_or("");
    let wrapped = safe_suffixes
        .iter()
        .any(|suffix| host.ends_with(suffix.as_ref()));
    if !wrapped {
        return Ok(link);
    }

    let target = link
        .query_pairs()
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
        .ok_or(EmailError::EmptySafeLink)?;

    Url::parse(&target).map_err(|_| EmailError::EmptySafeLink)
}
