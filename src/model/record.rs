//! Typed header record produced by the declarative field decoder.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::address::EmailAddress;
use crate::parser::attrs::AttributeMap;

/// A parsed `Content-Type`-shaped value: normalized `type/subtype` plus
/// its parameter list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Media {
    pub media_type: String,
    pub params: AttributeMap,
}

/// One typed field per recognized header, populated by
/// [`decode_headers`](crate::parser::fields::decode_headers).
///
/// Headers absent from the declared field table land in [`additional`],
/// keyed by their original name; no input header is silently dropped.
///
/// [`additional`]: HeaderRecord::additional
#[derive(Debug, Clone, Default)]
pub struct HeaderRecord {
    /// Decoded subject (RFC 2047 encoded-words resolved).
    pub subject: String,

    pub sender: Option<EmailAddress>,
    pub from: Vec<EmailAddress>,
    pub reply_to: Vec<EmailAddress>,
    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    pub bcc: Vec<EmailAddress>,

    /// Parsed top-level `Content-Type`.
    pub content_type: Option<Media>,

    pub date: Option<DateTime<Utc>>,
    pub message_id: String,

    pub resent_from: Vec<EmailAddress>,
    pub resent_to: Vec<EmailAddress>,
    pub resent_cc: Vec<EmailAddress>,
    pub resent_bcc: Vec<EmailAddress>,
    pub resent_date: Option<DateTime<Utc>>,
    pub resent_message_id: String,

    pub in_reply_to: Vec<String>,
    pub references: Vec<String>,

    /// `X-Priority`, when numeric.
    pub priority: Option<u32>,

    // Security-related headers, kept raw for downstream analyzers.
    pub authentication_results: String,
    pub dkim_signature: String,
    pub domain_key_signature: String,
    pub received_spf: String,
    pub received_dkim: String,
    pub received_domain_key: String,

    /// Raw `Received` values in header order (most recent hop first).
    pub received: Vec<String>,

    /// Catch-all for every header not covered by a declared field,
    /// keyed by original name.
    pub additional: BTreeMap<String, Vec<String>>,
}
