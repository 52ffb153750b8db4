//! Relay-hop model reconstructed from `Received` headers.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One parsed `Received` hop.
///
/// Only values that pass the from/by routing-shape heuristic produce a
/// `Transport`; extraction of individual fields is best-effort and a
/// field that fails to match is simply left `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transport {
    /// Queue/message id token from an `id` clause.
    pub id: Option<String>,

    /// Hostname the sending client announced during session setup
    /// (`helo=` attribute or a `HELO`/`EHLO` clause).
    pub helo: Option<String>,

    /// Receiving host from the `by` clause.
    pub by: Option<String>,

    /// Hop timestamp from the trailing `;` clause.
    pub date: Option<DateTime<Utc>>,

    // Slots for the remaining RFC 2821 §4.4 clauses. No current
    // normalization path fills them; they complete the hop model for
    // downstream consumers.
    pub via: Option<String>,
    pub with: Option<String>,
    pub from_host: Option<String>,
    pub for_path: Option<String>,
}

/// Ordered relay history: one hop per qualifying `Received` value, in
/// header order (most recent hop first, per SMTP stamping convention).
pub type ReceivedChain = Vec<Transport>;
