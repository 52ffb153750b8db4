//! `emlsift` — structured email dissection for threat intelligence.
//!
//! This crate recovers inspectable structure from raw `.eml` messages:
//! the nested MIME part tree (with a SHA-256 digest per part), a typed
//! header record decoded through per-field strategies, and the chain of
//! SMTP relays reconstructed from `Received` headers. Parsing is
//! best-effort by design: real-world mail is routinely malformed, and the
//! goal is to extract as much structure as possible rather than to enforce
//! RFC conformance.

pub mod cancel;
pub mod config;
pub mod email;
pub mod error;
pub mod links;
pub mod model;
pub mod parser;
