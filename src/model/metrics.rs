//! Per-message summary compiled for downstream feeds.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::address::EmailAddress;
use crate::email::Email;
use crate::error::Result;

/// Sender/recipient envelope of one send (or resend) event.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Envelope {
    pub id: String,
    pub date: Option<DateTime<Utc>>,
    pub sender: Option<EmailAddress>,
    pub from: Vec<EmailAddress>,
    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    pub bcc: Vec<EmailAddress>,
}

/// Flattened message summary: envelope, threading, content digests and
/// extracted links.
#[derive(Debug, Clone, Serialize)]
pub struct Metrics {
    pub subject: String,
    pub envelope: Envelope,

    /// Present when the message carries `Resent-*` headers.
    pub resent: Option<Envelope>,

    pub reply_to: Vec<EmailAddress>,
    pub in_reply_to: Vec<String>,
    pub references: Vec<String>,

    pub attachments: usize,
    pub embeds: usize,

    /// Pre-order SHA-256 digests of every MIME part, hex encoded.
    pub hashes: Vec<String>,
    pub links: Vec<String>,
}

impl Metrics {
    /// Compile the summary for a decoded message. Hashing failures
    /// propagate; everything else is already decoded.
    pub fn compile(email: &Email) -> Result<Self> {
        let h = &email.header;

        let resent = if !h.resent_from.is_empty() || h.resent_date.is_some() {
            Some(Envelope {
                id: h.resent_message_id.clone(),
                date: h.resent_date,
                sender: None,
                from: h.resent_from.clone(),
                to: h.resent_to.clone(),
                cc: h.resent_cc.clone(),
                bcc: h.resent_bcc.clone(),
            })
        } else {
            None
        };

        let hashes = email.hashes()?.iter().map(|d| hex(d)).collect();
        let links = email.links().iter().map(|u| u.as_str().to_string()).collect();

        Ok(Self {
            subject: h.subject.clone(),
            envelope: Envelope {
                id: h.message_id.clone(),
                date: h.date,
                sender: h.sender.clone(),
                from: h.from.clone(),
                to: h.to.clone(),
                cc: h.cc.clone(),
                bcc: h.bcc.clone(),
            },
            resent,
            reply_to: h.reply_to.clone(),
            in_reply_to: h.in_reply_to.clone(),
            references: h.references.clone(),
            attachments: email.attachments.len(),
            embeds: email.embedded.len(),
            hashes,
            links,
        })
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
