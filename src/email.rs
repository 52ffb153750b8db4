//! High-level message façade.
//!
//! [`Email`] ties the engines together for callers that want one call
//! per message: the typed header record, the raw MIME part tree, and
//! (via the `mail-parser` crate) decoded text/HTML bodies, attachments
//! and inline files. The core engines stay independently usable.

use mail_parser::{MessageParser, MimeHeaders};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::links;
use crate::model::part::Part;
use crate::model::record::HeaderRecord;
use crate::model::transport::ReceivedChain;
use crate::parser::attrs::{read_message, AttributeMap};
use crate::parser::fields::decode_headers;
use crate::parser::received::parse_received_chain;
use crate::parser::tree::{build_part_tree_with_limit, hashes, DEFAULT_MAX_DEPTH};

/// Assumed `Content-Type` for messages that declare none (RFC 1341 §7.1).
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=us-ascii";

/// A file attached to a message.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// An inline file referenced from the message body by content id.
#[derive(Debug, Clone)]
pub struct Embedded {
    pub content_id: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// One fully decoded message.
#[derive(Debug)]
pub struct Email {
    pub header: HeaderRecord,

    /// Root of the raw MIME part tree.
    pub root: Part,

    /// Decoded plain-text body, empty when the message has none.
    pub text: String,
    /// Decoded HTML body, empty when the message has none.
    pub html: String,

    pub attachments: Vec<Attachment>,
    pub embedded: Vec<Embedded>,
}

impl Email {
    /// Decode a raw `.eml` message.
    pub fn decode(data: &[u8], cancel: &CancelToken) -> Result<Self> {
        Self::decode_with_limit(data, cancel, DEFAULT_MAX_DEPTH)
    }

    /// [`Email::decode`] with an explicit multipart nesting cap.
    pub fn decode_with_limit(
        data: &[u8],
        cancel: &CancelToken,
        max_depth: usize,
    ) -> Result<Self> {
        let (attrs, body) = read_message(data)?;
        let header = decode_headers(&attrs, cancel)?;

        // The strict tree builder requires a Content-Type; at the message
        // level an absent header means implicit plain text.
        let mut tree_attrs = attrs.clone();
        if !tree_attrs.contains("Content-Type") {
            tree_attrs.insert("Content-Type", DEFAULT_CONTENT_TYPE);
        }
        let root = build_part_tree_with_limit(tree_attrs, body, cancel, max_depth)?;

        let mut email = Self {
            header,
            root,
            text: String::new(),
            html: String::new(),
            attachments: Vec::new(),
            embedded: Vec::new(),
        };
        email.extract_content(data);
        Ok(email)
    }

    /// Decode bodies and attachments through `mail-parser`.
    ///
    /// Best-effort: a message the full parser rejects still yields the
    /// header record and part tree.
    fn extract_content(&mut self, data: &[u8]) {
        let Some(msg) = MessageParser::default().parse(data) else {
            debug!("full-message parser rejected input, bodies left empty");
            return;
        };

        self.text = msg
            .body_text(0)
            .map(|s| s.into_owned())
            .unwrap_or_default();
        self.html = msg
            .body_html(0)
            .map(|s| s.into_owned())
            .unwrap_or_default();

        for (idx, part) in msg.attachments().enumerate() {
            let content_type = part
                .content_type()
                .map(|ct| match ct.subtype() {
                    Some(sub) => format!("{}/{}", ct.ctype(), sub),
                    None => ct.ctype().to_string(),
                })
                .unwrap_or_else(|| "application/octet-stream".to_string());

            match part.content_id() {
                Some(cid) => self.embedded.push(Embedded {
                    content_id: cid.to_string(),
                    content_type,
                    data: part.contents().to_vec(),
                }),
                None => self.attachments.push(Attachment {
                    file_name: part
                        .attachment_name()
                        .map(String::from)
                        .unwrap_or_else(|| format!("attachment_{idx}")),
                    content_type,
                    data: part.contents().to_vec(),
                }),
            }
        }
    }

    /// Pre-order SHA-256 digests over the part tree.
    pub fn hashes(&self) -> Result<Vec<[u8; 32]>> {
        hashes(std::slice::from_ref(&self.root))
    }

    /// Relay chain parsed from the raw `Received` values.
    pub fn received_chain(&self) -> Result<ReceivedChain> {
        parse_received_chain(&self.header.received)
    }

    /// Links extracted from the decoded bodies, safe-link wrappers
    /// removed.
    pub fn links(&self) -> Vec<url::Url> {
        self.links_with(links::KNOWN_SAFE_LINK_SUFFIXES)
    }

    /// [`Email::links`] with an explicit redirector suffix list.
    pub fn links_with(&self, safe_suffixes: &[impl AsRef<str>]) -> Vec<url::Url> {
        let mut corpus = String::with_capacity(self.text.len() + self.html.len() + 1);
        corpus.push_str(&self.text);
        corpus.push('\n');
        corpus.push_str(&self.html);
        links::extract_links_with(&corpus, safe_suffixes)
    }

    /// Release every part body buffer.
    pub fn close(&mut self) {
        self.root.close();
    }

    /// The message headers as an [`AttributeMap`], rebuilt from the raw
    /// input on demand.
    pub fn raw_headers(data: &[u8]) -> Result<AttributeMap> {
        read_message(data).map(|(attrs, _)| attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &[u8] = b"Subject: hello\n\
From: Sender <s@example.com>\n\
To: r@example.com\n\
Date: Fri, 7 Apr 2017 12:59:55 +0200\n\
\n\
plain body with https://a.example/x link\n";

    #[test]
    fn test_decode_without_content_type_defaults_to_text() {
        let email = Email::decode(SIMPLE, &CancelToken::new()).unwrap();
        assert_eq!(email.root.media_type(), "text/plain");
        assert_eq!(email.root.params().get("charset"), Some("us-ascii"));
        assert!(email.root.children().is_empty());
    }

    #[test]
    fn test_bodies_extracted() {
        let email = Email::decode(SIMPLE, &CancelToken::new()).unwrap();
        assert!(email.text.contains("plain body"));
        assert!(email.html.is_empty() || email.html.contains("plain body"));
    }

    #[test]
    fn test_links_from_body() {
        let email = Email::decode(SIMPLE, &CancelToken::new()).unwrap();
        let links = email.links();
        assert_eq!(links[0].as_str(), "https://a.example/x");
    }

    #[test]
    fn test_hashes_single_part() {
        let email = Email::decode(SIMPLE, &CancelToken::new()).unwrap();
        assert_eq!(email.hashes().unwrap().len(), 1);
    }

    #[test]
    fn test_close_releases_buffers() {
        let mut email = Email::decode(SIMPLE, &CancelToken::new()).unwrap();
        email.close();
        assert!(email.root.body().is_none());
    }
}
