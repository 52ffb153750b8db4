//! Email address parsing (RFC 5322 §3.4, best-effort).

use serde::{Deserialize, Serialize};

use crate::error::{EmailError, Result};

/// A parsed email address.
///
/// # Examples
/// - `"Ana García <ana@example.com>"` → `display_name = "Ana García"`, `address = "ana@example.com"`
/// - `"user@example.com"` → `display_name = ""`, `address = "user@example.com"`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`).
    pub address: String,
}

impl EmailAddress {
    /// Parse a single address from a header value.
    ///
    /// Supported forms:
    /// - `"user@domain.com"`
    /// - `"<user@domain.com>"`
    /// - `"Display Name <user@domain.com>"`
    /// - `"\"Last, First\" <user@domain.com>"`
    ///
    /// A non-empty value with no recoverable addr-spec fails with
    /// [`EmailError::InvalidAddress`]; callers treat an empty value as
    /// "field absent" before calling this.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(EmailError::EmptyAddress);
        }

        // "Display Name <address>" or "<address>"
        if let Some(angle_start) = trimmed.rfind('<') {
            if let Some(angle_end) = trimmed.rfind('>') {
                if angle_end > angle_start {
                    let addr = trimmed[angle_start + 1..angle_end].trim();
                    if !is_addr_spec(addr) {
                        return Err(EmailError::InvalidAddress(raw.to_string()));
                    }
                    let display_name = strip_quotes(trimmed[..angle_start].trim());
                    return Ok(Self {
                        display_name,
                        address: addr.to_string(),
                    });
                }
            }
            return Err(EmailError::InvalidAddress(raw.to_string()));
        }

        // Bare address: "user@domain.com"
        if is_addr_spec(trimmed) {
            return Ok(Self {
                display_name: String::new(),
                address: trimmed.to_string(),
            });
        }

        Err(EmailError::InvalidAddress(raw.to_string()))
    }

    /// Parse a comma-separated address list, respecting quoted commas
    /// (`"Last, First" <a@b.com>, other@c.com`) and angle brackets.
    ///
    /// Empty segments are skipped; a malformed non-empty segment fails
    /// the whole list.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>> {
        let mut results = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut in_angle = false;

        for ch in raw.chars() {
            match ch {
                '"' => {
                    in_quotes = !in_quotes;
                    current.push(ch);
                }
                '<' if !in_quotes => {
                    in_angle = true;
                    current.push(ch);
                }
                '>' if !in_quotes => {
                    in_angle = false;
                    current.push(ch);
                }
                ',' if !in_quotes && !in_angle => {
                    if !current.trim().is_empty() {
                        results.push(Self::parse(&current)?);
                    }
                    current.clear();
                }
                _ => current.push(ch),
            }
        }

        if !current.trim().is_empty() {
            results.push(Self::parse(&current)?);
        }

        Ok(results)
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        if self.display_name.is_empty() {
            self.address.clone()
        } else {
            format!("{} <{}>", self.display_name, self.address)
        }
    }
}

/// Minimal addr-spec shape check: one `@` with non-empty local part and
/// a domain containing no whitespace.
fn is_addr_spec(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !s.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    }
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
