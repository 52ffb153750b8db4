//! `Content-Type` normalization and media-type grammar.
//!
//! Real-world MTAs emit a long tail of malformed `Content-Type` values:
//! doubled `charset="charset="` artifacts, missing spaces after `;`, bare
//! charset names with no `charset=` key. Normalization repairs those
//! before the grammar runs, so the grammar itself can stay strict.

use crate::error::{EmailError, Result};
use crate::model::record::Media;
use crate::parser::attrs::AttributeMap;

/// Repair known malformations in a raw `Content-Type` value.
///
/// - collapses the doubled `charset="charset="` artifact,
/// - inserts a space after any `;` that lacks one,
/// - rewrites a bare ` iso-8859-1` token into `charset=iso-8859-1`,
/// - trims surrounding whitespace.
///
/// Case is left to the grammar: the media type and parameter names are
/// lowercased during parsing, parameter *values* (boundaries are
/// case-sensitive) keep their original case.
pub fn normalize_content_type(raw: &str) -> String {
    let mut value = raw.replace("charset=\"charset=\"", "charset=\"");

    let mut spaced = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        spaced.push(c);
        if c == ';' {
            if let Some(&next) = chars.peek() {
                if next != ' ' {
                    spaced.push(' ');
                }
            }
        }
    }
    value = spaced;

    value = value.replace(" iso-8859-1", "charset=iso-8859-1");

    value.trim().to_string()
}

/// Parse a normalized `Content-Type` value into a [`Media`].
///
/// Grammar: `type "/" subtype *( ";" parameter )` with parameters as
/// `token "=" (token | quoted-string)`. Failures carry the offending
/// normalized string so callers can log exactly what was rejected.
pub fn parse_media_type(normalized: &str) -> Result<Media> {
    let invalid = || EmailError::InvalidMediaType(normalized.to_string());

    let mut segments = normalized.split(';');
    let mt = segments.next().unwrap_or("").trim();
    if mt.is_empty() || !is_media_type_token(mt) {
        return Err(invalid());
    }

    let mut params = AttributeMap::new();
    for segment in segments {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let eq = segment.find('=').ok_or_else(invalid)?;
        let key = segment[..eq].trim().to_ascii_lowercase();
        if key.is_empty() || !is_token(&key) {
            return Err(invalid());
        }
        if params.contains(&key) {
            // Duplicate parameter names are ambiguous; reject.
            return Err(invalid());
        }

        let value = unquote(segment[eq + 1..].trim()).ok_or_else(invalid)?;
        params.insert(key, value);
    }

    Ok(Media {
        media_type: mt.to_ascii_lowercase(),
        params,
    })
}

/// Normalize and parse in one step.
pub fn parse_content_type(raw: &str) -> Result<Media> {
    parse_media_type(&normalize_content_type(raw))
}

/// `type/subtype`, both sides non-empty token runs, exactly one slash.
fn is_media_type_token(s: &str) -> bool {
    match s.split_once('/') {
        Some((t, sub)) => {
            !t.is_empty() && !sub.is_empty() && is_token(t) && is_token(sub)
        }
        None => is_token(s),
    }
}

/// RFC 2045 token: printable ASCII minus tspecials.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| {
            c.is_ascii_graphic()
                && !matches!(
                    c,
                    '(' | ')' | '<' | '>' | '@' | ','
                        | ';' | ':' | '\\' | '"' | '/'
                        | '[' | ']' | '?' | '='
                )
        })
}

/// Strip surrounding double quotes and resolve backslash escapes.
///
/// Returns `None` for an unterminated quoted string.
fn unquote(s: &str) -> Option<String> {
    if !s.starts_with('"') {
        return Some(s.to_string());
    }

    let inner = &s[1..];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Some(out),
            '\\' => out.push(chars.next()?),
            _ => out.push(c),
        }
    }
    None
}
