//! Raw header attributes: case-insensitive, multi-valued, order-preserving.
//!
//! Every engine in this crate consumes headers through [`AttributeMap`]:
//! the top-level message headers, each MIME sub-part's headers, and the
//! parameter list of a parsed `Content-Type` all take the same shape, so
//! the recursive tree build is uniform regardless of nesting depth.

use crate::error::Result;

/// Ordered multi-value mapping from header name to values.
///
/// Lookup is ASCII-case-insensitive. Values for a given name keep their
/// insertion order, and names keep their first-seen spelling and position.
/// Built once per message or part, immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeMap {
    entries: Vec<(String, Vec<String>)>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from `(name, value)` pairs, e.g. parsed media-type
    /// parameters.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Self::new();
        for (k, v) in pairs {
            map.insert(k.into(), v.into());
        }
        map
    }

    /// Append a value under `name`, merging case-insensitively with any
    /// existing entry.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// First value for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// All values for `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Iterate `(original_name, values)` in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a raw header block into an [`AttributeMap`].
    ///
    /// Accepts CRLF or LF line endings and RFC 822/5322 folded
    /// continuation lines (leading space or tab). Lines without a colon
    /// that are not continuations are silently skipped.
    pub fn parse(block: &str) -> Self {
        let mut map = Self::new();
        let mut open: Option<(String, String)> = None;

        for line in block.lines() {
            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some((_, value)) = open.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some((name, value)) = open.take() {
                map.insert(name, value);
            }

            if let Some(colon) = line.find(':') {
                let name = line[..colon].trim().to_string();
                let value = line[colon + 1..].trim().to_string();
                open = Some((name, value));
            }
        }

        if let Some((name, value)) = open {
            map.insert(name, value);
        }

        map
    }
}

/// Split a raw message into its header [`AttributeMap`] and body bytes.
///
/// The header block ends at the first blank line. A message without one is
/// treated as all headers and an empty body. Header bytes are decoded as
/// UTF-8, falling back to Windows-1252 (which accepts every byte).
pub fn read_message(data: &[u8]) -> Result<(AttributeMap, &[u8])> {
    let (header_end, body_start) = match find_header_end(data) {
        Some(pos) => pos,
        None => (data.len(), data.len()),
    };

    let header_text = decode_header_bytes(&data[..header_end]);
    let attrs = AttributeMap::parse(&header_text);
    Ok((attrs, &data[body_start..]))
}

/// Locate the blank line terminating the header block.
///
/// Returns `(end_of_headers, start_of_body)` byte offsets.
fn find_header_end(data: &[u8]) -> Option<(usize, usize)> {
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some((i, i + 2));
        }
        if i + 3 < data.len()
            && data[i] == b'\r'
            && data[i + 1] == b'\n'
            && data[i + 2] == b'\r'
            && data[i + 3] == b'\n'
        {
            return Some((i, i + 4));
        }
    }
    None
}

/// Decode raw header bytes to a string, stripping a UTF-8 BOM if present.
fn decode_header_bytes(bytes: &[u8]) -> String {
    let bytes = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &bytes[3..]
    } else {
        bytes
    };

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut map = AttributeMap::new();
        map.insert("Content-Type", "text/plain");
        assert_eq!(map.get("content-type"), Some("text/plain"));
        assert_eq!(map.get("CONTENT-TYPE"), Some("text/plain"));
        assert!(map.get("content-length").is_none());
    }

    #[test]
    fn test_multi_value_order_preserved() {
        let mut map = AttributeMap::new();
        map.insert("Received", "first");
        map.insert("received", "second");
        map.insert("RECEIVED", "third");
        assert_eq!(map.get_all("Received"), ["first", "second", "third"]);
        assert_eq!(map.get("Received"), Some("first"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_parse_folded_headers() {
        let block = "Subject: a very long\n\tsubject line\nTo: a@b.com\n";
        let map = AttributeMap::parse(block);
        assert_eq!(map.get("subject"), Some("a very long subject line"));
        assert_eq!(map.get("to"), Some("a@b.com"));
    }

    #[test]
    fn test_parse_skips_junk_lines() {
        let block = "Subject: hi\nnot a header line\nTo: a@b.com\n";
        let map = AttributeMap::parse(block);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_read_message_lf() {
        let data = b"Subject: hi\nTo: a@b.com\n\nbody here\n";
        let (attrs, body) = read_message(data).unwrap();
        assert_eq!(attrs.get("subject"), Some("hi"));
        assert_eq!(body, b"body here\n");
    }

    #[test]
    fn test_read_message_crlf() {
        let data = b"Subject: hi\r\nTo: a@b.com\r\n\r\nbody\r\n";
        let (attrs, body) = read_message(data).unwrap();
        assert_eq!(attrs.get("to"), Some("a@b.com"));
        assert_eq!(body, b"body\r\n");
    }

    #[test]
    fn test_read_message_without_body() {
        let data = b"Subject: hi\n";
        let (attrs, body) = read_message(data).unwrap();
        assert_eq!(attrs.get("subject"), Some("hi"));
        assert!(body.is_empty());
    }

    #[test]
    fn test_from_pairs() {
        let map = AttributeMap::from_pairs([("boundary", "B1"), ("charset", "utf-8")]);
        assert_eq!(map.get("Boundary"), Some("B1"));
        assert_eq!(map.get("charset"), Some("utf-8"));
    }
}
