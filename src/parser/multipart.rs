//! Boundary-delimited multipart reading.
//!
//! Yields successive `(sub-headers, sub-body)` pairs from a raw multipart
//! body, distinguishing a clean end-of-parts from a malformed body. RFC
//! 2046 framing: a delimiter line is `--boundary`, the close delimiter is
//! `--boundary--`, both optionally followed by trailing whitespace; the
//! preamble before the first delimiter and the epilogue after the close
//! delimiter are ignored.

use crate::error::{EmailError, Result};
use crate::parser::attrs::AttributeMap;

/// What a scanned line turned out to be.
enum Line {
    Delimiter,
    CloseDelimiter,
    Data,
}

/// Pull-based reader over one multipart body.
pub struct MultipartReader<'a> {
    data: &'a [u8],
    boundary: Vec<u8>,
    pos: usize,
    started: bool,
    done: bool,
}

impl<'a> MultipartReader<'a> {
    pub fn new(data: &'a [u8], boundary: &str) -> Self {
        Self {
            data,
            boundary: boundary.as_bytes().to_vec(),
            pos: 0,
            started: false,
            done: false,
        }
    }

    /// Next `(sub-headers, sub-body)` pair.
    ///
    /// `Ok(None)` signals a clean end of parts. A body that ends while a
    /// part is still open (no close delimiter) is an error.
    pub fn next_part(&mut self) -> Result<Option<(AttributeMap, &'a [u8])>> {
        if self.done {
            return Ok(None);
        }

        if !self.started {
            // Skip the preamble up to the first delimiter.
            loop {
                let Some((line, _)) = self.next_line() else {
                    // No delimiter anywhere: nothing to yield.
                    self.done = true;
                    return Ok(None);
                };
                match self.classify(line) {
                    Line::Delimiter => {
                        self.started = true;
                        break;
                    }
                    Line::CloseDelimiter => {
                        self.done = true;
                        return Ok(None);
                    }
                    Line::Data => continue,
                }
            }
        }

        let headers = self.read_headers()?;
        let body = self.read_body()?;
        Ok(Some((headers, body)))
    }

    /// Consume header lines up to (and including) the blank separator.
    fn read_headers(&mut self) -> Result<AttributeMap> {
        let start = self.pos;
        loop {
            let Some((line, line_start)) = self.next_line() else {
                return Err(EmailError::Multipart(
                    "part headers truncated before blank line".into(),
                ));
            };
            if line.is_empty() {
                let block = String::from_utf8_lossy(&self.data[start..line_start]);
                return Ok(AttributeMap::parse(&block));
            }
        }
    }

    /// Consume body lines up to the next delimiter, excluding the line
    /// break that precedes it.
    fn read_body(&mut self) -> Result<&'a [u8]> {
        let start = self.pos;
        loop {
            let Some((line, line_start)) = self.next_line() else {
                return Err(EmailError::Multipart(
                    "body ended without close delimiter".into(),
                ));
            };
            match self.classify(line) {
                Line::Data => continue,
                kind => {
                    if matches!(kind, Line::CloseDelimiter) {
                        self.done = true;
                    }
                    let end = strip_trailing_newline(self.data, start, line_start);
                    return Ok(&self.data[start..end]);
                }
            }
        }
    }

    /// Next line with its start offset, `\r\n` or `\n` terminated, the
    /// terminator excluded. Advances past the terminator.
    fn next_line(&mut self) -> Option<(&'a [u8], usize)> {
        if self.pos >= self.data.len() {
            return None;
        }
        let start = self.pos;
        let rest = &self.data[start..];
        let (mut end, next) = match rest.iter().position(|&b| b == b'\n') {
            Some(nl) => (start + nl, start + nl + 1),
            None => (self.data.len(), self.data.len()),
        };
        if end > start && self.data[end - 1] == b'\r' {
            end -= 1;
        }
        self.pos = next;
        Some((&self.data[start..end], start))
    }

    fn classify(&self, line: &[u8]) -> Line {
        let Some(rest) = line.strip_prefix(b"--") else {
            return Line::Data;
        };
        let Some(rest) = rest.strip_prefix(self.boundary.as_slice()) else {
            return Line::Data;
        };
        if rest.iter().all(|b| b.is_ascii_whitespace()) {
            return Line::Delimiter;
        }
        if let Some(tail) = rest.strip_prefix(b"--") {
            if tail.iter().all(|b| b.is_ascii_whitespace()) {
                return Line::CloseDelimiter;
            }
        }
        Line::Data
    }
}

/// Back `end` off over the single line break separating body from
/// delimiter, clamped at `start` for empty bodies.
fn strip_trailing_newline(data: &[u8], start: usize, end: usize) -> usize {
    let mut end = end;
    if end > start && data[end - 1] == b'\n' {
        end -= 1;
        if end > start && data[end - 1] == b'\r' {
            end -= 1;
        }
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = b"preamble to be ignored\n\
--simple boundary\n\
Content-Type: text/plain; charset=us-ascii\n\
\n\
first part body\n\
--simple boundary\n\
Content-Type: text/html\n\
\n\
<b>second</b>\n\
--simple boundary--\n\
epilogue, also ignored\n";

    #[test]
    fn test_two_parts_in_order() {
        let mut reader = MultipartReader::new(BODY, "simple boundary");

        let (headers, body) = reader.next_part().unwrap().unwrap();
        assert_eq!(
            headers.get("content-type"),
            Some("text/plain; charset=us-ascii")
        );
        assert_eq!(body, b"first part body");

        let (headers, body) = reader.next_part().unwrap().unwrap();
        assert_eq!(headers.get("content-type"), Some("text/html"));
        assert_eq!(body, b"<b>second</b>");

        assert!(reader.next_part().unwrap().is_none());
        // End-of-parts is sticky.
        assert!(reader.next_part().unwrap().is_none());
    }

    #[test]
    fn test_crlf_framing() {
        let body = b"--B\r\nX-A: 1\r\n\r\nline one\r\nline two\r\n--B--\r\n";
        let mut reader = MultipartReader::new(body, "B");
        let (headers, part_body) = reader.next_part().unwrap().unwrap();
        assert_eq!(headers.get("x-a"), Some("1"));
        assert_eq!(part_body, b"line one\r\nline two");
        assert!(reader.next_part().unwrap().is_none());
    }

    #[test]
    fn test_empty_part_body() {
        let body = b"--B\nX-A: 1\n\n\n--B--\n";
        let mut reader = MultipartReader::new(body, "B");
        let (_, part_body) = reader.next_part().unwrap().unwrap();
        assert_eq!(part_body, b"");
    }

    #[test]
    fn test_no_delimiter_yields_nothing() {
        let mut reader = MultipartReader::new(b"just some text\n", "B");
        assert!(reader.next_part().unwrap().is_none());
    }

    #[test]
    fn test_missing_close_delimiter_is_error() {
        let body = b"--B\nX-A: 1\n\ntruncated body\n";
        let mut reader = MultipartReader::new(body, "B");
        assert!(matches!(
            reader.next_part(),
            Err(EmailError::Multipart(_))
        ));
    }

    #[test]
    fn test_boundary_prefix_line_is_data() {
        // A data line that merely starts with the boundary text must not
        // terminate the part.
        let body = b"--B\nX-A: 1\n\n--Bogus line\nreal end\n--B--\n";
        let mut reader = MultipartReader::new(body, "B");
        let (_, part_body) = reader.next_part().unwrap().unwrap();
        assert_eq!(part_body, b"--Bogus line\nreal end");
    }
}
