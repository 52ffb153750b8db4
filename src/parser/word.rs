//! RFC 2047 encoded-word decoding.
//!
//! Header values may embed non-ASCII text as
//! `=?charset?B|Q?encoded-text?=` tokens. Decoding is best-effort: any
//! token that fails to decode is passed through verbatim, so a malformed
//! word never fails the surrounding header.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use tracing::warn;

/// Decode every RFC 2047 encoded-word in `input`.
///
/// Whitespace between two adjacent encoded words is dropped (RFC 2047
/// §6.2); undecodable tokens are kept as-is.
pub fn decode_encoded_words(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];
        if let Some((text, consumed)) = decode_one_word(after_start) {
            result.push_str(&text);
            remaining = &after_start[consumed..];
            last_was_encoded = true;
        } else {
            result.push_str("=?");
            remaining = after_start;
            last_was_encoded = false;
        }
    }

    result.push_str(remaining);
    result
}

/// Decode a single `charset?encoding?text?=` tail (the leading `=?` is
/// already consumed). Returns the decoded text and the bytes consumed.
fn decode_one_word(s: &str) -> Option<(String, usize)> {
    let first_q = s.find('?')?;
    let charset = &s[..first_q];

    let rest = &s[first_q + 1..];
    let second_q = rest.find('?')?;
    let encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let end = rest2.find("?=")?;
    let encoded_text = &rest2[..end];

    let consumed = first_q + 1 + second_q + 1 + end + 2;

    let bytes = match encoding {
        "B" | "b" => decode_base64(encoded_text)?,
        "Q" | "q" => decode_q(encoded_text),
        _ => return None,
    };

    Some((decode_charset(charset, &bytes), consumed))
}

/// Base64 with tolerance for embedded whitespace and missing padding.
fn decode_base64(input: &str) -> Option<Vec<u8>> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD_NO_PAD.decode(cleaned.trim_end_matches('=')).ok()
}

/// Q-encoding: underscores become spaces, `=XX` becomes a byte.
fn decode_q(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                match std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                {
                    Some(byte) => {
                        result.push(byte);
                        i += 3;
                    }
                    None => {
                        result.push(b'=');
                        i += 1;
                    }
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// Decode bytes using a named charset, falling back to lossy UTF-8.
fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    if charset.eq_ignore_ascii_case("utf-8") || charset.eq_ignore_ascii_case("utf8") {
        return String::from_utf8_lossy(bytes).into_owned();
    }

    match encoding_rs::Encoding::for_label(charset.as_bytes()) {
        Some(encoding) => {
            let (decoded, _, _) = encoding.decode(bytes);
            decoded.into_owned()
        }
        None => {
            warn!(charset, "unknown charset, falling back to UTF-8 lossy");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_word() {
        assert_eq!(
            decode_encoded_words("=?UTF-8?B?SG9sYSBtdW5kbw==?="),
            "Hola mundo"
        );
    }

    #[test]
    fn test_q_word() {
        assert_eq!(decode_encoded_words("=?ISO-8859-1?Q?caf=E9?="), "café");
    }

    #[test]
    fn test_adjacent_words_whitespace_dropped() {
        assert_eq!(
            decode_encoded_words("=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="),
            "Hola mundo"
        );
    }

    #[test]
    fn test_mixed_plain_and_encoded() {
        assert_eq!(
            decode_encoded_words("Re: =?UTF-8?B?SG9sYQ==?= there"),
            "Re: Hola there"
        );
    }

    #[test]
    fn test_undecodable_word_falls_back_to_raw() {
        // "X" is not a valid encoding marker; the token passes through.
        let input = "=?UTF-8?X?garbage?=";
        assert_eq!(decode_encoded_words(input), input);
    }

    #[test]
    fn test_invalid_base64_falls_back_to_raw() {
        let input = "=?UTF-8?B?!!!not-base64!!!?=";
        assert_eq!(decode_encoded_words(input), input);
    }

    #[test]
    fn test_q_word_underscores() {
        assert_eq!(
            decode_encoded_words("=?ISO-8859-1?Q?R=E9sum=E9_du_projet?="),
            "Résumé du projet"
        );
    }

    #[test]
    fn test_utf8_base64_multibyte() {
        assert_eq!(decode_encoded_words("=?UTF-8?B?5bGx55Sw5aSq6YOO?="), "山田太郎");
    }

    #[test]
    fn test_windows1252_q_word() {
        assert_eq!(decode_encoded_words("=?Windows-1252?Q?M=FCller?="), "Müller");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(decode_encoded_words("plain subject"), "plain subject");
    }
}
