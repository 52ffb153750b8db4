//! Declarative header-field decoding.
//!
//! Each recognized header is declared once in [`FIELD_TABLE`] as a
//! (field, header name, decode strategy) triple; [`decode_headers`] walks
//! the table in order and populates a [`HeaderRecord`]. Headers not
//! covered by any declaration are collected into the record's catch-all
//! map, so every input header is accounted for.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

use crate::cancel::CancelToken;
use crate::error::{EmailError, Result};
use crate::model::address::EmailAddress;
use crate::model::record::{HeaderRecord, Media};
use crate::parser::attrs::AttributeMap;
use crate::parser::media_type::parse_content_type;
use crate::parser::word::decode_encoded_words;

/// Typed destination field in the [`HeaderRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Subject,
    Sender,
    From,
    ReplyTo,
    To,
    Cc,
    Bcc,
    ContentType,
    Date,
    MessageId,
    ResentFrom,
    ResentTo,
    ResentCc,
    ResentBcc,
    ResentDate,
    ResentMessageId,
    InReplyTo,
    References,
    Priority,
    AuthenticationResults,
    DkimSignature,
    DomainKeySignature,
    ReceivedSpf,
    ReceivedDkim,
    ReceivedDomainKey,
    Received,
}

/// How a header value is decoded into its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// RFC 2047 encoded-word decode of a single string; an undecodable
    /// word falls back to the raw text.
    Word,
    /// Single mail address. Empty value means "absent"; a malformed
    /// non-empty value is a hard error.
    Address,
    /// Comma-separated address list. Absence is fine; a malformed value
    /// propagates.
    AddressList,
    /// RFC 5322/822-style date-time. Absence is fine.
    Date,
    /// Content-Type-shaped value. Absence is fine.
    MediaType,
    /// Copy raw value(s) according to the declared shape.
    Raw(Shape),
}

/// Target shape for the [`Strategy::Raw`] default strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// All values, in order.
    List,
    /// Values joined with `", "`.
    Join,
    /// Leading unsigned integer of the first value.
    Uint,
}

/// One declared field: destination, header name, strategy.
///
/// An empty header name is the "ignore" marker: the field is skipped
/// entirely and its header (if any) falls through to the catch-all.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: Field,
    pub header: &'static str,
    pub strategy: Strategy,
}

const fn spec(field: Field, header: &'static str, strategy: Strategy) -> FieldSpec {
    FieldSpec {
        field,
        header,
        strategy,
    }
}

/// The declared header set, in decode order.
pub const FIELD_TABLE: &[FieldSpec] = &[
    spec(Field::Subject, "Subject", Strategy::Word),
    spec(Field::Sender, "Sender", Strategy::Address),
    spec(Field::From, "From", Strategy::AddressList),
    spec(Field::ReplyTo, "Reply-To", Strategy::AddressList),
    spec(Field::To, "To", Strategy::AddressList),
    spec(Field::Cc, "Cc", Strategy::AddressList),
    spec(Field::Bcc, "Bcc", Strategy::AddressList),
    spec(Field::ContentType, "Content-Type", Strategy::MediaType),
    spec(Field::Date, "Date", Strategy::Date),
    spec(Field::MessageId, "Message-ID", Strategy::Raw(Shape::Join)),
    spec(Field::ResentFrom, "Resent-From", Strategy::AddressList),
    spec(Field::ResentTo, "Resent-To", Strategy::AddressList),
    spec(Field::ResentCc, "Resent-Cc", Strategy::AddressList),
    spec(Field::ResentBcc, "Resent-Bcc", Strategy::AddressList),
    spec(Field::ResentDate, "Resent-Date", Strategy::Date),
    // Ignored: some MTAs emit Resent-Message-ID inconsistently enough
    // that it is left to the catch-all.
    spec(Field::ResentMessageId, "", Strategy::Raw(Shape::Join)),
    spec(Field::InReplyTo, "In-Reply-To", Strategy::Raw(Shape::List)),
    spec(Field::References, "References", Strategy::Raw(Shape::List)),
    spec(Field::Priority, "X-Priority", Strategy::Raw(Shape::Uint)),
    spec(
        Field::AuthenticationResults,
        "Authentication-Results",
        Strategy::Raw(Shape::Join),
    ),
    spec(
        Field::DkimSignature,
        "DKIM-Signature",
        Strategy::Raw(Shape::Join),
    ),
    spec(
        Field::DomainKeySignature,
        "DomainKey-Signature",
        Strategy::Raw(Shape::Join),
    ),
    spec(Field::ReceivedSpf, "Received-SPF", Strategy::Raw(Shape::Join)),
    spec(Field::ReceivedDkim, "Received-DKIM", Strategy::Raw(Shape::Join)),
    spec(
        Field::ReceivedDomainKey,
        "Received-DomainKey",
        Strategy::Raw(Shape::Join),
    ),
    spec(Field::Received, "Received", Strategy::Raw(Shape::List)),
];

/// Decode `attrs` through [`FIELD_TABLE`] into a [`HeaderRecord`].
pub fn decode_headers(attrs: &AttributeMap, cancel: &CancelToken) -> Result<HeaderRecord> {
    decode_headers_with(attrs, FIELD_TABLE, cancel)
}

/// Decode with an explicit field table.
///
/// Decoding proceeds in table order and aborts on the first hard error;
/// cancellation is honored between fields.
pub fn decode_headers_with(
    attrs: &AttributeMap,
    table: &[FieldSpec],
    cancel: &CancelToken,
) -> Result<HeaderRecord> {
    let mut record = HeaderRecord::default();

    for spec in table {
        cancel.check()?;

        if spec.header.is_empty() {
            continue;
        }

        match spec.strategy {
            Strategy::Word => {
                if let Some(value) = attrs.get(spec.header) {
                    apply(&mut record, spec, Decoded::Text(decode_encoded_words(value)))?;
                }
            }
            Strategy::Address => {
                let Some(value) = attrs.get(spec.header) else {
                    continue;
                };
                if value.trim().is_empty() {
                    continue;
                }
                let addr = EmailAddress::parse(value)?;
                apply(&mut record, spec, Decoded::Addr(addr))?;
            }
            Strategy::AddressList => {
                let Some(value) = attrs.get(spec.header) else {
                    continue;
                };
                if value.trim().is_empty() {
                    continue;
                }
                let list = EmailAddress::parse_list(value)?;
                apply(&mut record, spec, Decoded::Addrs(list))?;
            }
            Strategy::Date => {
                let Some(value) = attrs.get(spec.header) else {
                    continue;
                };
                if value.trim().is_empty() {
                    continue;
                }
                let date = parse_date(value)
                    .ok_or_else(|| EmailError::InvalidDate(value.to_string()))?;
                apply(&mut record, spec, Decoded::Date(date))?;
            }
            Strategy::MediaType => {
                let Some(value) = attrs.get(spec.header) else {
                    continue;
                };
                if value.trim().is_empty() {
                    continue;
                }
                let media = parse_content_type(value)?;
                apply(&mut record, spec, Decoded::Media(media))?;
            }
            Strategy::Raw(shape) => {
                let values = attrs.get_all(spec.header);
                if values.is_empty() {
                    continue;
                }
                match shape {
                    Shape::List => {
                        apply(&mut record, spec, Decoded::List(values.to_vec()))?;
                    }
                    Shape::Join => {
                        apply(&mut record, spec, Decoded::Text(values.join(", ")))?;
                    }
                    Shape::Uint => {
                        let token = values[0].split_whitespace().next().unwrap_or("");
                        match token.parse::<u32>() {
                            Ok(n) => apply(&mut record, spec, Decoded::Uint(n))?,
                            Err(_) => {
                                warn!(
                                    header = spec.header,
                                    value = %values[0],
                                    "non-numeric value for numeric field, leaving absent"
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    // Everything not claimed by a declared field lands in the catch-all,
    // keyed by its original name.
    for (name, values) in attrs.iter() {
        let declared = table
            .iter()
            .any(|s| !s.header.is_empty() && s.header.eq_ignore_ascii_case(name));
        if !declared {
            record
                .additional
                .insert(name.to_string(), values.to_vec());
        }
    }

    Ok(record)
}

/// A value produced by one strategy, ready to assign.
enum Decoded {
    Text(String),
    Addr(EmailAddress),
    Addrs(Vec<EmailAddress>),
    Date(DateTime<Utc>),
    Media(Media),
    List(Vec<String>),
    Uint(u32),
}

/// Assign a decoded value into its record field.
///
/// The match is exhaustive over the sensible (field, value) pairs; a
/// declaration that routes a value shape into a field that cannot hold
/// it fails with [`EmailError::UnsupportedFieldType`].
fn apply(record: &mut HeaderRecord, spec: &FieldSpec, value: Decoded) -> Result<()> {
    use Decoded as D;
    use Field as F;

    match (spec.field, value) {
        (F::Subject, D::Text(s)) => record.subject = s,
        (F::MessageId, D::Text(s)) => record.message_id = s,
        (F::ResentMessageId, D::Text(s)) => record.resent_message_id = s,
        (F::AuthenticationResults, D::Text(s)) => record.authentication_results = s,
        (F::DkimSignature, D::Text(s)) => record.dkim_signature = s,
        (F::DomainKeySignature, D::Text(s)) => record.domain_key_signature = s,
        (F::ReceivedSpf, D::Text(s)) => record.received_spf = s,
        (F::ReceivedDkim, D::Text(s)) => record.received_dkim = s,
        (F::ReceivedDomainKey, D::Text(s)) => record.received_domain_key = s,

        (F::Sender, D::Addr(a)) => record.sender = Some(a),

        (F::From, D::Addrs(a)) => record.from = a,
        (F::ReplyTo, D::Addrs(a)) => record.reply_to = a,
        (F::To, D::Addrs(a)) => record.to = a,
        (F::Cc, D::Addrs(a)) => record.cc = a,
        (F::Bcc, D::Addrs(a)) => record.bcc = a,
        (F::ResentFrom, D::Addrs(a)) => record.resent_from = a,
        (F::ResentTo, D::Addrs(a)) => record.resent_to = a,
        (F::ResentCc, D::Addrs(a)) => record.resent_cc = a,
        (F::ResentBcc, D::Addrs(a)) => record.resent_bcc = a,

        (F::Date, D::Date(d)) => record.date = Some(d),
        (F::ResentDate, D::Date(d)) => record.resent_date = Some(d),

        (F::ContentType, D::Media(m)) => record.content_type = Some(m),

        (F::InReplyTo, D::List(v)) => record.in_reply_to = v,
        (F::References, D::List(v)) => record.references = v,
        (F::Received, D::List(v)) => record.received = v,

        (F::Priority, D::Uint(n)) => record.priority = Some(n),

        _ => return Err(EmailError::UnsupportedFieldType(spec.header)),
    }

    Ok(())
}

/// Parse an email date in common formats: RFC 2822 first, then ISO 8601,
/// then broken real-world variants (missing day-of-week, named
/// timezones).
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let mut trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Strip a trailing "(TZ name)" comment, legal CFWS in RFC 2822.
    if trimmed.ends_with(')') {
        if let Some(open) = trimmed.rfind('(') {
            trimmed = trimmed[..open].trim_end();
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let no_dow = strip_day_of_week(trimmed);

    let formats = [
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M:%S",
        "%d %b %y %H:%M:%S %z",
        "%b %d %H:%M:%S %Y %z",
        "%b %d %H:%M:%S %Y",
        "%Y-%m-%d %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S",
    ];

    let renamed_tz = replace_named_tz(&no_dow);
    for candidate in [no_dow.as_str(), renamed_tz.as_str()] {
        for fmt in &formats {
            if let Ok(dt) = DateTime::parse_from_str(candidate, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(ndt) = NaiveDateTime::parse_from_str(candidate, fmt) {
                return Some(Utc.from_utc_datetime(&ndt));
            }
        }
    }

    None
}

/// Strip a leading day-of-week prefix (`"Thu, "` or `"Thu "`).
fn strip_day_of_week(s: &str) -> String {
    let days = [
        "Mon,", "Tue,", "Wed,", "Thu,", "Fri,", "Sat,", "Sun,", "Mon ", "Tue ", "Wed ",
        "Thu ", "Fri ", "Sat ", "Sun ",
    ];
    for day in &days {
        if let Some(rest) = strip_prefix_ignore_case(s, day) {
            return rest.trim().to_string();
        }
    }
    s.to_string()
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Replace a trailing well-known timezone abbreviation with its offset.
fn replace_named_tz(s: &str) -> String {
    let tzs = [
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("UT", "+0000"),
        ("CET", "+0100"),
        ("CEST", "+0200"),
        ("JST", "+0900"),
    ];
    let mut result = s.to_string();
    for (name, offset) in &tzs {
        if result.ends_with(name) {
            let pos = result.len() - name.len();
            result.replace_range(pos.., offset);
            return result;
        }
    }
    result
}
