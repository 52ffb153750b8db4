//! Integration tests over `.eml` fixtures: part-tree shape, hashing,
//! header decoding, received-chain extraction and metrics.

use std::path::Path;

use emlsift::cancel::CancelToken;
use emlsift::email::Email;
use emlsift::error::EmailError;
use emlsift::model::metrics::Metrics;
use emlsift::model::part::Part;
use emlsift::parser::attrs::read_message;
use emlsift::parser::fields::decode_headers;
use emlsift::parser::received::{decode_transport, parse_received_chain};
use emlsift::parser::tree::{build_part_tree, hashes};

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load(name: &str) -> Vec<u8> {
    std::fs::read(fixture(name)).expect("fixture readable")
}

// ─── Part tree ──────────────────────────────────────────────────────

#[test]
fn test_nested_tree_shape() {
    let data = load("nested.eml");
    let (attrs, body) = read_message(&data).unwrap();
    let root = build_part_tree(attrs, body, &CancelToken::new()).unwrap();

    // alternative(text/plain, related(text/html, image/png)) = 5 entities.
    assert_eq!(root.count(), 5);
    assert_eq!(root.media_type(), "multipart/alternative");
    assert_eq!(root.children().len(), 2);
    assert_eq!(root.children()[0].media_type(), "text/plain");

    let related = &root.children()[1];
    assert_eq!(related.media_type(), "multipart/related");
    assert_eq!(related.children()[0].media_type(), "text/html");
    assert_eq!(related.children()[1].media_type(), "image/png");
}

#[test]
fn test_multipart_iff_nonempty_children() {
    let data = load("nested.eml");
    let (attrs, body) = read_message(&data).unwrap();
    let root = build_part_tree(attrs, body, &CancelToken::new()).unwrap();

    fn check(part: &Part) {
        assert_eq!(part.is_multipart(), !part.children().is_empty());
        for child in part.children() {
            check(child);
        }
    }
    check(&root);
}

#[test]
fn test_leaf_bodies_left_encoded() {
    let data = load("nested.eml");
    let (attrs, body) = read_message(&data).unwrap();
    let root = build_part_tree(attrs, body, &CancelToken::new()).unwrap();

    let png = &root.children()[1].children()[1];
    assert_eq!(png.encoding(), Some("base64"));
    assert!(png.body().unwrap().starts_with(b"iVBORw0KGgo"));
}

#[test]
fn test_hashes_preorder_and_idempotent() {
    let data = load("nested.eml");
    let (attrs, body) = read_message(&data).unwrap();
    let root = build_part_tree(attrs, body, &CancelToken::new()).unwrap();

    let first = hashes(std::slice::from_ref(&root)).unwrap();
    let second = hashes(std::slice::from_ref(&root)).unwrap();
    assert_eq!(first.len(), 5);
    assert_eq!(first, second);

    // Parent before children, siblings in order.
    assert_eq!(first[0], root.hash().unwrap());
    assert_eq!(first[1], root.children()[0].hash().unwrap());
    assert_eq!(first[2], root.children()[1].hash().unwrap());
}

// ─── Header record ──────────────────────────────────────────────────

#[test]
fn test_header_record_fields() {
    let data = load("nested.eml");
    let (attrs, _) = read_message(&data).unwrap();
    let record = decode_headers(&attrs, &CancelToken::new()).unwrap();

    assert_eq!(record.subject, "Re: Test Subject 2");
    assert_eq!(record.from[0].display_name, "Sender Man");
    assert_eq!(record.from[0].address, "sender@domain.com");
    assert_eq!(record.cc[0].address, "ccman@gmail.com");
    assert_eq!(
        record.message_id,
        "<0e9a21b4-01dc-e5c1-dcd6-58ce5aa61f4f@receiver.com>"
    );
    assert!(record.date.is_some());

    // Folded References header unfolds into one value with both ids.
    assert_eq!(record.references.len(), 1);
    assert!(record.references[0].contains("<2f6b7595-c01e-46e5-42bc-f263e1c4282d@receiver.com>"));
    assert!(record.references[0].contains("<9ff38d03-c4ab-89b7-9328-e99d5e24e3ba@domain.com>"));

    let media = record.content_type.as_ref().unwrap();
    assert_eq!(media.media_type, "multipart/alternative");
    assert_eq!(
        media.params.get("boundary"),
        Some("------------C70C0458A558E585ACB75FB4")
    );
}

#[test]
fn test_undeclared_headers_land_in_catch_all() {
    let data = load("nested.eml");
    let (attrs, _) = read_message(&data).unwrap();
    let record = decode_headers(&attrs, &CancelToken::new()).unwrap();

    assert!(record.additional.contains_key("User-Agent"));
    assert!(record.additional.contains_key("MIME-Version"));
    assert!(!record.additional.contains_key("Subject"));

    // Completeness: every input header is either typed or caught.
    for (name, _) in attrs.iter() {
        let declared = emlsift::parser::fields::FIELD_TABLE
            .iter()
            .any(|s| s.header.eq_ignore_ascii_case(name));
        assert!(
            declared || record.additional.contains_key(name),
            "header '{name}' was dropped"
        );
    }
}

// ─── Received chain ─────────────────────────────────────────────────

#[test]
fn test_chain_excludes_local_delivery_hop() {
    let data = load("nested.eml");
    let (attrs, _) = read_message(&data).unwrap();
    let record = decode_headers(&attrs, &CancelToken::new()).unwrap();
    assert_eq!(record.received.len(), 2);

    let chain = parse_received_chain(&record.received).unwrap();
    // The `with local for` hop is excluded; one routing hop remains.
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].by.as_deref(), Some("mta2.iomartmail.com"));
    assert!(chain[0].date.is_some());
}

#[test]
fn test_received_corpus() {
    let text = String::from_utf8(load("received.txt")).unwrap();

    let mut accepted = 0;
    for line in text.lines() {
        let value = line.trim_start_matches("Received: ");
        match decode_transport(value) {
            Ok(_) => accepted += 1,
            Err(EmailError::IgnoreTransport) => {}
            Err(e) => panic!("line [{value}] failed: {e}"),
        }
    }

    // Exactly the three routing stamps qualify.
    assert_eq!(accepted, 3);
}

// ─── Façade and metrics ─────────────────────────────────────────────

#[test]
fn test_email_facade_and_metrics() {
    let data = load("nested.eml");
    let email = Email::decode(&data, &CancelToken::new()).unwrap();
    let metrics = Metrics::compile(&email).unwrap();

    assert_eq!(metrics.subject, "Re: Test Subject 2");
    assert_eq!(metrics.envelope.from[0].address, "sender@domain.com");
    assert_eq!(metrics.hashes.len(), 5);
    assert!(metrics
        .links
        .iter()
        .any(|l| l == "https://updates.example.net/notes"));

    // The inline PNG is surfaced through the full-message parser.
    assert_eq!(email.attachments.len() + email.embedded.len(), 1);
}

#[test]
fn test_decode_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("msg.eml");
    std::fs::write(&path, load("nested.eml")).unwrap();

    let data = std::fs::read(&path).unwrap();
    let email = Email::decode(&data, &CancelToken::new()).unwrap();
    assert_eq!(email.root.count(), 5);
}

#[test]
fn test_email_close_releases_tree() {
    let data = load("nested.eml");
    let mut email = Email::decode(&data, &CancelToken::new()).unwrap();
    email.close();
    assert!(email.root.body().is_none());
    assert!(matches!(
        email.hashes(),
        Err(EmailError::NilBody)
    ));
}
