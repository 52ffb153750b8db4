//! Recursive MIME part-tree extraction.

use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::{EmailError, Result};
use crate::model::part::Part;
use crate::parser::attrs::AttributeMap;
use crate::parser::media_type::parse_content_type;
use crate::parser::multipart::MultipartReader;

/// Default cap on multipart nesting depth.
///
/// Adversarial messages nest `multipart/*` far beyond anything a mail
/// client produces; the cap bounds recursion without truncating real
/// mail.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Build the part tree for one MIME entity.
///
/// `headers` are the entity's own headers; `body` its raw body bytes.
/// For `multipart/*` entities the full raw body is retained on the
/// container part and each sub-part is recursed as a fresh
/// headers/body pair. Children keep the physical order of the source.
///
/// Structural failures (missing `Content-Type`, unparseable media type,
/// missing `boundary`, malformed multipart framing) abort the whole
/// sub-tree parse; no partial tree is returned.
pub fn build_part_tree(
    headers: AttributeMap,
    body: &[u8],
    cancel: &CancelToken,
) -> Result<Part> {
    build_part_tree_with_limit(headers, body, cancel, DEFAULT_MAX_DEPTH)
}

/// [`build_part_tree`] with an explicit nesting cap.
pub fn build_part_tree_with_limit(
    headers: AttributeMap,
    body: &[u8],
    cancel: &CancelToken,
    max_depth: usize,
) -> Result<Part> {
    build(headers, body, cancel, 0, max_depth)
}

fn build(
    headers: AttributeMap,
    body: &[u8],
    cancel: &CancelToken,
    depth: usize,
    max_depth: usize,
) -> Result<Part> {
    if depth > max_depth {
        return Err(EmailError::TooDeep(max_depth));
    }

    let raw_ct = headers
        .get("Content-Type")
        .ok_or(EmailError::MissingContentType)?;
    let media = parse_content_type(raw_ct)?;

    if !media.media_type.starts_with("multipart/") {
        debug!(
            media_type = %media.media_type,
            depth,
            bytes = body.len(),
            "leaf part"
        );
        return Ok(Part::new(
            media.media_type,
            headers,
            media.params,
            body.to_vec(),
            Vec::new(),
        ));
    }

    let boundary = media
        .params
        .get("boundary")
        .ok_or(EmailError::MissingBoundary)?
        .to_string();

    let mut reader = MultipartReader::new(body, &boundary);
    let mut children = Vec::new();
    loop {
        cancel.check()?;
        match reader.next_part()? {
            Some((sub_headers, sub_body)) => {
                children.push(build(sub_headers, sub_body, cancel, depth + 1, max_depth)?);
            }
            None => break,
        }
    }

    // A multipart container must contain at least one sub-part; a body
    // that produced none means the boundary never matched.
    if children.is_empty() {
        return Err(EmailError::Multipart(format!(
            "boundary '{boundary}' matched no sub-parts"
        )));
    }

    debug!(
        media_type = %media.media_type,
        depth,
        children = children.len(),
        boundary = %boundary,
        "multipart container"
    );

    Ok(Part::new(
        media.media_type,
        headers,
        media.params,
        body.to_vec(),
        children,
    ))
}

/// Digest a forest of parts depth-first, pre-order: each root before its
/// children, siblings in order. The first hashing error aborts the walk.
pub fn hashes(parts: &[Part]) -> Result<Vec<[u8; 32]>> {
    let mut out = Vec::new();
    for part in parts {
        out.push(part.hash()?);
        out.extend(hashes(part.children())?);
    }
    Ok(out)
}
