//! MIME part tree node with memoized content hashing.

use std::sync::Mutex;

use sha2::{Digest, Sha256};

use crate::error::{EmailError, Result};
use crate::parser::attrs::AttributeMap;

/// One content block of a message, possibly containing nested sub-parts.
///
/// The body holds the part's raw bytes exactly as they appeared in the
/// source: still transfer-encoded for leaves, and the entire raw inner
/// body (preamble, boundaries and all) for `multipart/*` containers, so
/// container content can always be re-derived. A part exclusively owns
/// its children and its buffer; [`Part::close`] releases the whole
/// subtree.
#[derive(Debug)]
pub struct Part {
    pub(crate) media_type: String,
    pub(crate) headers: AttributeMap,
    pub(crate) params: AttributeMap,
    pub(crate) body: Option<Vec<u8>>,
    pub(crate) children: Vec<Part>,

    /// Memoized SHA-256 of `body`. The mutex guarantees the digest is
    /// computed at most once even under concurrent callers.
    pub(crate) hash: Mutex<Option<[u8; 32]>>,
}

impl Part {
    pub(crate) fn new(
        media_type: String,
        headers: AttributeMap,
        params: AttributeMap,
        body: Vec<u8>,
        children: Vec<Part>,
    ) -> Self {
        Self {
            media_type,
            headers,
            params,
            body: Some(body),
            children,
            hash: Mutex::new(None),
        }
    }

    /// Normalized `type/subtype`.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// The part's own headers.
    pub fn headers(&self) -> &AttributeMap {
        &self.headers
    }

    /// Parameters from the `Content-Type` parameter list.
    pub fn params(&self) -> &AttributeMap {
        &self.params
    }

    /// The `boundary` parameter, if any.
    pub fn boundary(&self) -> Option<&str> {
        self.params.get("boundary")
    }

    /// The declared `Content-Transfer-Encoding`, reported but never
    /// applied.
    pub fn encoding(&self) -> Option<&str> {
        self.headers.get("Content-Transfer-Encoding")
    }

    /// Raw body bytes, or `None` once closed.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn is_multipart(&self) -> bool {
        self.media_type.starts_with("multipart/")
    }

    /// Ordered sub-parts, empty for leaves.
    pub fn children(&self) -> &[Part] {
        &self.children
    }

    /// SHA-256 of the raw body bytes, computed at most once and cached.
    ///
    /// Concurrent callers block on the guard until the first computation
    /// completes, then observe the cached digest. Fails with
    /// [`EmailError::NilBody`] once the part has been closed.
    pub fn hash(&self) -> Result<[u8; 32]> {
        let mut cached = self.hash.lock().expect("hash guard poisoned");

        if let Some(digest) = *cached {
            return Ok(digest);
        }

        let body = self.body.as_deref().ok_or(EmailError::NilBody)?;
        let mut hasher = Sha256::new();
        hasher.update(body);
        let digest: [u8; 32] = hasher.finalize().into();

        *cached = Some(digest);
        Ok(digest)
    }

    /// Release the body buffers of this part and every descendant.
    ///
    /// Cached hashes survive closing; requesting a hash that was never
    /// computed fails afterwards with [`EmailError::NilBody`].
    pub fn close(&mut self) {
        for child in &mut self.children {
            child.close();
        }
        self.body = None;
    }

    /// Total number of parts in this subtree, this node included.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Part::count).sum::<usize>()
    }
}

impl std::fmt::Display for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.boundary() {
            Some(b) => write!(f, "{}/{}", self.media_type, b),
            None => write!(f, "{}", self.media_type),
        }
    }
}
