//! The cached unit: raw bytes, compressed variants and validators for one key.

use chrono::{DateTime, Utc};
use hyper::body::Bytes;
use hyper::header::{HeaderMap, ETAG};

/// Immutable bundle produced by [`super::digest::materialize`]
///
/// Shared by reference (`Arc<Representation>`) once published; never mutated.
#[derive(Debug, Clone)]
pub struct Representation {
    key: String,
    raw: Bytes,
    gzip: Option<Bytes>,
    deflate: Option<Bytes>,
    etag: String,
    last_modified: Option<DateTime<Utc>>,
    headers: HeaderMap,
}

impl Representation {
    pub(crate) const fn new(
        key: String,
        raw: Bytes,
        gzip: Option<Bytes>,
        deflate: Option<Bytes>,
        etag: String,
        last_modified: Option<DateTime<Utc>>,
        headers: HeaderMap,
    ) -> Self {
        Self {
            key,
            raw,
            gzip,
            deflate,
            etag,
            last_modified,
            headers,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Identity-encoded payload
    pub const fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub const fn gzip(&self) -> Option<&Bytes> {
        self.gzip.as_ref()
    }

    pub const fn deflate(&self) -> Option<&Bytes> {
        self.deflate.as_ref()
    }

    /// Lowercase hex SHA-1 of the raw bytes
    pub fn etag(&self) -> &str {
        &self.etag
    }

    /// The tag `If-None-Match` is compared against: an explicit `ETag` header
    /// if one was configured, otherwise the content hash.
    pub fn entity_tag(&self) -> &str {
        self.headers
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(&self.etag)
    }

    /// Modification time, whole seconds
    ///
    /// `None` when a configured `Last-Modified` override is not an HTTP date.
    pub const fn last_modified(&self) -> Option<&DateTime<Utc>> {
        self.last_modified.as_ref()
    }

    /// Merged response headers (overrides plus computed validators)
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Bytes this record pins in memory
    pub fn weight(&self) -> usize {
        self.raw.len()
            + self.gzip.as_ref().map_or(0, Bytes::len)
            + self.deflate.as_ref().map_or(0, Bytes::len)
    }
}
