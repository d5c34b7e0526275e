//! Content hashing and compressed variants of a payload.
//!
//! `materialize` turns loaded bytes plus a [`Profile`] into an immutable
//! [`Representation`]. The hash and both compressed variants are computed
//! concurrently on the blocking pool over the same buffer.

use std::io::Write;

use chrono::Utc;
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderValue, ETAG, LAST_MODIFIED};
use sha1::{Digest, Sha1};

use super::record::Representation;
use super::source::Loaded;
use crate::error::DishError;
use crate::http::cache;

/// Whether a MIME type is worth compressing
///
/// Compressible: `text/*`, anything ending in `json` or `xml`, and
/// `application/javascript`. Parameters after `;` are ignored.
pub fn is_compressible(mime: &str) -> bool {
    let base = crate::http::mime::base_type(mime);
    base.starts_with("text/")
        || base.ends_with("json")
        || base.ends_with("xml")
        || base == "application/javascript"
}

/// Lowercase hex SHA-1 of the payload
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// gzip (RFC 1952) encoding of the payload
pub fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// HTTP `deflate` encoding of the payload (zlib framing, RFC 1950)
pub fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Per-dish inputs to materialization, fixed at dish construction
#[derive(Debug, Clone)]
pub struct Profile {
    /// Prepared header overrides (Content-Type, Vary, Cache-Control, explicit validators)
    pub headers: HeaderMap,
    /// Produce gzip/deflate variants
    pub compress: bool,
}

async fn run_blocking<T, F>(label: &'static str, job: F) -> Result<T, DishError>
where
    T: Send + 'static,
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(DishError::encoding(format!("{label}: {e}"))),
        Err(e) => Err(DishError::encoding(format!("{label} task failed: {e}"))),
    }
}

/// Build the representation for a loaded payload
///
/// The record is returned only once every configured computation has finished.
pub async fn materialize(key: &str, loaded: Loaded, profile: &Profile) -> Result<Representation, DishError> {
    let raw = loaded.bytes;

    let hash_input = raw.clone();
    let hashing = run_blocking("hash", move || Ok(content_hash(&hash_input)));

    let (etag, gzipped, deflated) = if profile.compress {
        let gzip_input = raw.clone();
        let deflate_input = raw.clone();
        let (etag, gzipped, deflated) = tokio::try_join!(
            hashing,
            run_blocking("gzip", move || gzip(&gzip_input)),
            run_blocking("deflate", move || deflate(&deflate_input)),
        )?;
        (etag, Some(Bytes::from(gzipped)), Some(Bytes::from(deflated)))
    } else {
        (hashing.await?, None, None)
    };

    let mut headers = profile.headers.clone();

    // Explicit validators from the dish options take precedence over computed ones.
    // An unparsable override is served as given but never satisfies If-Modified-Since.
    let last_modified = match headers.get(LAST_MODIFIED) {
        Some(value) => {
            let parsed = value.to_str().ok().and_then(cache::parse_http_date);
            if parsed.is_none() {
                tracing::debug!(key, value = ?value, "last-modified override is not an HTTP date");
            }
            parsed
        }
        None => {
            let stamp = cache::truncate_to_seconds(loaded.modified.unwrap_or_else(Utc::now));
            let value = HeaderValue::from_str(&cache::format_http_date(&stamp))
                .map_err(|e| DishError::invalid_header("last-modified", e))?;
            headers.insert(LAST_MODIFIED, value);
            Some(stamp)
        }
    };
    if !headers.contains_key(ETAG) {
        let value = HeaderValue::from_str(&etag).map_err(|e| DishError::invalid_header("etag", e))?;
        headers.insert(ETAG, value);
    }

    tracing::debug!(
        key,
        raw = raw.len(),
        gzip = gzipped.as_ref().map(Bytes::len),
        deflate = deflated.as_ref().map(Bytes::len),
        "materialized representation"
    );

    Ok(Representation::new(
        key.to_string(),
        raw,
        gzipped,
        deflated,
        etag,
        last_modified,
        headers,
    ))
}
