//! Dishes: prepared payloads that answer HTTP requests
//!
//! A [`Dish`] binds a [`Source`] to its options and a cache slot. Each
//! [`Dish::respond`] looks the representation up (populating it once on a
//! miss) and negotiates the response against the request headers.

pub mod digest;
pub mod negotiate;
pub mod record;
pub mod source;
pub mod store;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH,
    CONTENT_TYPE, VARY,
};
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;

pub use digest::Profile;
pub use negotiate::{negotiate, BodyChoice, Negotiated};
pub use record::Representation;
pub use source::{Loaded, Source};
pub use store::{CacheStore, StoreConfig, StoreStats};

use crate::error::DishError;
use crate::http::{cache, mime};

static NEXT_MEMORY_KEY: AtomicU64 = AtomicU64::new(0);

/// Options recognised when preparing a dish
#[derive(Debug, Clone, Deserialize)]
pub struct DishOptions {
    /// Header overrides; names are case-insensitive
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Content-Type when none is given and none can be detected
    #[serde(default)]
    pub default_content_type: Option<String>,
    /// Offer gzip/deflate variants for compressible types
    #[serde(default = "default_gzip")]
    pub gzip: bool,
    /// Seconds for `Cache-Control: public, max-age=<n>`
    #[serde(default)]
    pub max_age: Option<u64>,
    /// Status for non-304 responses
    #[serde(default)]
    pub status: Option<u16>,
    /// Treat the configured input as a file path
    #[serde(default)]
    pub file: bool,
    /// Cache key for in-memory sources; set it to share the global store
    #[serde(default)]
    pub key: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_gzip() -> bool {
    true
}

impl Default for DishOptions {
    fn default() -> Self {
        Self {
            headers: BTreeMap::new(),
            default_content_type: None,
            gzip: default_gzip(),
            max_age: None,
            status: None,
            file: false,
            key: None,
        }
    }
}

impl DishOptions {
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub const fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    #[must_use]
    pub const fn gzip(mut self, enabled: bool) -> Self {
        self.gzip = enabled;
        self
    }
}

fn parse_overrides(overrides: &BTreeMap<String, String>) -> Result<HeaderMap, DishError> {
    let mut headers = HeaderMap::new();
    for (name, value) in overrides {
        let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| DishError::invalid_header(name, e))?;
        let value = HeaderValue::from_str(value).map_err(|e| DishError::invalid_header(name, e))?;
        headers.insert(header, value);
    }
    Ok(headers)
}

/// Append `Accept-Encoding` to `Vary` unless it is already listed
fn add_vary_accept_encoding(headers: &mut HeaderMap) -> Result<(), DishError> {
    let value = match headers.get(VARY) {
        None => HeaderValue::from_static("Accept-Encoding"),
        Some(existing) => {
            let listed = existing
                .to_str()
                .is_ok_and(|v| v.to_ascii_lowercase().contains("accept-encoding"));
            if listed {
                return Ok(());
            }
            let mut joined = existing.as_bytes().to_vec();
            joined.extend_from_slice(b", Accept-Encoding");
            HeaderValue::from_bytes(&joined).map_err(|e| DishError::invalid_header("vary", e))?
        }
    };
    headers.insert(VARY, value);
    Ok(())
}

/// Turn options into the header set and compression decision for a source
fn prepare_profile(source: &Source, options: &DishOptions) -> Result<Profile, DishError> {
    let mut headers = parse_overrides(&options.headers)?;
    // Length and coding are decided per request.
    headers.remove(CONTENT_LENGTH);
    headers.remove(CONTENT_ENCODING);

    if !headers.contains_key(CONTENT_TYPE) {
        let detected = match source.path() {
            Some(path) => mime::lookup(path, options.default_content_type.as_deref()),
            None => options
                .default_content_type
                .clone()
                .unwrap_or_else(|| mime::OCTET_STREAM.to_string()),
        };
        let value = HeaderValue::from_str(&detected).map_err(|e| DishError::invalid_header("content-type", e))?;
        headers.insert(CONTENT_TYPE, value);
    }
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(mime::OCTET_STREAM);

    let compress = options.gzip && digest::is_compressible(content_type);
    if compress {
        add_vary_accept_encoding(&mut headers)?;
    }

    if let Some(max_age) = options.max_age {
        if !headers.contains_key(CACHE_CONTROL) {
            let value = HeaderValue::from_str(&cache::public_max_age(max_age))
                .map_err(|e| DishError::invalid_header("cache-control", e))?;
            headers.insert(CACHE_CONTROL, value);
        }
    }

    Ok(Profile { headers, compress })
}

/// A prepared unit of content
#[derive(Debug, Clone)]
pub struct Dish {
    source: Arc<Source>,
    profile: Arc<Profile>,
    status: StatusCode,
    key: String,
    store: Arc<CacheStore>,
}

impl Dish {
    /// Prepare an in-memory dish
    ///
    /// Unless `options.key` is set, the dish keeps its representation in a
    /// private single-entry slot rather than the shared store.
    pub fn new(source: impl Into<Source>, options: &DishOptions, store: &Arc<CacheStore>) -> Result<Self, DishError> {
        let source = source.into();
        let (key, store) = match (&source, &options.key) {
            (Source::File(path), _) => (path.to_string_lossy().into_owned(), Arc::clone(store)),
            (_, Some(key)) => (key.clone(), Arc::clone(store)),
            (_, None) => {
                let n = NEXT_MEMORY_KEY.fetch_add(1, Ordering::Relaxed);
                (format!("memory:{n}"), Arc::new(CacheStore::unbounded()))
            }
        };
        let status = match options.status {
            Some(code) => StatusCode::from_u16(code)
                .map_err(|e| DishError::config(format!("invalid status {code}: {e}")))?,
            None => StatusCode::OK,
        };
        let profile = prepare_profile(&source, options)?;

        Ok(Self {
            source: Arc::new(source),
            profile: Arc::new(profile),
            status,
            key,
            store,
        })
    }

    /// Prepare a file-backed dish, keyed by its path in the shared store
    pub fn file(path: impl Into<std::path::PathBuf>, options: &DishOptions, store: &Arc<CacheStore>) -> Result<Self, DishError> {
        Self::new(Source::File(path.into()), options, store)
    }

    /// Prepare from a configured string, honouring `options.file`
    pub fn from_input(input: impl Into<String>, options: &DishOptions, store: &Arc<CacheStore>) -> Result<Self, DishError> {
        Self::new(Source::from_input(input, options.file), options, store)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub const fn source(&self) -> &Arc<Source> {
        &self.source
    }

    /// The current representation, computed once per key on a miss
    pub async fn representation(&self) -> Result<Arc<Representation>, DishError> {
        let source = Arc::clone(&self.source);
        let profile = Arc::clone(&self.profile);
        let key = self.key.clone();
        self.store
            .get_or_populate(&self.key, move || async move {
                let loaded = source.load().await?;
                digest::materialize(&key, loaded, &profile).await
            })
            .await
    }

    /// Answer a request given its method and headers
    ///
    /// `status` overrides the dish's configured status for non-304 answers.
    pub async fn respond(
        &self,
        method: &Method,
        request: &HeaderMap,
        status: Option<StatusCode>,
    ) -> Result<Response<Full<Bytes>>, DishError> {
        let record = self.representation().await?;
        let negotiated = negotiate(&record, request, method, status.unwrap_or(self.status));
        tracing::trace!(
            key = %self.key,
            status = negotiated.status.as_u16(),
            body = ?negotiated.body,
            "negotiated response"
        );
        Ok(negotiated.into_response(&record))
    }

    /// Answer a hyper request
    pub async fn serve<B>(&self, req: &Request<B>) -> Result<Response<Full<Bytes>>, DishError> {
        self.respond(req.method(), req.headers(), None).await
    }
}
