// Management API types
// Response bodies for the cache endpoints

use serde::Serialize;

use crate::dish::StoreStats;

/// `GET /v1/cache`
#[derive(Debug, Serialize)]
pub struct CacheSnapshot {
    /// Store key of the dish this server answers with
    pub dish_key: String,
    /// Whether that key currently has a cached representation
    pub dish_cached: bool,
    #[serde(flatten)]
    pub stats: StoreStats,
}

/// What a `DELETE /v1/cache` request targeted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum InvalidationScope {
    All,
    Key(String),
    Prefix(String),
}

/// `DELETE /v1/cache` acknowledgement
#[derive(Debug, Serialize)]
pub struct InvalidationResponse {
    pub status: &'static str,
    pub scope: InvalidationScope,
    /// Entries dropped; for a full reset, the count before clearing
    pub removed: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error_detail: ErrorDetail,
}
