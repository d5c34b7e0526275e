// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

use crate::dish::{DishOptions, StoreConfig};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub cache: CacheConfig,
    pub dish: DishConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_host: String,
    pub api_port: u16,
    pub workers: Option<usize>,
}

/// Log output format
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    pub access_log: bool,
    /// Access log format (combined, common, dish or json)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// Representation cache configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    pub capacity_bytes: u64,
    pub max_age_ms: u64,
    /// Seconds between expiry sweeps; 0 disables the sweeper
    pub sweep_interval_secs: u64,
}

impl CacheConfig {
    pub const fn store_config(&self) -> StoreConfig {
        StoreConfig {
            capacity_bytes: self.capacity_bytes,
            max_age_ms: self.max_age_ms,
        }
    }
}

/// The payload served on every path
#[derive(Debug, Deserialize, Clone)]
pub struct DishConfig {
    /// Literal body, or a file path when `file` is set
    pub source: String,
    #[serde(flatten)]
    pub options: DishOptions,
}
