// Application state module
// Shared handles every connection needs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::types::Config;
use crate::dish::{CacheStore, Dish};
use crate::error::DishError;

/// Store key of a configured inline body
pub const INLINE_DISH_KEY: &str = "inline";

/// Application state
pub struct AppState {
    pub config: Config,
    pub store: Arc<CacheStore>,
    pub dish: Dish,

    // Cached config values for fast access without locks
    pub cached_access_log: AtomicBool,
}

impl AppState {
    /// Build the store and prepare the configured dish
    ///
    /// An inline body without an explicit key is stored under
    /// [`INLINE_DISH_KEY`] so the management API can see and invalidate it.
    pub fn new(config: &Config) -> Result<Self, DishError> {
        let store = Arc::new(CacheStore::new(config.cache.store_config())?);
        let mut options = config.dish.options.clone();
        if !options.file && options.key.is_none() {
            options.key = Some(INLINE_DISH_KEY.to_string());
        }
        let dish = Dish::from_input(config.dish.source.clone(), &options, &store)?;
        Ok(Self {
            config: config.clone(),
            store,
            dish,
            cached_access_log: AtomicBool::new(config.logging.access_log),
        })
    }

    pub fn access_log(&self) -> bool {
        self.cached_access_log.load(Ordering::Relaxed)
    }
}
