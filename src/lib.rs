//! Serve a fixed payload over HTTP with conditional GET and compression.
//!
//! A [`Dish`] wraps an in-memory body or a file. Its first request computes a
//! [`Representation`] (raw bytes, gzip and deflate variants, SHA-1 `ETag`,
//! `Last-Modified`) which is cached in a size- and age-bounded [`CacheStore`];
//! concurrent first requests share one computation. Every request is then
//! answered by pure negotiation against that record.
//!
//! ```no_run
//! use std::sync::Arc;
//! use dish::{CacheStore, Dish, DishOptions, StoreConfig};
//!
//! # async fn run() -> Result<(), dish::DishError> {
//! let store = Arc::new(CacheStore::new(StoreConfig::default())?);
//! let index = Dish::file("public/index.html", &DishOptions::default().max_age(60), &store)?;
//! let response = index
//!     .respond(&hyper::Method::GET, &hyper::HeaderMap::new(), None)
//!     .await?;
//! assert!(response.status().is_success());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod dish;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;

pub use dish::{CacheStore, Dish, DishOptions, Representation, Source, StoreConfig};
pub use error::DishError;
