//! Payload sources a dish can be built from.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hyper::body::Bytes;

use crate::error::DishError;

/// Where a dish's bytes come from
#[derive(Debug, Clone)]
pub enum Source {
    /// UTF-8 text served as its bytes
    Text(String),
    /// A single in-memory buffer
    Buffer(Bytes),
    /// Pre-chunked buffers, served as their concatenation
    Chunks(Vec<Bytes>),
    /// A file read lazily on first request
    File(PathBuf),
}

/// Bytes read from a source, plus the filesystem modification time if any
#[derive(Debug, Clone)]
pub struct Loaded {
    pub bytes: Bytes,
    pub modified: Option<DateTime<Utc>>,
}

impl Source {
    /// Interpret a configured string as either a path or a literal body
    pub fn from_input(input: impl Into<String>, file: bool) -> Self {
        let input = input.into();
        if file {
            Self::File(PathBuf::from(input))
        } else {
            Self::Text(input)
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            _ => None,
        }
    }

    /// Read the payload once
    ///
    /// File sources are read and stat'ed here; failures become `SourceRead`.
    pub async fn load(&self) -> Result<Loaded, DishError> {
        match self {
            Self::Text(text) => Ok(Loaded {
                bytes: Bytes::copy_from_slice(text.as_bytes()),
                modified: None,
            }),
            Self::Buffer(buf) => Ok(Loaded {
                bytes: buf.clone(),
                modified: None,
            }),
            Self::Chunks(chunks) => Ok(Loaded {
                bytes: Bytes::from(chunks.concat()),
                modified: None,
            }),
            Self::File(path) => {
                let metadata = tokio::fs::metadata(path)
                    .await
                    .map_err(|e| DishError::source_read(path, e))?;
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| DishError::source_read(path, e))?;
                let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
                tracing::trace!(path = %path.display(), size = bytes.len(), "read file source");
                Ok(Loaded {
                    bytes: Bytes::from(bytes),
                    modified,
                })
            }
        }
    }
}

impl From<&str> for Source {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Source {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<u8>> for Source {
    fn from(buf: Vec<u8>) -> Self {
        Self::Buffer(Bytes::from(buf))
    }
}

impl From<Bytes> for Source {
    fn from(buf: Bytes) -> Self {
        Self::Buffer(buf)
    }
}

impl From<Vec<Bytes>> for Source {
    fn from(chunks: Vec<Bytes>) -> Self {
        Self::Chunks(chunks)
    }
}
