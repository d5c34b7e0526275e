//! Error types shared by the dish core and the server around it.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Failure surfaced by dish construction, population or configuration.
///
/// Cloneable so a single failed population can be handed to every caller
/// waiting on the same key.
#[derive(Debug, Clone, Error)]
pub enum DishError {
    #[error("failed to read source '{}': {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },
    #[error("encoding failed: {message}")]
    Encoding { message: String },
    #[error("invalid header '{name}': {message}")]
    InvalidHeader { name: String, message: String },
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl DishError {
    pub fn source_read(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::SourceRead {
            path: path.into(),
            source: Arc::new(err),
        }
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    pub fn invalid_header(name: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            message: message.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True when the source is a file that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SourceRead { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
