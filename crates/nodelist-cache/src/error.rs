//! Error types for the node cache.

use thiserror::Error;

/// Result type alias for nodelist-cache operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while setting up the cache.
///
/// Refresh cycles never fail as a whole; per-source failures are recorded
/// on the affected [`CachedValue`](crate::CachedValue) instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration is inconsistent.
    #[error("invalid cache configuration: {0}")]
    Config(String),
    /// The HTTP client could not be created.
    #[error(transparent)]
    Client(#[from] nodelist_reqwest::Error),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
