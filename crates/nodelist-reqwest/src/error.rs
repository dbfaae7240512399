//! Error types for node fetching.

use reqwest::StatusCode;
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use thiserror::Error;

use crate::sanitize::Rejection;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for nodelist-reqwest operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[derive(serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The address was refused by the sanitizer.
    InvalidAddress,
    /// The request exceeded its timeout.
    Timeout,
    /// The connection could not be established or was interrupted.
    Connection,
    /// The endpoint answered with a non-success status or an oversized body.
    Response,
    /// The body was not the expected JSON document.
    Decode,
    /// Anything else.
    Unexpected,
}

impl ErrorKind {
    /// Returns whether the same request may succeed later without the
    /// address changing.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::InvalidAddress)
    }
}

/// Error returned by a single fetch.
#[derive(Debug, Error)]
pub enum Error {
    /// The node address was refused before any network access.
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] Rejection),
    /// The request timed out.
    #[error("timed out fetching {url}")]
    Timeout {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The connection failed.
    #[error("connection failed for {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The endpoint returned a non-success status.
    #[error("HTTP {status} from {url}")]
    Response { url: String, status: StatusCode },
    /// The body exceeded the size cap.
    #[error("response from {url} exceeds {limit} bytes")]
    BodyTooLarge { url: String, limit: usize },
    /// The body could not be decoded.
    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    /// Any other failure.
    #[error("unexpected error fetching {url}: {source}")]
    Unexpected {
        url: String,
        #[source]
        source: BoxedError,
    },
}

impl Error {
    /// Classifies a reqwest failure for the given URL.
    pub(crate) fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url, source }
        } else if let Some(status) = source.status() {
            Self::Response { url, status }
        } else if source.is_connect() || source.is_request() || source.is_body() {
            Self::Connection { url, source }
        } else {
            Self::Unexpected {
                url,
                source: Box::new(source),
            }
        }
    }

    /// Creates an error for a failure outside of the HTTP exchange.
    pub(crate) fn unexpected(url: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        Self::Unexpected {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAddress(_) => ErrorKind::InvalidAddress,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Response { .. } | Self::BodyTooLarge { .. } => ErrorKind::Response,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Build(_) | Self::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    /// Returns the URL that was being fetched, if the address was valid.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::InvalidAddress(_) | Self::Build(_) => None,
            Self::Timeout { url, .. }
            | Self::Connection { url, .. }
            | Self::Response { url, .. }
            | Self::BodyTooLarge { url, .. }
            | Self::Decode { url, .. }
            | Self::Unexpected { url, .. } => Some(url),
        }
    }
}
