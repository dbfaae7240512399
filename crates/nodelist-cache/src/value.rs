//! Freshness-tracked container for one data source.

use std::fmt;
use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use nodelist_reqwest::ErrorKind;
use serde::{Deserialize, Serialize};

/// Serializable projection of the most recent fetch failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Category of the failure.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl ErrorInfo {
    /// Creates a new error description.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<&nodelist_reqwest::Error> for ErrorInfo {
    fn from(error: &nodelist_reqwest::Error) -> Self {
        Self::new(error.kind(), error.to_string())
    }
}

impl From<nodelist_reqwest::Error> for ErrorInfo {
    fn from(error: nodelist_reqwest::Error) -> Self {
        Self::from(&error)
    }
}

/// Last good data, its fetch time, and the outcome of the latest attempt.
///
/// `data` survives a failed attempt; `error` and `error_at` always describe
/// the most recent one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedValue<T> {
    /// Last successfully fetched data.
    pub data: Option<T>,
    /// When `data` was fetched.
    pub fetched_at: Option<Timestamp>,
    /// Error from the latest attempt, if it failed.
    pub error: Option<ErrorInfo>,
    /// When the latest attempt failed.
    pub error_at: Option<Timestamp>,
}

impl<T> Default for CachedValue<T> {
    fn default() -> Self {
        Self {
            data: None,
            fetched_at: None,
            error: None,
            error_at: None,
        }
    }
}

impl<T> CachedValue<T> {
    /// Creates an empty value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores fresh data and clears the error fields.
    pub fn set_data(&mut self, data: T) {
        self.data = Some(data);
        self.fetched_at = Some(Timestamp::now());
        self.error = None;
        self.error_at = None;
    }

    /// Records a failed attempt, keeping any previous data.
    pub fn set_error(&mut self, error: impl Into<ErrorInfo>) {
        self.error = Some(error.into());
        self.error_at = Some(Timestamp::now());
    }

    /// Applies the outcome of a fetch.
    pub fn record<E>(&mut self, result: Result<T, E>)
    where
        E: Into<ErrorInfo>,
    {
        match result {
            Ok(data) => self.set_data(data),
            Err(error) => self.set_error(error),
        }
    }

    /// Returns whether data has ever been fetched successfully.
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Returns the time elapsed since the last successful fetch.
    pub fn age(&self) -> Option<SignedDuration> {
        self.fetched_at
            .map(|fetched_at| Timestamp::now().duration_since(fetched_at))
    }

    /// Returns `true` if there is no data yet or it is older than `duration`.
    pub fn is_older_than(&self, duration: Duration) -> bool {
        let Some(age) = self.age() else {
            return true;
        };
        let limit = SignedDuration::try_from(duration).unwrap_or(SignedDuration::MAX);
        age > limit
    }

    /// Returns the error message of the latest attempt, if it failed.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|error| error.message.as_str())
    }
}
