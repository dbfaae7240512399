//! Validation of node addresses before any network access.
//!
//! Node descriptors are published by whoever registers a node, so the
//! advertised address is untrusted input. It is checked here on every
//! fetch, not only when the roster is ingested.

use std::fmt;

use thiserror::Error;
use url::Url;

/// Tracing target for sanitizer decisions.
const TRACING_TARGET: &str = "nodelist_reqwest::sanitize";

/// Hosts that are obviously not compute nodes.
///
/// Matched exactly against the normalized host, so a subdomain of one of
/// these is accepted.
pub const FORBIDDEN_HOSTS: &[&str] = &[
    "amazon.com",
    "apple.com",
    "facebook.com",
    "google.com",
    "google.es",
    "microsoft.com",
    "openai.com",
    "twitter.com",
    "x.com",
    "youtube.com",
];

/// Reason an address was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The address is empty or blank.
    #[error("empty address")]
    Empty,
    /// The address could not be parsed as a URL.
    #[error("malformed address: {0}")]
    Malformed(#[from] url::ParseError),
    /// The scheme is neither `http` nor `https`.
    #[error("unsupported scheme: {0}")]
    Scheme(String),
    /// The host is on the deny-list.
    #[error("forbidden host: {0}")]
    ForbiddenHost(String),
}

/// An address that passed [`sanitize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl {
    base: String,
    url: Url,
}

impl ValidatedUrl {
    /// Returns the address with trailing slashes removed.
    pub fn as_str(&self) -> &str {
        &self.base
    }

    /// Returns the parsed URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the host of the address, if any.
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// Appends an endpoint path such as `/status/config` to the address.
    pub fn join(&self, path: &str) -> String {
        if path.is_empty() {
            return self.base.clone();
        }

        if path.starts_with('/') {
            format!("{}{path}", self.base)
        } else {
            format!("{}/{path}", self.base)
        }
    }
}

impl fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

/// Checks that `address` is a plausible compute node URL.
///
/// # Errors
///
/// Returns a [`Rejection`] describing why the address was refused.
pub fn sanitize(address: &str) -> Result<ValidatedUrl, Rejection> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        tracing::debug!(target: TRACING_TARGET, "Rejected empty address");
        return Err(Rejection::Empty);
    }

    let url = Url::parse(trimmed).inspect_err(|err| {
        tracing::debug!(
            target: TRACING_TARGET,
            address = %trimmed,
            error = %err,
            "Rejected malformed address"
        );
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        tracing::debug!(
            target: TRACING_TARGET,
            address = %trimmed,
            scheme = url.scheme(),
            "Rejected address with unsupported scheme"
        );
        return Err(Rejection::Scheme(url.scheme().to_owned()));
    }

    if let Some(host) = url.host_str()
        && FORBIDDEN_HOSTS.contains(&host)
    {
        tracing::debug!(
            target: TRACING_TARGET,
            address = %trimmed,
            host,
            forbidden = ?FORBIDDEN_HOSTS,
            "Rejected address on the forbidden host list"
        );
        return Err(Rejection::ForbiddenHost(host.to_owned()));
    }

    Ok(ValidatedUrl {
        base: trimmed.trim_end_matches('/').to_owned(),
        url,
    })
}

/// Non-failing form of [`sanitize`].
pub fn is_valid(address: &str) -> bool {
    sanitize(address).is_ok()
}
