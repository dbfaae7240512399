//! Rate-limited JSON fetches against compute nodes and the aggregate API.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use reqwest::Client;
use reqwest::redirect::{Action, Attempt, Policy};
use serde::de::DeserializeOwned;

use super::ClientConfig;
use crate::limiter::FetchLimiter;
use crate::sanitize::{is_valid, sanitize};
use crate::{Error, Result};

/// Tracing target for client operations.
pub const TRACING_TARGET: &str = "nodelist_reqwest::client";

/// Node endpoint reporting its configuration and capability flags.
pub const PATH_STATUS_CONFIG: &str = "/status/config";

/// Node endpoint reporting resource usage and attached devices.
pub const PATH_ABOUT_USAGE_SYSTEM: &str = "/about/usage/system";

/// Node endpoint reporting IPv6 reachability.
pub const PATH_STATUS_CHECK_IPV6: &str = "/status/check/ipv6";

/// Largest response body read from any endpoint: 8 MiB.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Redirect hops followed before the request fails.
const MAX_REDIRECTS: usize = 5;

struct NodeClientInner {
    http: Client,
    limiter: FetchLimiter,
    config: ClientConfig,
}

/// HTTP client shared by every fetch in the process.
///
/// Each request passes through the address sanitizer and then waits for a
/// permit from the process-wide [`FetchLimiter`]. The underlying `reqwest`
/// client enforces the per-request timeout and only follows redirects whose
/// target also passes the sanitizer. Bodies larger than [`MAX_BODY_BYTES`]
/// are refused.
///
/// # Examples
///
/// ```rust,ignore
/// use nodelist_reqwest::{ClientConfig, NodeClient, PATH_STATUS_CONFIG};
///
/// let client = NodeClient::new(ClientConfig::default())?;
/// let config = client.fetch_json("https://crn.example.org", PATH_STATUS_CONFIG).await?;
/// ```
#[derive(Clone)]
pub struct NodeClient {
    inner: Arc<NodeClientInner>,
}

impl std::fmt::Debug for NodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeClient")
            .field("config", &self.inner.config)
            .field("limiter", &self.inner.limiter)
            .finish_non_exhaustive()
    }
}

impl NodeClient {
    /// Creates a client with a limiter sized from the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Build`] if the TLS backend cannot be initialized.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let limiter = config.create_limiter();
        Self::with_limiter(config, limiter)
    }

    /// Creates a client that shares an existing limiter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Build`] if the TLS backend cannot be initialized.
    pub fn with_limiter(config: ClientConfig, limiter: FetchLimiter) -> Result<Self> {
        let timeout = config.effective_timeout();
        let user_agent = config.effective_user_agent();

        tracing::debug!(
            target: TRACING_TARGET,
            timeout_ms = timeout.as_millis(),
            max_concurrent = limiter.capacity(),
            "Creating node client"
        );

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(Policy::custom(sanitized_redirect))
            .build()
            .map_err(Error::Build)?;

        let inner = NodeClientInner {
            http,
            limiter,
            config,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Returns the shared fetch limiter.
    pub fn limiter(&self) -> &FetchLimiter {
        &self.inner.limiter
    }

    /// Fetches `path` from the node at `node_url` as an untyped JSON value.
    ///
    /// # Errors
    ///
    /// See [`NodeClient::fetch`].
    pub async fn fetch_json(&self, node_url: &str, path: &str) -> Result<serde_json::Value> {
        self.fetch(node_url, path).await
    }

    /// Fetches `path` from the node at `node_url` and decodes the body.
    ///
    /// The address is sanitized first; a refused address never reaches the
    /// network and does not consume a limiter permit.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] classified by [`ErrorKind`](crate::ErrorKind).
    pub async fn fetch<T>(&self, node_url: &str, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let base = sanitize(node_url)?;
        let url = base.join(path);
        self.get(&url).await
    }

    /// Fetches an absolute URL such as an aggregate document and decodes
    /// the body.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] classified by [`ErrorKind`](crate::ErrorKind).
    pub async fn fetch_document<T>(&self, url: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = sanitize(url)?;
        self.get(url.url().as_str()).await
    }

    async fn get<T>(&self, url: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let body = self.get_bytes(url).await.inspect_err(|err| {
            tracing::info!(
                target: TRACING_TARGET,
                url,
                kind = %err.kind(),
                error = %err,
                "Fetch failed"
            );
        })?;

        serde_json::from_slice(&body).map_err(|source| {
            tracing::info!(
                target: TRACING_TARGET,
                url,
                error = %source,
                "Response body is not valid JSON"
            );
            Error::Decode {
                url: url.to_owned(),
                source,
            }
        })
    }

    /// Performs the request while holding a limiter permit.
    async fn get_bytes(&self, url: &str) -> Result<Bytes> {
        let _permit = self
            .inner
            .limiter
            .acquire()
            .await
            .map_err(|err| Error::unexpected(url, err))?;

        tracing::debug!(target: TRACING_TARGET, url, "Fetching");

        let mut response = self
            .inner
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| Error::from_reqwest(url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Response {
                url: url.to_owned(),
                status,
            });
        }

        let too_large = || Error::BodyTooLarge {
            url: url.to_owned(),
            limit: MAX_BODY_BYTES,
        };

        if response
            .content_length()
            .is_some_and(|len| len > MAX_BODY_BYTES as u64)
        {
            return Err(too_large());
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|err| Error::from_reqwest(url, err))?
        {
            if body.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }
}

/// Follows a redirect only if its target is an acceptable node address.
///
/// A refused target stops the chain, so the caller sees the redirect status.
fn sanitized_redirect(attempt: Attempt) -> Action {
    if attempt.previous().len() > MAX_REDIRECTS {
        return attempt.error("too many redirects");
    }

    if is_valid(attempt.url().as_str()) {
        attempt.follow()
    } else {
        tracing::info!(
            target: TRACING_TARGET,
            location = %attempt.url(),
            "Refusing redirect to an invalid address"
        );
        attempt.stop()
    }
}
