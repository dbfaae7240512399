//! Command-line and environment configuration.
//!
//! ```text
//! Cli
//! ├── server: ServerConfig   listener address, request and shutdown timeouts
//! ├── cache: CacheConfig     aggregate API, freshness thresholds
//! └── client: ClientConfig   node fetch timeout, user agent, concurrency
//! ```
//!
//! Every flag has an environment variable of the same name in
//! `SCREAMING_SNAKE_CASE`:
//!
//! ```bash
//! nodelist-cli --api-host https://api2.aleph.im --port 8080
//! API_HOST=https://api2.aleph.im PORT=8080 nodelist-cli
//! ```

mod server;

use std::process;

use anyhow::Context;
use clap::Parser;
use nodelist_cache::CacheConfig;
use nodelist_reqwest::ClientConfig;
use serde::{Deserialize, Serialize};
pub use server::ServerConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "nodelist")]
#[command(about = "Serves a cached list of compute resource nodes")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub server: ServerConfig,

    #[clap(flatten)]
    pub cache: CacheConfig,

    #[clap(flatten)]
    pub client: ClientConfig,
}

impl Cli {
    /// Parses arguments, after loading `.env` when the `dotenv` feature is on.
    pub fn init() -> Self {
        load_dotenv();
        Self::parse()
    }

    /// Installs the global subscriber, filtered by `RUST_LOG`.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .validate()
            .context("invalid server configuration")?;
        self.cache
            .validate()
            .context("invalid cache configuration")?;
        Ok(())
    }

    /// Logs the effective configuration.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_SERVER_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            dotenv = cfg!(feature = "dotenv"),
            "Starting nodelist server"
        );

        self.server.log();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            api_host = %self.cache.api_host,
            fresh_secs = self.cache.fresh_secs,
            stale_secs = self.cache.stale_secs,
            refresh_grace_secs = self.cache.refresh_grace_secs,
            compatibility_max_age_secs = self.cache.compatibility_max_age_secs,
            "Cache configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            http_timeout_secs = self.client.effective_timeout().as_secs(),
            user_agent = %self.client.effective_user_agent(),
            max_concurrent_fetches = ?self.client.max_concurrent_fetches,
            "Client configuration"
        );
    }
}

#[cfg(feature = "dotenv")]
fn load_dotenv() {
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        eprintln!("Warning: ignoring unreadable .env file: {err}");
    }
}

#[cfg(not(feature = "dotenv"))]
fn load_dotenv() {}
