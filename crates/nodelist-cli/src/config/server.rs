//! Listener and lifecycle settings.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::ops::RangeInclusive;
use std::time::Duration;

use anyhow::{Result as AnyhowResult, bail};
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// Accepted range for both timeouts, in seconds.
const TIMEOUT_RANGE: RangeInclusive<u64> = 1..=300;

/// Lowest port accepted without root privileges.
const MIN_PORT: u16 = 1024;

/// Where and how long the HTTP server runs.
///
/// | Flag | Variable | Default |
/// |------|----------|---------|
/// | `--host` | `HOST` | `127.0.0.1` |
/// | `--port`, `-p` | `PORT` | `8080` |
/// | `--request-timeout` | `REQUEST_TIMEOUT` | `30` |
/// | `--shutdown-timeout` | `SHUTDOWN_TIMEOUT` | `10` |
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short = 'p', long, env = "PORT", default_value_t = 8080)]
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds a request may take before it is answered with 408
    ///
    /// Keep it above the refresh grace period: requests against a stale
    /// cache wait for the refresh.
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 30)]
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Seconds open connections get to finish after a termination signal
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 10)]
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_shutdown_timeout() -> u64 {
    10
}

impl ServerConfig {
    /// Checks the port and both timeouts.
    pub fn validate(&self) -> AnyhowResult<()> {
        if self.port < MIN_PORT {
            bail!("port {} is privileged, pick one from {MIN_PORT} up", self.port);
        }

        for (name, secs) in [
            ("request timeout", self.request_timeout),
            ("shutdown timeout", self.shutdown_timeout),
        ] {
            if !TIMEOUT_RANGE.contains(&secs) {
                bail!(
                    "{name} of {secs}s is out of range ({}..={}s)",
                    TIMEOUT_RANGE.start(),
                    TIMEOUT_RANGE.end()
                );
            }
        }

        Ok(())
    }

    #[must_use]
    pub const fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }

    /// Whether the host is `0.0.0.0` or `::`.
    #[must_use]
    pub fn binds_to_all_interfaces(&self) -> bool {
        self.host.is_unspecified()
    }

    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            addr = %self.server_addr(),
            request_timeout_secs = self.request_timeout,
            shutdown_timeout_secs = self.shutdown_timeout,
            "Server configuration"
        );
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}
