//! Cache configuration: data sources and freshness thresholds.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default aggregate API host.
pub const DEFAULT_API_HOST: &str = "https://api2.aleph.im";

/// Account publishing the `corechannel` aggregate with the node roster.
pub const DEFAULT_CORECHANNEL_ADDRESS: &str = "0xa1B3bb7d2332383D96b7796B908fB7f7F3c2Be10";

/// Account publishing the `settings` aggregate with the GPU list.
pub const DEFAULT_SETTINGS_ADDRESS: &str = "0xA07B1214bAe0D5ccAA25449C3149c0aC83658874";

/// Configuration for [`DataCache`](crate::DataCache).
///
/// Roster age is compared against two thresholds. Up to `fresh_secs` the
/// cached data is served as is; between `fresh_secs` and `stale_secs` a
/// background refresh is started; beyond `stale_secs` callers wait up to
/// `refresh_grace_secs` for a refresh to land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct CacheConfig {
    /// Base URL of the aggregate API
    #[cfg_attr(
        feature = "config",
        arg(long = "api-host", env = "API_HOST", default_value = DEFAULT_API_HOST)
    )]
    #[serde(default = "default_api_host")]
    pub api_host: String,

    /// Account holding the node roster aggregate
    #[cfg_attr(
        feature = "config",
        arg(
            long = "corechannel-address",
            env = "CORECHANNEL_ADDRESS",
            default_value = DEFAULT_CORECHANNEL_ADDRESS
        )
    )]
    #[serde(default = "default_corechannel_address")]
    pub corechannel_address: String,

    /// Account holding the settings aggregate
    #[cfg_attr(
        feature = "config",
        arg(
            long = "settings-address",
            env = "SETTINGS_ADDRESS",
            default_value = DEFAULT_SETTINGS_ADDRESS
        )
    )]
    #[serde(default = "default_settings_address")]
    pub settings_address: String,

    /// Age in seconds up to which cached data is served without refreshing
    #[cfg_attr(
        feature = "config",
        arg(long = "fresh-secs", env = "FRESH_SECS", default_value_t = 30)
    )]
    #[serde(default = "default_fresh_secs")]
    pub fresh_secs: u64,

    /// Age in seconds beyond which callers wait for a refresh
    #[cfg_attr(
        feature = "config",
        arg(long = "stale-secs", env = "STALE_SECS", default_value_t = 60)
    )]
    #[serde(default = "default_stale_secs")]
    pub stale_secs: u64,

    /// How long a caller waits for a refresh of stale data
    #[cfg_attr(
        feature = "config",
        arg(long = "refresh-grace-secs", env = "REFRESH_GRACE_SECS", default_value_t = 10)
    )]
    #[serde(default = "default_refresh_grace_secs")]
    pub refresh_grace_secs: u64,

    /// Maximum age in seconds of the GPU compatibility list
    #[cfg_attr(
        feature = "config",
        arg(
            long = "compatibility-max-age-secs",
            env = "COMPATIBILITY_MAX_AGE_SECS",
            default_value_t = 300
        )
    )]
    #[serde(default = "default_compatibility_max_age_secs")]
    pub compatibility_max_age_secs: u64,
}

fn default_api_host() -> String {
    DEFAULT_API_HOST.to_owned()
}

fn default_corechannel_address() -> String {
    DEFAULT_CORECHANNEL_ADDRESS.to_owned()
}

fn default_settings_address() -> String {
    DEFAULT_SETTINGS_ADDRESS.to_owned()
}

fn default_fresh_secs() -> u64 {
    30
}

fn default_stale_secs() -> u64 {
    60
}

fn default_refresh_grace_secs() -> u64 {
    10
}

fn default_compatibility_max_age_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            api_host: default_api_host(),
            corechannel_address: default_corechannel_address(),
            settings_address: default_settings_address(),
            fresh_secs: default_fresh_secs(),
            stale_secs: default_stale_secs(),
            refresh_grace_secs: default_refresh_grace_secs(),
            compatibility_max_age_secs: default_compatibility_max_age_secs(),
        }
    }
}

impl CacheConfig {
    /// Checks that the thresholds are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.api_host.trim().is_empty() {
            return Err(Error::config("api host cannot be empty"));
        }

        if self.fresh_secs >= self.stale_secs {
            return Err(Error::config(format!(
                "fresh threshold ({}s) must be below stale threshold ({}s)",
                self.fresh_secs, self.stale_secs
            )));
        }

        if self.refresh_grace_secs == 0 {
            return Err(Error::config("refresh grace period must be at least 1s"));
        }

        Ok(())
    }

    /// URL of the roster aggregate.
    pub fn roster_url(&self) -> String {
        self.aggregate_url(&self.corechannel_address, "corechannel")
    }

    /// URL of the settings aggregate.
    pub fn settings_url(&self) -> String {
        self.aggregate_url(&self.settings_address, "settings")
    }

    fn aggregate_url(&self, address: &str, key: &str) -> String {
        format!(
            "{}/api/v0/aggregates/{address}.json?keys={key}",
            self.api_host.trim_end_matches('/')
        )
    }

    /// Age up to which data is served without refreshing.
    pub fn fresh_after(&self) -> Duration {
        Duration::from_secs(self.fresh_secs)
    }

    /// Age beyond which callers wait for a refresh.
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_secs)
    }

    /// Bounded wait for a refresh of stale data.
    pub fn refresh_grace(&self) -> Duration {
        Duration::from_secs(self.refresh_grace_secs)
    }

    /// Maximum age of the GPU compatibility list.
    pub fn compatibility_max_age(&self) -> Duration {
        Duration::from_secs(self.compatibility_max_age_secs)
    }

    /// Set the API host.
    pub fn with_api_host(mut self, api_host: impl Into<String>) -> Self {
        self.api_host = api_host.into();
        self
    }

    /// Set the fresh and stale thresholds in seconds.
    pub fn with_thresholds(mut self, fresh_secs: u64, stale_secs: u64) -> Self {
        self.fresh_secs = fresh_secs;
        self.stale_secs = stale_secs;
        self
    }

    /// Set the refresh grace period in seconds.
    pub fn with_refresh_grace(mut self, refresh_grace_secs: u64) -> Self {
        self.refresh_grace_secs = refresh_grace_secs;
        self
    }

    /// Set the maximum age of the compatibility list in seconds.
    pub fn with_compatibility_max_age(mut self, compatibility_max_age_secs: u64) -> Self {
        self.compatibility_max_age_secs = compatibility_max_age_secs;
        self
    }
}
