//! GPU compatibility list and its lazily refreshed cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use nodelist_reqwest::NodeClient;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use tokio::sync::Mutex;

use crate::CachedValue;
use crate::schema::{CompatibleGpu, GpuDevice, Settings, SettingsAggregate};

/// Tracing target for compatibility list operations.
const TRACING_TARGET: &str = "nodelist_cache::compat";

/// Pricing tier of an eligible GPU model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GpuTier {
    Standard,
    Premium,
}

impl GpuTier {
    /// Name of the settings list the tier comes from.
    pub const fn list_name(&self) -> &'static str {
        match self {
            Self::Standard => "compatible_standard_gpus",
            Self::Premium => "compatible_premium_gpus",
        }
    }
}

/// Lookup table of eligible GPUs keyed by PCI id (`vendor:device`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpuCompatibility {
    devices: Arc<HashMap<String, GpuTier>>,
}

impl GpuCompatibility {
    /// Builds the table from the settings lists.
    ///
    /// The legacy `compatible_gpus` list counts as the standard tier. A model
    /// listed in both tiers is premium.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut devices = HashMap::new();
        let tiers = [
            (&settings.compatible_gpus, GpuTier::Standard),
            (&settings.compatible_standard_gpus, GpuTier::Standard),
            (&settings.compatible_premium_gpus, GpuTier::Premium),
        ];

        for (list, tier) in tiers {
            for pci_id in list.iter().filter_map(CompatibleGpu::pci_id) {
                devices.insert(pci_id, tier);
            }
        }

        Self {
            devices: Arc::new(devices),
        }
    }

    /// Returns `true` if `device_id` is on the list (exact match).
    pub fn is_compatible(&self, device_id: &str) -> bool {
        self.devices.contains_key(device_id)
    }

    /// Returns the tier of `device_id`, if it is on the list.
    pub fn tier(&self, device_id: &str) -> Option<GpuTier> {
        self.devices.get(device_id).copied()
    }

    /// Keeps the devices that are on the list, in their original order.
    pub fn filter<'a>(&self, devices: &'a [GpuDevice]) -> Vec<&'a GpuDevice> {
        devices
            .iter()
            .filter(|device| self.is_compatible(&device.device_id))
            .collect()
    }

    /// Returns the number of eligible models.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns `true` if no model is eligible.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl From<&SettingsAggregate> for GpuCompatibility {
    fn from(aggregate: &SettingsAggregate) -> Self {
        Self::from_settings(aggregate.settings())
    }
}

/// Compatibility list refreshed on its own timer.
///
/// Concurrent callers queue behind one lock, so a single fetch serves all
/// of them.
pub struct CompatibilityCache {
    client: NodeClient,
    url: String,
    max_age: Duration,
    state: Mutex<CachedValue<GpuCompatibility>>,
}

impl std::fmt::Debug for CompatibilityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompatibilityCache")
            .field("url", &self.url)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl CompatibilityCache {
    /// Creates an empty cache for the settings aggregate at `url`.
    pub fn new(client: NodeClient, url: impl Into<String>, max_age: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            max_age,
            state: Mutex::new(CachedValue::new()),
        }
    }

    /// Returns the list, refetching it first if it is older than the
    /// configured maximum age.
    ///
    /// A failed fetch is logged and recorded; the previous list, if any, is
    /// returned.
    pub async fn get(&self) -> Option<GpuCompatibility> {
        let mut state = self.state.lock().await;
        if state.is_older_than(self.max_age) {
            self.fetch_into(&mut state).await;
        }
        state.data.clone()
    }

    /// Returns the cached state without fetching.
    pub async fn snapshot(&self) -> CachedValue<GpuCompatibility> {
        self.state.lock().await.clone()
    }

    async fn fetch_into(&self, state: &mut CachedValue<GpuCompatibility>) {
        match self
            .client
            .fetch_document::<SettingsAggregate>(&self.url)
            .await
        {
            Ok(aggregate) => {
                let compatibility = GpuCompatibility::from(&aggregate);
                tracing::debug!(
                    target: TRACING_TARGET,
                    models = compatibility.len(),
                    "Refreshed GPU compatibility list"
                );
                state.set_data(compatibility);
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    url = %self.url,
                    error = %error,
                    has_previous = state.has_data(),
                    "Failed to fetch settings aggregate"
                );
                state.set_error(&error);
            }
        }
    }
}
