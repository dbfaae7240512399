//! Settings aggregate listing GPU models eligible for display.

use serde::{Deserialize, Serialize};

use super::Extra;

/// Settings aggregate document.
///
/// The API wraps the settings as `data.settings`; a bare settings object is
/// accepted too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsAggregate {
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<SettingsData>,
    #[serde(flatten)]
    inline: Settings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct SettingsData {
    settings: Option<Settings>,
    #[serde(flatten)]
    extra: Extra,
}

impl SettingsAggregate {
    /// Returns the settings object carried by the document.
    pub fn settings(&self) -> &Settings {
        self.data
            .as_ref()
            .and_then(|data| data.settings.as_ref())
            .unwrap_or(&self.inline)
    }
}

impl From<Settings> for SettingsAggregate {
    fn from(settings: Settings) -> Self {
        Self {
            data: Some(SettingsData {
                settings: Some(settings),
                extra: Extra::new(),
            }),
            inline: Settings::default(),
        }
    }
}

/// Network settings relevant to GPU compatibility.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Legacy single list, treated as the standard tier.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compatible_gpus: Vec<CompatibleGpu>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compatible_standard_gpus: Vec<CompatibleGpu>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compatible_premium_gpus: Vec<CompatibleGpu>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community_wallet_address: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// One eligible GPU model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatibleGpu {
    pub name: String,
    pub model: String,
    pub vendor: String,
    pub vendor_id: String,
    pub device_id: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl CompatibleGpu {
    /// Returns the PCI id in the `vendor:device` form nodes report.
    ///
    /// A `device_id` that already carries the vendor prefix is used as is.
    pub fn pci_id(&self) -> Option<String> {
        let device_id = self.device_id.trim();
        if device_id.is_empty() {
            return None;
        }

        let vendor_id = self.vendor_id.trim();
        if device_id.contains(':') || vendor_id.is_empty() {
            Some(device_id.to_owned())
        } else {
            Some(format!("{vendor_id}:{device_id}"))
        }
    }
}
