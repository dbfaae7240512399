//! Node `/about/usage/system` document.

use serde::{Deserialize, Serialize};

use super::Extra;

/// Resource usage reported by a node.
///
/// Only the GPU inventory is interpreted; CPU, memory and disk figures are
/// kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<GpuInfo>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl SystemUsage {
    /// Returns every GPU attached to the node.
    pub fn devices(&self) -> &[GpuDevice] {
        self.gpu
            .as_ref()
            .map(|gpu| gpu.devices.as_slice())
            .unwrap_or_default()
    }

    /// Returns the GPUs not currently assigned to a VM.
    pub fn available_devices(&self) -> &[GpuDevice] {
        self.gpu
            .as_ref()
            .map(|gpu| gpu.available_devices.as_slice())
            .unwrap_or_default()
    }
}

/// GPU inventory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuInfo {
    pub devices: Vec<GpuDevice>,
    pub available_devices: Vec<GpuDevice>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// One PCI GPU device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuDevice {
    pub vendor: String,
    pub device_name: String,
    pub device_class: String,
    pub pci_host: String,
    /// PCI id in `vendor:device` form, e.g. `10de:27b0`.
    pub device_id: String,
    #[serde(flatten)]
    pub extra: Extra,
}
