//! Node `/status/config` document.

use serde::{Deserialize, Serialize};

use super::Extra;

/// Configuration reported by a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub version: Option<String>,
    pub computing: ComputingConfig,
    pub payment: PaymentConfig,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Capability flags under `computing`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputingConfig {
    #[serde(rename = "ENABLE_GPU_SUPPORT")]
    pub enable_gpu_support: Option<bool>,
    #[serde(rename = "ENABLE_CONFIDENTIAL_COMPUTING")]
    pub enable_confidential_computing: Option<bool>,
    #[serde(rename = "ENABLE_QEMU_SUPPORT")]
    pub enable_qemu_support: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Payment settings under `payment`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    #[serde(rename = "PAYMENT_RECEIVER_ADDRESS")]
    pub payment_receiver_address: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}
