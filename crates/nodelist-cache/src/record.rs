//! Per-node bundle of cached endpoint data.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::CachedValue;
use crate::schema::{ConnectivityCheck, NodeConfig, SystemUsage};

/// Node records keyed by node hash.
pub type NodeRecordMap = HashMap<String, NodeRecord>;

/// Cached data for one compute node.
///
/// Capability flags are projections of `config` and are never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Address the data was last fetched from.
    pub node_url: String,
    pub config: CachedValue<NodeConfig>,
    pub system_info: CachedValue<SystemUsage>,
    pub connectivity_check: CachedValue<ConnectivityCheck>,
}

impl NodeRecord {
    /// Creates an empty record for the node at `node_url`.
    pub fn new(node_url: impl Into<String>) -> Self {
        Self {
            node_url: node_url.into(),
            ..Self::default()
        }
    }

    /// Returns whether the address passes the sanitizer.
    pub fn is_valid(&self) -> bool {
        nodelist_reqwest::is_valid(&self.node_url)
    }

    /// GPU support flag, `None` until a config reporting it has been fetched.
    pub fn gpu_support(&self) -> Option<bool> {
        self.computing_flag(|config| config.computing.enable_gpu_support)
    }

    /// Confidential computing flag, `None` until a config has been fetched.
    pub fn confidential_support(&self) -> Option<bool> {
        self.computing_flag(|config| config.computing.enable_confidential_computing)
    }

    /// QEMU support flag, `None` until a config has been fetched.
    pub fn qemu_support(&self) -> Option<bool> {
        self.computing_flag(|config| config.computing.enable_qemu_support)
    }

    /// Payment receiver address advertised in the config.
    pub fn payment_receiver_address(&self) -> Option<&str> {
        self.config
            .data
            .as_ref()
            .and_then(|config| config.payment.payment_receiver_address.as_deref())
    }

    /// Software version advertised in the config.
    pub fn version(&self) -> Option<&str> {
        self.config
            .data
            .as_ref()
            .and_then(|config| config.version.as_deref())
    }

    fn computing_flag(&self, flag: impl Fn(&NodeConfig) -> Option<bool>) -> Option<bool> {
        self.config.data.as_ref().and_then(flag)
    }
}
