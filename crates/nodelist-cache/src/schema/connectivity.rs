//! Node `/status/check/ipv6` document.

use serde::{Deserialize, Serialize};

use super::Extra;

/// IPv6 reachability reported by a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityCheck {
    /// The host itself has working IPv6.
    pub host: Option<bool>,
    /// Virtual machines on the node have working IPv6.
    pub vm: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl ConnectivityCheck {
    /// Returns `true` when both checks passed.
    pub fn is_reachable(&self) -> bool {
        self.host == Some(true) && self.vm == Some(true)
    }
}
