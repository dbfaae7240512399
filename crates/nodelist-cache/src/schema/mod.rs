//! Permissive schemas for the documents consumed by the cache.
//!
//! Every struct defaults missing fields and keeps unknown ones in a
//! flattened map, so a payload round-trips into the served snapshot
//! unchanged apart from the fields that are interpreted here.

mod config;
mod connectivity;
mod roster;
mod settings;
mod usage;

pub use config::{ComputingConfig, NodeConfig, PaymentConfig};
pub use connectivity::ConnectivityCheck;
pub use roster::{NodeDescriptor, Roster, RosterDocument};
pub use settings::{CompatibleGpu, Settings, SettingsAggregate};
pub use usage::{GpuDevice, GpuInfo, SystemUsage};

/// Unknown fields preserved verbatim.
pub type Extra = serde_json::Map<String, serde_json::Value>;
