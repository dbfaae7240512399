#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod assemble;
mod compat;
mod config;
mod error;
mod record;
mod refresh;
pub mod schema;
mod value;

pub use crate::assemble::Snapshot;
pub use crate::compat::{CompatibilityCache, GpuCompatibility, GpuTier};
pub use crate::config::{
    CacheConfig, DEFAULT_API_HOST, DEFAULT_CORECHANNEL_ADDRESS, DEFAULT_SETTINGS_ADDRESS,
};
pub use crate::error::{Error, Result};
pub use crate::record::{NodeRecord, NodeRecordMap};
pub use crate::refresh::{DataCache, FreshnessBand, TRACING_TARGET};
pub use crate::value::{CachedValue, ErrorInfo};
