//! Node client module.
//!
//! Wraps a single shared `reqwest` client together with the fetch limiter.

mod client;
mod config;

pub use client::{
    MAX_BODY_BYTES, NodeClient, PATH_ABOUT_USAGE_SYSTEM, PATH_STATUS_CHECK_IPV6,
    PATH_STATUS_CONFIG, TRACING_TARGET,
};
pub use config::ClientConfig;
