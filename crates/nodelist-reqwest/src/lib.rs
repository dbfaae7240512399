#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod connect;
mod error;
mod limiter;

pub mod sanitize;

pub use crate::connect::{
    ClientConfig, MAX_BODY_BYTES, NodeClient, PATH_ABOUT_USAGE_SYSTEM, PATH_STATUS_CHECK_IPV6,
    PATH_STATUS_CONFIG, TRACING_TARGET,
};
pub use crate::error::{BoxedError, Error, ErrorKind, Result};
pub use crate::limiter::{FetchLimiter, FetchPermit, MAX_CONCURRENT_FETCHES};
pub use crate::sanitize::{Rejection, ValidatedUrl, is_valid, sanitize};
