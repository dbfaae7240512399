use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, IntoStaticStr};

use crate::CachedValue;

/// Age class of the cached roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FreshnessBand {
    /// Served as is.
    Fresh,
    /// Served as is while a background refresh runs.
    Warm,
    /// Callers wait a bounded time for a refresh.
    Cold,
}

impl FreshnessBand {
    /// Classifies `value` against the `fresh` and `stale` thresholds.
    ///
    /// A value that was never fetched is cold.
    pub fn classify<T>(value: &CachedValue<T>, fresh: Duration, stale: Duration) -> Self {
        if value.is_older_than(stale) {
            Self::Cold
        } else if value.is_older_than(fresh) {
            Self::Warm
        } else {
            Self::Fresh
        }
    }
}
