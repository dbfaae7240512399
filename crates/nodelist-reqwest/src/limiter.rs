//! Process-wide cap on in-flight outbound requests.

use std::sync::Arc;

use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Tracing target for limiter operations.
const TRACING_TARGET: &str = "nodelist_reqwest::limiter";

/// Upper bound on concurrent fetches regardless of the descriptor budget.
pub const MAX_CONCURRENT_FETCHES: usize = 100;

/// Source of the soft open-files limit on Linux.
const PROC_LIMITS_PATH: &str = "/proc/self/limits";

/// Permit held while a request is in flight; released on drop.
#[derive(Debug)]
pub struct FetchPermit {
    _permit: OwnedSemaphorePermit,
}

/// Shared limiter for every outbound fetch in the process.
///
/// Cloning is cheap and all clones share the same permits.
#[derive(Debug, Clone)]
pub struct FetchLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl FetchLimiter {
    /// Creates a limiter with `capacity` permits (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Creates a limiter sized from the file-descriptor budget of this process.
    pub fn from_descriptor_budget() -> Self {
        let capacity = default_capacity();
        tracing::debug!(
            target: TRACING_TARGET,
            capacity,
            "Sized fetch limiter from descriptor budget"
        );
        Self::new(capacity)
    }

    /// Returns the total number of permits.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of permits currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Waits for a free permit.
    ///
    /// # Errors
    ///
    /// Fails only if the limiter has been closed.
    pub async fn acquire(&self) -> Result<FetchPermit, AcquireError> {
        let permit = self.semaphore.clone().acquire_owned().await?;
        Ok(FetchPermit { _permit: permit })
    }

    /// Closes the limiter; pending and future acquisitions fail.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

impl Default for FetchLimiter {
    fn default() -> Self {
        Self::from_descriptor_budget()
    }
}

/// Half of the soft open-files limit, capped at [`MAX_CONCURRENT_FETCHES`].
fn default_capacity() -> usize {
    std::fs::read_to_string(PROC_LIMITS_PATH)
        .ok()
        .and_then(|limits| parse_open_files_limit(&limits))
        .map_or(MAX_CONCURRENT_FETCHES, capacity_for_limit)
}

fn capacity_for_limit(soft_limit: u64) -> usize {
    let half = usize::try_from(soft_limit / 2).unwrap_or(usize::MAX);
    half.clamp(1, MAX_CONCURRENT_FETCHES)
}

/// Extracts the soft "Max open files" value from `/proc/self/limits`.
///
/// Returns `None` when the line is missing or the limit is unlimited.
fn parse_open_files_limit(limits: &str) -> Option<u64> {
    let line = limits
        .lines()
        .find(|line| line.starts_with("Max open files"))?;
    let soft = line
        .trim_start_matches("Max open files")
        .split_whitespace()
        .next()?;
    soft.parse().ok()
}
