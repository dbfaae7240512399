//! Refresh coordination for the node roster and per-node records.
//!
//! The roster age picks a [`FreshnessBand`] on every read:
//!
//! - **fresh**: cached data is returned, nothing is scheduled;
//! - **warm**: a background cycle is started unless one is running, and the
//!   caller does not wait;
//! - **cold**: a background cycle is started unless one is running, and the
//!   caller waits for it up to the grace period.
//!
//! At most one cycle runs at a time. A cycle that outlives the grace period
//! keeps running and later callers observe it instead of starting another.

mod band;
mod cycle;
mod task;

use std::sync::Arc;

use jiff::Timestamp;
use nodelist_reqwest::{ClientConfig, NodeClient};
use tokio::sync::{Mutex, RwLock, watch};
use tokio_util::sync::CancellationToken;

pub use self::band::FreshnessBand;
use self::task::{RefreshTask, wait_done};
use crate::compat::CompatibilityCache;
use crate::schema::Roster;
use crate::{CacheConfig, CachedValue, NodeRecord, NodeRecordMap, Result};

/// Tracing target for refresh scheduling and cycles.
pub const TRACING_TARGET: &str = "nodelist_cache::refresh";

pub(crate) struct DataCacheInner {
    pub(crate) config: CacheConfig,
    pub(crate) client: NodeClient,
    pub(crate) roster: RwLock<CachedValue<Roster>>,
    pub(crate) nodes: RwLock<NodeRecordMap>,
    pub(crate) compatibility: CompatibilityCache,
    refresh: Mutex<Option<RefreshTask>>,
    cancel: CancellationToken,
}

/// In-memory view over the node fleet, refreshed on demand.
///
/// Cloning is cheap and all clones share the same state.
///
/// # Examples
///
/// ```rust,ignore
/// use nodelist_cache::{CacheConfig, DataCache};
/// use nodelist_reqwest::ClientConfig;
///
/// let cache = DataCache::new(CacheConfig::default(), ClientConfig::default())?;
/// cache.ensure_fresh().await;
/// let snapshot = cache.assemble(true).await;
/// ```
#[derive(Clone)]
pub struct DataCache {
    pub(crate) inner: Arc<DataCacheInner>,
}

impl std::fmt::Debug for DataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataCache")
            .field("config", &self.inner.config)
            .field("client", &self.inner.client)
            .finish_non_exhaustive()
    }
}

impl DataCache {
    /// Creates an empty cache with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or the client cannot be built.
    pub fn new(config: CacheConfig, client_config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = NodeClient::new(client_config)?;
        Self::with_client(config, client)
    }

    /// Creates an empty cache sharing an existing client.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid.
    pub fn with_client(config: CacheConfig, client: NodeClient) -> Result<Self> {
        config.validate()?;

        let compatibility = CompatibilityCache::new(
            client.clone(),
            config.settings_url(),
            config.compatibility_max_age(),
        );

        tracing::debug!(
            target: TRACING_TARGET,
            roster_url = %config.roster_url(),
            fresh_secs = config.fresh_secs,
            stale_secs = config.stale_secs,
            "Creating data cache"
        );

        let inner = DataCacheInner {
            config,
            client,
            roster: RwLock::new(CachedValue::new()),
            nodes: RwLock::new(NodeRecordMap::new()),
            compatibility,
            refresh: Mutex::new(None),
            cancel: CancellationToken::new(),
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Returns the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Returns the shared HTTP client.
    pub fn client(&self) -> &NodeClient {
        &self.inner.client
    }

    /// Returns the GPU compatibility cache.
    pub fn compatibility(&self) -> &CompatibilityCache {
        &self.inner.compatibility
    }

    /// Schedules a refresh according to the roster age, then returns copies
    /// of the roster and node records.
    pub async fn ensure_fresh(&self) -> (CachedValue<Roster>, NodeRecordMap) {
        self.refresh_if_needed().await;
        let roster = self.inner.roster.read().await.clone();
        let nodes = self.inner.nodes.read().await.clone();
        (roster, nodes)
    }

    /// Performs the scheduling step of [`DataCache::ensure_fresh`] and
    /// returns the band the roster was in.
    pub async fn refresh_if_needed(&self) -> FreshnessBand {
        let band = self.band().await;

        match band {
            FreshnessBand::Fresh => {
                tracing::trace!(target: TRACING_TARGET, "Serving cached data");
            }
            FreshnessBand::Warm => {
                self.spawn_if_idle().await;
            }
            FreshnessBand::Cold => {
                if let Some(done) = self.spawn_if_idle().await {
                    self.wait_with_grace(done).await;
                }
            }
        }

        band
    }

    /// Returns the current band of the roster.
    pub async fn band(&self) -> FreshnessBand {
        let roster = self.inner.roster.read().await;
        FreshnessBand::classify(
            &roster,
            self.inner.config.fresh_after(),
            self.inner.config.stale_after(),
        )
    }

    /// Starts a cycle regardless of the band and waits for it to end.
    ///
    /// If a cycle is already in flight, that cycle is awaited instead of
    /// starting another one.
    pub async fn refresh_now(&self) {
        match self.spawn_if_idle().await {
            Some(done) => wait_done(done).await,
            None => {
                tracing::debug!(target: TRACING_TARGET, "Refresh skipped after shutdown");
            }
        }
    }

    /// Returns whether a background cycle is in flight.
    pub async fn is_refreshing(&self) -> bool {
        self.inner
            .refresh
            .lock()
            .await
            .as_ref()
            .is_some_and(RefreshTask::is_running)
    }

    /// Waits for the in-flight background cycle, if any, to end.
    pub async fn wait_idle(&self) {
        let done = self
            .inner
            .refresh
            .lock()
            .await
            .as_ref()
            .map(RefreshTask::subscribe);

        if let Some(done) = done {
            wait_done(done).await;
        }
    }

    /// Cancels the in-flight cycle and prevents new ones.
    ///
    /// Writes already made by a cancelled cycle stay in place.
    pub fn shutdown(&self) {
        tracing::info!(target: TRACING_TARGET, "Shutting down data cache");
        self.inner.cancel.cancel();
    }

    /// Returns whether [`DataCache::shutdown`] was called.
    pub fn is_shutdown(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Returns a copy of the cached roster.
    pub async fn roster(&self) -> CachedValue<Roster> {
        self.inner.roster.read().await.clone()
    }

    /// Returns a copy of the record for the node `hash`.
    pub async fn node(&self, hash: &str) -> Option<NodeRecord> {
        self.inner.nodes.read().await.get(hash).cloned()
    }

    /// Time of the last successful roster fetch.
    pub async fn last_refresh(&self) -> Option<Timestamp> {
        self.inner.roster.read().await.fetched_at
    }

    /// Starts a background cycle unless one is in flight.
    ///
    /// Returns the completion signal of the in-flight cycle, or `None` after
    /// shutdown.
    async fn spawn_if_idle(&self) -> Option<watch::Receiver<bool>> {
        let mut slot = self.inner.refresh.lock().await;

        if let Some(task) = slot.as_ref().filter(|task| task.is_running()) {
            tracing::debug!(target: TRACING_TARGET, "Refresh already in flight");
            return Some(task.subscribe());
        }

        if self.is_shutdown() {
            return None;
        }

        tracing::info!(target: TRACING_TARGET, "Launching background refresh");

        let (done_tx, done_rx) = watch::channel(false);
        let cache = self.clone();
        let cancel = self.inner.cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::info!(target: TRACING_TARGET, "Background refresh cancelled");
                }
                () = cache.run_cycle() => {}
            }
            let _ = done_tx.send(true);
        });

        let task = RefreshTask::new(handle, done_rx);
        let done = task.subscribe();
        *slot = Some(task);
        Some(done)
    }

    async fn wait_with_grace(&self, done: watch::Receiver<bool>) {
        let grace = self.inner.config.refresh_grace();
        if tokio::time::timeout(grace, wait_done(done)).await.is_err() {
            tracing::info!(
                target: TRACING_TARGET,
                grace_secs = grace.as_secs(),
                "Refresh still running after grace period, serving cached data"
            );
        }
    }
}
