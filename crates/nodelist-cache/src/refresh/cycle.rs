use std::time::Instant;

use futures::future::join_all;
use nodelist_reqwest::{
    ErrorKind, PATH_ABOUT_USAGE_SYSTEM, PATH_STATUS_CHECK_IPV6, PATH_STATUS_CONFIG,
};

use super::{DataCache, TRACING_TARGET};
use crate::schema::{ConnectivityCheck, NodeConfig, RosterDocument, SystemUsage};
use crate::{CachedValue, ErrorInfo, NodeRecord};

/// Endpoint fetched from every node during a cycle.
#[derive(Debug, Clone, Copy)]
enum NodeSource {
    Config,
    SystemUsage,
    ConnectivityCheck,
}

impl NodeSource {
    const ALL: [Self; 3] = [Self::Config, Self::SystemUsage, Self::ConnectivityCheck];

    const fn path(self) -> &'static str {
        match self {
            Self::Config => PATH_STATUS_CONFIG,
            Self::SystemUsage => PATH_ABOUT_USAGE_SYSTEM,
            Self::ConnectivityCheck => PATH_STATUS_CHECK_IPV6,
        }
    }
}

impl DataCache {
    /// Fetches the roster, then every endpoint of every node.
    pub(super) async fn run_cycle(&self) {
        let started = Instant::now();
        self.refresh_roster().await;

        let targets: Vec<(String, String)> = {
            let roster = self.inner.roster.read().await;
            roster
                .data
                .as_ref()
                .map(|roster| {
                    roster
                        .nodes()
                        .iter()
                        .map(|node| (node.hash.clone(), node.address.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };

        {
            let mut nodes = self.inner.nodes.write().await;
            for (hash, address) in &targets {
                nodes
                    .entry(hash.clone())
                    .or_insert_with(NodeRecord::default)
                    .node_url
                    .clone_from(address);
            }
        }

        let fetches = targets.iter().flat_map(|(hash, address)| {
            NodeSource::ALL.map(|source| self.refresh_source(hash, address, source))
        });
        let outcomes = join_all(fetches).await;
        let failed = outcomes.iter().filter(|ok| !**ok).count();

        tracing::info!(
            target: TRACING_TARGET,
            nodes = targets.len(),
            fetches = outcomes.len(),
            failed,
            elapsed_ms = started.elapsed().as_millis(),
            "Refresh cycle finished"
        );
    }

    /// Replaces the roster on success; otherwise records the error and keeps
    /// the previous roster.
    async fn refresh_roster(&self) {
        let url = self.inner.config.roster_url();
        let result = self
            .inner
            .client
            .fetch_document::<RosterDocument>(&url)
            .await;

        let mut roster = self.inner.roster.write().await;
        match result.map(RosterDocument::into_roster) {
            Ok(Some(fetched)) => {
                tracing::info!(
                    target: TRACING_TARGET,
                    nodes = fetched.len(),
                    valid_addresses = fetched.valid_address_count(),
                    "Fetched node roster"
                );
                roster.set_data(fetched);
            }
            Ok(None) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    url = %url,
                    "Roster document has no resource nodes"
                );
                roster.set_error(ErrorInfo::new(
                    ErrorKind::Decode,
                    format!("no resource nodes in roster document from {url}"),
                ));
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    url = %url,
                    error = %error,
                    "Failed to fetch node roster"
                );
                roster.set_error(&error);
            }
        }
    }

    /// Fetches one endpoint of one node and records the outcome.
    ///
    /// Returns whether the fetch succeeded.
    async fn refresh_source(&self, hash: &str, address: &str, source: NodeSource) -> bool {
        let client = &self.inner.client;
        let path = source.path();

        match source {
            NodeSource::Config => {
                let result = client.fetch::<NodeConfig>(address, path).await;
                self.record(hash, address, source, result, |node| &mut node.config)
                    .await
            }
            NodeSource::SystemUsage => {
                let result = client.fetch::<SystemUsage>(address, path).await;
                self.record(hash, address, source, result, |node| &mut node.system_info)
                    .await
            }
            NodeSource::ConnectivityCheck => {
                let result = client.fetch::<ConnectivityCheck>(address, path).await;
                self.record(hash, address, source, result, |node| {
                    &mut node.connectivity_check
                })
                .await
            }
        }
    }

    /// Writes a fetch outcome into the node's record under a short lock.
    async fn record<T>(
        &self,
        hash: &str,
        address: &str,
        source: NodeSource,
        result: nodelist_reqwest::Result<T>,
        value: impl FnOnce(&mut NodeRecord) -> &mut CachedValue<T>,
    ) -> bool {
        if let Err(error) = &result {
            tracing::debug!(
                target: TRACING_TARGET,
                node = hash,
                source = ?source,
                kind = %error.kind(),
                error = %error,
                "Node fetch failed"
            );
        }

        let ok = result.is_ok();
        let mut nodes = self.inner.nodes.write().await;
        let node = nodes
            .entry(hash.to_owned())
            .or_insert_with(|| NodeRecord::new(address));
        value(node).record(result);
        ok
    }
}
