//! Node list handlers.

use axum::Json;
use axum::extract::{Query, State};
use nodelist_cache::{CachedValue, DataCache, NodeRecordMap, Snapshot};
use nodelist_cache::schema::Roster;
use serde::Deserialize;

/// Tracing target for node list handlers.
const TRACING_TARGET: &str = "nodelist_cli::handler::nodes";

/// Query parameters of `GET /crns.json`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    /// Skips nodes that have been marked inactive.
    pub filter_inactive: bool,
}

/// Returns the assembled node list.
#[tracing::instrument(skip_all, fields(filter_inactive = params.filter_inactive))]
pub async fn list_nodes(
    State(cache): State<DataCache>,
    Query(params): Query<ListParams>,
) -> Json<Snapshot> {
    cache.ensure_fresh().await;
    let snapshot = cache.assemble(params.filter_inactive).await;

    tracing::debug!(
        target: TRACING_TARGET,
        nodes = snapshot.crns.len(),
        "Serving node list"
    );

    Json(snapshot)
}

/// Returns the raw roster and per-node cached values.
pub async fn nodes_aggregate(
    State(cache): State<DataCache>,
) -> Json<(CachedValue<Roster>, NodeRecordMap)> {
    Json(cache.ensure_fresh().await)
}
