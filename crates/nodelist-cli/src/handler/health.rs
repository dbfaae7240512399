//! Liveness and refresh state.

use axum::Json;
use axum::extract::State;
use jiff::Timestamp;
use nodelist_cache::{DataCache, FreshnessBand};
use serde::Serialize;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Whether a refresh cycle is currently running.
    pub refreshing: bool,
    /// Time of the last successful roster fetch.
    pub last_refresh: Option<Timestamp>,
    pub band: FreshnessBand,
}

/// Reports the refresh state without scheduling a refresh.
pub async fn health(State(cache): State<DataCache>) -> Json<HealthResponse> {
    Json(HealthResponse {
        refreshing: cache.is_refreshing().await,
        last_refresh: cache.last_refresh().await,
        band: cache.band().await,
    })
}
