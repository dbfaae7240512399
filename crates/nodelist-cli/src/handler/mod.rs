//! `axum::`[`Router`] over the shared [`DataCache`].
//!
//! [`Router`]: axum::routing::Router

mod health;
mod nodes;

use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{BoxError, Json, Router};
use nodelist_cache::DataCache;
use serde_json::json;
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower_http::trace::TraceLayer;

/// Tracing target for middleware errors.
const TRACING_TARGET_ERROR: &str = "nodelist_cli::handler::error";

#[inline]
async fn not_found() -> Response {
    StatusCode::NOT_FOUND.into_response()
}

/// Returns a [`Router`] with all routes.
pub fn routes(cache: DataCache) -> Router {
    Router::new()
        .route("/crns.json", get(nodes::list_nodes))
        .route("/debug/nodes_aggregate", get(nodes::nodes_aggregate))
        .route("/health", get(health::health))
        .fallback(not_found)
        .with_state(cache)
}

/// Extension trait for `axum::`[`Router`] to apply the request middleware.
pub trait RouterMiddlewareExt {
    /// Layers request tracing and a request timeout.
    fn with_middleware(self, request_timeout: Duration) -> Self;
}

impl RouterMiddlewareExt for Router {
    fn with_middleware(self, request_timeout: Duration) -> Self {
        let middlewares = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(HandleErrorLayer::new(handle_error))
            .layer(TimeoutLayer::new(request_timeout));

        self.layer(middlewares)
    }
}

async fn handle_error(err: BoxError) -> Response {
    let (status, message) = if err.is::<Elapsed>() {
        tracing::error!(
            target: TRACING_TARGET_ERROR,
            error = %err,
            "request timeout exceeded"
        );
        (StatusCode::REQUEST_TIMEOUT, "Request timeout")
    } else {
        tracing::error!(
            target: TRACING_TARGET_ERROR,
            error = %err,
            "unknown middleware error"
        );
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "An unexpected error occurred",
        )
    };

    (status, Json(json!({ "error": message }))).into_response()
}
