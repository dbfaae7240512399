//! HTTP server startup and lifecycle management.

use std::future::IntoFuture;
use std::time::Instant;

use axum::Router;
use nodelist_cache::DataCache;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use super::{Result, ServerError, shutdown_signal};
use crate::config::ServerConfig;
use crate::{TRACING_TARGET_SERVER_SHUTDOWN, TRACING_TARGET_SERVER_STARTUP};

/// Starts an HTTP server and runs it until a shutdown signal arrives.
///
/// On SIGINT or SIGTERM the cache stops any in-flight refresh and the
/// server stops accepting connections. In-flight requests get up to the
/// configured shutdown timeout to complete.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails
/// while running.
pub async fn serve(app: Router, config: &ServerConfig, cache: DataCache) -> Result<()> {
    let server_addr = config.server_addr();
    let listener = TcpListener::bind(server_addr).await.map_err(|err| {
        let error = ServerError::bind(server_addr, err);
        tracing::error!(
            target: TRACING_TARGET_SERVER_STARTUP,
            error = %error,
            suggestion = error.suggestion(),
            "Failed to bind to address"
        );
        error
    })?;

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        addr = %server_addr,
        "Server is ready and listening for connections"
    );

    if config.binds_to_all_interfaces() {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_STARTUP,
            "Server bound to all interfaces, ensure firewall is configured"
        );
    }

    let started = Instant::now();
    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let signal = async move {
        shutdown_signal().await;
        cache.shutdown();
        let _ = signalled_tx.send(());
    };

    let shutdown_timeout = config.shutdown_timeout();
    let drain_deadline = async move {
        if signalled_rx.await.is_ok() {
            tokio::time::sleep(shutdown_timeout).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .into_future();

    let result = tokio::select! {
        result = server => result,
        () = drain_deadline => {
            tracing::warn!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                timeout_secs = shutdown_timeout.as_secs(),
                "Graceful shutdown timed out, dropping open connections"
            );
            Ok(())
        }
    };

    match result {
        Ok(()) => {
            tracing::info!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                uptime_secs = started.elapsed().as_secs(),
                "Shutdown completed"
            );
            Ok(())
        }
        Err(err) => {
            let error = ServerError::Runtime(err);
            tracing::error!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                error = %error,
                error_code = error.error_code(),
                suggestion = error.suggestion(),
                uptime_secs = started.elapsed().as_secs(),
                "Fatal error"
            );
            Err(error)
        }
    }
}
