//! Termination signals.

use strum::IntoStaticStr;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use crate::TRACING_TARGET_SERVER_SHUTDOWN;

/// Signal that ended the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Sigint,
    Sigterm,
}

/// Resolves once SIGINT or SIGTERM is received.
///
/// A handler that fails to install is logged and never fires, so the
/// other one still works.
pub async fn shutdown_signal() -> Signal {
    let interrupt = async {
        match ctrl_c().await {
            Ok(()) => Signal::Sigint,
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    error = %err,
                    "Cannot listen for SIGINT"
                );
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                Signal::Sigterm
            }
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    error = %err,
                    "Cannot listen for SIGTERM"
                );
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Signal>();

    let received = tokio::select! {
        signal = interrupt => signal,
        signal = terminate => signal,
    };

    tracing::info!(
        target: TRACING_TARGET_SERVER_SHUTDOWN,
        signal = <&'static str>::from(received),
        "Shutting down"
    );
    received
}
