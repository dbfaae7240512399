#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod handler;
mod server;

use std::process;

use anyhow::Context;
use nodelist_cache::DataCache;

use crate::config::Cli;
use crate::handler::RouterMiddlewareExt;

// Tracing target constants
pub const TRACING_TARGET_SERVER_STARTUP: &str = "nodelist_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "nodelist_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "nodelist_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    Cli::init_tracing();
    cli.log();
    cli.validate()?;

    let cache = DataCache::new(cli.cache.clone(), cli.client.clone())
        .context("failed to create node cache")?;
    let router = handler::routes(cache.clone()).with_middleware(cli.server.request_timeout());

    let result = server::serve(router, &cli.server, cache.clone()).await;

    // Stop any refresh still in flight before the runtime goes away.
    cache.shutdown();
    result.context("server terminated with error")
}
