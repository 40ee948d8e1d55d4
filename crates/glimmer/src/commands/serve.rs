//! Long-running server command: connect once, serve until interrupted.

use std::net::SocketAddr;
use std::sync::Arc;

use glimmer_ble::BledomStrip;
use glimmer_config::Config;
use glimmer_core::Dispatcher;

use crate::cli::{GlobalOpts, ServeArgs};
use crate::commands::target_device;
use crate::error::CliError;
use crate::server::{self, AppState};

pub async fn handle(args: ServeArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let identifier = target_device(config, global)?;
    let listen: SocketAddr = match &args.listen {
        Some(listen) => listen.parse().map_err(|_| CliError::Validation {
            field: "listen".into(),
            reason: format!("invalid socket address: {listen}"),
        })?,
        None => config.listen_addr()?,
    };

    if !global.quiet {
        eprintln!("connecting to {identifier}...");
    }
    let strip = Arc::new(BledomStrip::connect(&identifier, super::DISCOVERY_TIMEOUT).await?);

    let state = AppState {
        dispatcher: Dispatcher::new(Arc::clone(&strip), config.dispatch_config()),
        sampler_config: config.sampler_config(),
        device: identifier,
        started: std::time::Instant::now(),
    };

    let listener = tokio::net::TcpListener::bind(listen).await?;
    if !global.quiet {
        eprintln!("listening on http://{listen}");
    }
    tracing::info!(%listen, device = %strip.identifier(), "server started");

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Leave the strip cleanly disconnected so the next process can claim it.
    strip.disconnect().await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown requested");
}
