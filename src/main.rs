//! ChatSync - Discord-Minecraft chat bridge
//!
//! Mirrors chat, joins, quits, advancements and deaths from a Minecraft
//! server into a Discord channel, and Discord messages back into the game.

mod bridge;
mod common;
mod config;
mod discord;
mod world;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

use bridge::router::WorldBroadcast;
use bridge::BridgeController;
use config::{env::get_config_path, load_and_validate};
use discord::SerenityRelay;
use world::WorldLink;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; the filter is swapped once the config is known.
    let (filter, filter_handle) = reload::Layer::new(
        EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    info!("ChatSync v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        error!("See chatsync.conf.example for reference.");
        e
    })?;

    if config.debug {
        filter_handle.reload(
            EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
                .add_directive("chatsync=debug".parse::<Directive>()?),
        )?;
        debug!("Debug logging enabled");
    }

    info!("Configuration loaded successfully");
    info!("  World host: {}", config.world.address);
    info!("  Discord channel: {}", config.relay.channel_id);

    // ============================================================
    // Start the bridge
    // ============================================================
    let world = Arc::new(WorldLink::new(config.world.address.clone()));
    let relay = Arc::new(SerenityRelay::new());
    let mut controller = BridgeController::new(config, relay.clone());

    let broadcast: Arc<dyn WorldBroadcast> = world.clone();
    if let Err(e) = controller.start(world.clone(), relay.clone(), broadcast).await {
        error!("Failed to start bridge: {}", e);
        // Give a moment for error logs to flush
        tokio::time::sleep(Duration::from_secs(1)).await;
        std::process::exit(1);
    }

    // ============================================================
    // Run the world link until shutdown
    // ============================================================
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut world_task = tokio::spawn(Arc::clone(&world).run(shutdown_rx));

    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - stopping bridge...");
            true
        }
        _ = &mut world_task => false,
    };

    controller.stop().await;

    if shutdown {
        if let Err(e) = shutdown_tx.send(true) {
            debug!("Shutdown channel closed (world link already exited): {}", e);
        }
        match tokio::time::timeout(Duration::from_secs(5), world_task).await {
            Ok(Ok(())) => info!("World link closed gracefully"),
            Ok(Err(e)) => warn!("World link task panicked: {}", e),
            Err(_) => warn!("World link shutdown timed out"),
        }
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
