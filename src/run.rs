//! Server bootstrap: wire the store, registry, hub and webserver together and
//! run until a shutdown signal arrives.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::{
    broadcast::BroadcastHub,
    config::{self, Config},
    devices::{DeviceRegistry, DeviceStore, SqliteBackend},
    logger::{self, LogTag},
    paths,
    webserver::{self, AppState},
};

/// Main server execution function - handles the full lifecycle
pub async fn run_server() -> Result<(), String> {
    logger::info(LogTag::System, "Device tracker starting up...");

    // 1. Configuration (file -> env -> CLI)
    let config_path = paths::get_config_path();
    config::load_config_from_path(&config_path)?;
    let config = config::get_config_clone();

    log_cli_overrides();

    // 2. Broadcast hub and its dispatcher
    let hub = BroadcastHub::new(config.broadcast.observer_buffer_size);
    let dispatcher = hub
        .spawn_dispatcher()
        .ok_or("Broadcast dispatcher already running")?;

    // 3. Device store and registry
    let store = open_store(&config)?;
    logger::info(
        LogTag::Devices,
        &format!(
            "Device store ready ({} devices, persistent={})",
            store.len(),
            store.is_persistent()
        ),
    );
    let registry = Arc::new(
        DeviceRegistry::new(Arc::new(store), Arc::clone(&hub))
            .with_default_category(config.devices.default_category.clone()),
    );

    // 4. Webserver
    let state = Arc::new(AppState::new(
        registry,
        config.auth.clone(),
        &config.broadcast,
        config.webserver.cors_enabled,
    ));

    let addr: SocketAddr = format!("{}:{}", config.webserver.host, config.webserver.port)
        .parse()
        .map_err(|e| format!("Invalid bind address: {}", e))?;

    let shutdown_hub = Arc::clone(&hub);
    let shutdown = async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            logger::error(LogTag::System, &format!("Signal handling failed: {}", e));
        }
        // Closing the hub ends every observer stream, which closes the sockets
        shutdown_hub.shutdown().await;
    };

    let served = webserver::start_server(state, addr, shutdown).await;

    // 5. Teardown
    hub.shutdown().await;
    if let Err(e) = dispatcher.await {
        logger::warning(
            LogTag::Broadcast,
            &format!("Dispatcher task ended abnormally: {}", e),
        );
    }

    let metrics = hub.metrics().snapshot();
    logger::info(
        LogTag::System,
        &format!(
            "Device tracker stopped (events={}, deliveries={}, dropped={})",
            metrics.events_published, metrics.deliveries, metrics.dropped_full
        ),
    );
    logger::flush();

    served
}

fn open_store(config: &Config) -> Result<DeviceStore, String> {
    if !config.devices.persistence_enabled {
        logger::warning(
            LogTag::Devices,
            "Persistence disabled - devices live in memory only",
        );
        return Ok(DeviceStore::in_memory());
    }

    let db_path = paths::resolve_database_path(&config.devices.database_file);
    let backend = SqliteBackend::open(&db_path)?;
    logger::debug(
        LogTag::Database,
        &format!("Using device database at {}", backend.database_path()),
    );

    DeviceStore::with_backend(Arc::new(backend))
        .map_err(|e| format!("Failed to load devices: {}", e))
}

fn log_cli_overrides() {
    if let Some(port) = crate::arguments::get_port_override() {
        if crate::arguments::is_privileged_port(port) {
            logger::warning(
                LogTag::System,
                &format!(
                    "Port {} requires elevated privileges (root/Administrator)",
                    port
                ),
            );
        }
        logger::info(LogTag::System, &format!("CLI override: Using port {}", port));
    }

    if let Some(host) = crate::arguments::get_host_override() {
        logger::info(LogTag::System, &format!("CLI override: Using host {}", host));
        if host == "0.0.0.0" {
            logger::warning(
                LogTag::System,
                "Binding to 0.0.0.0 allows remote access - ensure firewall is configured",
            );
        }
    }
}

async fn wait_for_shutdown_signal() -> Result<(), String> {
    logger::debug(LogTag::System, "Waiting for shutdown signal");

    #[cfg(unix)]
    let signal_name = {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint =
            signal(SignalKind::interrupt()).map_err(|e| format!("Failed to bind SIGINT: {}", e))?;
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| format!("Failed to bind SIGTERM: {}", e))?;

        tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        }
    };

    #[cfg(not(unix))]
    let signal_name = {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| format!("Failed to listen for shutdown signal: {}", e))?;
        "CTRL_C"
    };

    logger::warning(
        LogTag::System,
        &format!(
            "Shutdown signal received ({}). Press Ctrl+C again to force kill.",
            signal_name
        ),
    );

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            logger::error(LogTag::System, "Second Ctrl+C detected, forcing exit");
            logger::flush();
            std::process::exit(130);
        }
    });

    Ok(())
}
