//! Bridge binary.
//!
//! Wires configured game servers into running instances and serves them
//! through the gateway.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `epsilon-bridge.yaml` (or `EPSILON_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Launch every configured instance: telemetry listener, coordinator
//!    loop and, when asked, a remote deploy and start
//! 4. Serve the gateway until `Ctrl-C`
//! 5. Stop every instance

mod error;

use std::sync::Arc;

use anyhow::Context as _;
use epsilon_core::config::LoggingConfig;
use epsilon_core::{BridgeConfig, BridgeRegistry, InstanceHandle};
use epsilon_gateway::AppState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::error::BridgeError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, no instance starts, or the
/// gateway cannot serve.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, path) = BridgeConfig::load()
        .map_err(BridgeError::from)
        .context("loading configuration")?;

    init_logging(&config.logging);
    info!(
        path = %path.display(),
        instances = config.instances.len(),
        gateway = %format!("{}:{}", config.gateway.host, config.gateway.port),
        "configuration loaded"
    );

    let registry = Arc::new(launch_all(config.instances).await?);

    let state = Arc::new(AppState::new(Arc::clone(&registry)));
    let served = epsilon_gateway::start_server(&config.gateway, state, shutdown_signal())
        .await
        .map_err(BridgeError::from)
        .context("running gateway");

    registry.shutdown();
    info!("epsilon-bridge stopped");
    served
}

fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Launch every instance. One that fails is logged and skipped; the bridge
/// only gives up when none start.
async fn launch_all(
    instances: Vec<epsilon_core::InstanceConfig>,
) -> Result<BridgeRegistry, BridgeError> {
    let mut registry = BridgeRegistry::new();
    let mut failed = 0_usize;

    for config in instances {
        let id = config.id.clone();
        match InstanceHandle::launch(config).await {
            Ok(handle) => {
                registry.insert(handle);
            }
            Err(e) => {
                error!(instance = %id, error = %e, "instance failed to start");
                failed = failed.saturating_add(1);
            }
        }
    }

    if registry.is_empty() {
        return Err(BridgeError::NoInstances { failed });
    }
    info!(running = registry.len(), failed, "instances launched");
    Ok(registry)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            error!(error = %e, "cannot listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
