//! Shared application state for the gateway.

use std::sync::Arc;

use epsilon_core::{BridgeRegistry, InstanceHandle};
use epsilon_types::InstanceId;

use crate::error::GatewayError;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. The
/// registry is owned by the binary and outlives the server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Every running instance.
    pub registry: Arc<BridgeRegistry>,
}

impl AppState {
    /// Wrap a registry.
    pub const fn new(registry: Arc<BridgeRegistry>) -> Self {
        Self { registry }
    }

    /// Look up an instance by the id in a request path.
    pub fn instance(&self, id: &str) -> Result<&Arc<InstanceHandle>, GatewayError> {
        self.registry
            .get(&InstanceId::new(id))
            .ok_or_else(|| GatewayError::NotFound(id.to_owned()))
    }
}
