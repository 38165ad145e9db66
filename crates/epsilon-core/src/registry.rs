//! All running instances.
//!
//! The registry is built once by the composition root and shared by `Arc`
//! with the gateway; there is no global state.

use std::collections::BTreeMap;
use std::sync::Arc;

use epsilon_types::InstanceId;

use crate::error::CommandError;
use crate::instance::InstanceHandle;

/// Instances keyed by id.
#[derive(Debug, Default)]
pub struct BridgeRegistry {
    instances: BTreeMap<InstanceId, Arc<InstanceHandle>>,
}

impl BridgeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance, returning any instance it replaced.
    pub fn insert(&mut self, handle: Arc<InstanceHandle>) -> Option<Arc<InstanceHandle>> {
        self.instances.insert(handle.id().clone(), handle)
    }

    /// Look up an instance.
    pub fn get(&self, id: &InstanceId) -> Option<&Arc<InstanceHandle>> {
        self.instances.get(id)
    }

    /// Instances in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<InstanceHandle>> {
        self.instances.values()
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether no instance is registered.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Pick the instance a command targets.
    ///
    /// An explicit id must exist. Without one, the only registered instance
    /// is used.
    ///
    /// # Errors
    ///
    /// [`CommandError::UnknownInstance`], [`CommandError::NoInstances`] or
    /// [`CommandError::AmbiguousTarget`].
    pub fn resolve(&self, target: Option<&InstanceId>) -> Result<&Arc<InstanceHandle>, CommandError> {
        if let Some(id) = target {
            return self
                .get(id)
                .ok_or_else(|| CommandError::UnknownInstance(id.clone()));
        }
        let mut all = self.instances.values();
        match (all.next(), all.next()) {
            (None, _) => Err(CommandError::NoInstances),
            (Some(only), None) => Ok(only),
            (Some(_), Some(_)) => Err(CommandError::AmbiguousTarget),
        }
    }

    /// Stop every instance's tasks.
    pub fn shutdown(&self) {
        for handle in self.instances.values() {
            handle.shutdown();
        }
    }
}
