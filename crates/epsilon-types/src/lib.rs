//! Shared type definitions for the Epsilon bridge.
//!
//! This crate is the single source of truth for the values that flow
//! between the telemetry decoder, the RPC client, the fusion coordinator
//! and the gateway. Nothing here performs I/O.
//!
//! # Modules
//!
//! - [`ids`] -- Identifiers for bridge instances and subscriptions
//! - [`telemetry`] -- The fixed channel set and the decoded telemetry map
//! - [`facts`] -- Facts fetched from the game server each fusion cycle
//! - [`status`] -- The derived game status enumeration
//! - [`snapshot`] -- The published unit handed to subscribers

pub mod facts;
pub mod ids;
pub mod snapshot;
pub mod status;
pub mod telemetry;

// Re-export all public types at crate root for convenience.
pub use facts::{GameFacts, PauseSource, PrimaryShip};
pub use ids::{InstanceId, SubscriptionId};
pub use snapshot::{Publication, Snapshot};
pub use status::GameStatus;
pub use telemetry::{Channel, TelemetrySnapshot};
