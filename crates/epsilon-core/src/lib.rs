//! State fusion and control for the Epsilon bridge.
//!
//! Each configured game server gets one [`Coordinator`] that merges the
//! live telemetry feed with facts queried over RPC, infers whether the
//! game is paused, derives a [`GameStatus`](epsilon_types::GameStatus),
//! and publishes the result. Everything a platform sees, entities and
//! commands alike, is layered on top of those publications.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration with environment overrides
//! - [`pause`] -- Pause inference from the scenario clock
//! - [`status`] -- Game status derivation
//! - [`hub`] -- Publication fan-out (callbacks and a watch channel)
//! - [`throttle`] -- Burst throttle for telemetry-triggered refreshes
//! - [`delayed`] -- One-shot delayed refresh timer
//! - [`coordinator`] -- The fusion cycle and its scheduling loop
//! - [`instance`] -- Wiring one configured server into running tasks
//! - [`registry`] -- All running instances, owned by the composition root
//! - [`entities`] -- Platform entities projected from snapshots
//! - [`commands`] -- Named commands with validated parameters
//! - [`error`] -- Error types

pub mod commands;
pub mod config;
pub mod coordinator;
pub mod delayed;
pub mod entities;
pub mod error;
pub mod hub;
pub mod instance;
pub mod pause;
pub mod registry;
pub mod status;
pub mod throttle;

pub use commands::{CommandName, CommandOutcome, dispatch};
pub use config::{BridgeConfig, InstanceConfig};
pub use coordinator::{Coordinator, CoordinatorSettings};
pub use entities::{EntityDescriptor, EntityKind, EntityState, catalog};
pub use error::{CommandError, ConfigError, CoordinatorError, LaunchError};
pub use hub::{PublicationHub, SubscriberCallback};
pub use instance::InstanceHandle;
pub use pause::{PauseInferencer, PauseSettings, PauseState};
pub use registry::BridgeRegistry;
pub use status::derive_status;
