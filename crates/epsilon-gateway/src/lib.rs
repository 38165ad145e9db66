//! HTTP gateway for the Epsilon bridge.
//!
//! This crate provides an Axum server that exposes every bridged game
//! server to a home-automation platform:
//!
//! - **REST endpoints** for instance listings, the latest publication,
//!   projected entity states and diagnostics
//! - **Command endpoints** that run named, validated commands
//! - **`WebSocket` endpoint** (`/ws/instances/{id}`) streaming every
//!   publication as JSON
//!
//! # Architecture
//!
//! Handlers never poll the game server themselves. Reads come from each
//! coordinator's latest publication; writes go through
//! [`epsilon_core::dispatch`], which schedules the follow-up refreshes.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use error::GatewayError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
