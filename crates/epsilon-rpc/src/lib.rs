//! Remote procedure client for the `EmptyEpsilon` game server.
//!
//! The game exposes one HTTP endpoint, `POST /exec.lua`, which runs the
//! request body as a Lua script and returns whatever the script returns as
//! plain text. Everything the bridge asks of the server is a short Lua
//! snippet built in [`scripts`].
//!
//! # Modules
//!
//! - [`client`] -- HTTP transport and error classification
//! - [`scripts`] -- Lua snippets and safe literal builders
//! - [`parse`] -- Lenient reply parsing
//! - [`queries`] -- Typed read-only queries that degrade to defaults
//! - [`commands`] -- Mutating operations
//! - [`error`] -- Error types

pub mod client;
pub mod commands;
pub mod error;
pub mod parse;
pub mod queries;
pub mod scripts;

pub use client::{ClientConfig, EpsilonClient};
pub use error::RpcError;
pub use scripts::{ShipOrder, WeaponCounts};
