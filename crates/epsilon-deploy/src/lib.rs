//! Remote management of an `EmptyEpsilon` server.
//!
//! The bridge can start and stop the game on another machine and push the
//! configuration that makes the game broadcast telemetry. All remote work
//! goes through the system `ssh` client (with `sshpass` when a password is
//! configured), so there is no SSH implementation in-process.
//!
//! # Modules
//!
//! - [`ini`] -- `hardware.ini` and `options.ini` generators
//! - [`ssh`] -- Remote command runner and the start/stop/deploy operations
//! - [`error`] -- Error types

pub mod error;
pub mod ini;
pub mod ssh;

pub use error::DeployError;
pub use ini::{HardwareIni, OptionsIni};
pub use ssh::{DeployParams, SshManager, SshTarget, StartParams, shell_quote};
