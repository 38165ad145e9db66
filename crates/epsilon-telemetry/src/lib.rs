//! Telemetry decoding for the Epsilon bridge.
//!
//! The game drives a virtual lighting console: every variable of the
//! primary ship is written to one DMX slot and broadcast as an sACN
//! (E1.31) packet roughly twenty times per second. This crate turns those
//! packets back into named channel values.
//!
//! # Modules
//!
//! - [`spec`] -- Static channel table shared with the hardware config
//!   generator, and the linear decode law
//! - [`packet`] -- E1.31 envelope validation and DMX payload extraction
//! - [`decoder`] -- Universe filtering, partial updates, burst callback
//! - [`listener`] -- Tokio UDP socket that feeds the decoder
//! - [`error`] -- Error types

pub mod decoder;
pub mod error;
pub mod listener;
pub mod packet;
pub mod spec;

pub use decoder::{TelemetryCallback, TelemetryDecoder};
pub use error::TelemetryError;
pub use listener::{ListenerConfig, TelemetryListener};
pub use spec::{CHANNEL_SPEC, ChannelSpec, decode_value};
