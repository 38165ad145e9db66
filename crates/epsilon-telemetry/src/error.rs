//! Error types for telemetry intake.

/// Errors surfaced by the telemetry decoder and listener.
///
/// Malformed packets are not errors: they are common noise on a shared
/// broadcast network and are dropped inside the decoder.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The UDP socket could not be bound.
    #[error("failed to bind telemetry socket on {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: std::net::SocketAddr,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configured universe is outside the valid E1.31 range.
    #[error("invalid universe {0}: must be within 1..=63999")]
    InvalidUniverse(u16),

    /// A panic while holding the telemetry lock left it poisoned.
    #[error("telemetry state lock poisoned")]
    Poisoned,
}
