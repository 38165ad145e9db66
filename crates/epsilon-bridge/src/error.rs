//! Error types for the bridge binary.

/// Top-level startup and run failures.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: epsilon_core::ConfigError,
    },

    /// Every configured instance failed to start.
    #[error("no instance could be started ({failed} failed)")]
    NoInstances {
        /// How many instances were attempted.
        failed: usize,
    },

    /// The gateway failed to bind or serve.
    #[error("gateway error: {source}")]
    Gateway {
        /// The underlying server error.
        #[from]
        source: epsilon_gateway::ServerError,
    },
}
