//! Error types for the RPC client.

/// Errors returned by [`EpsilonClient`](crate::EpsilonClient).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    /// Connection refused, DNS failure, timeout, or an unreadable body.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a status other than 200.
    #[error("server returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The server ran the script and reported a Lua error.
    #[error("script error: {0}")]
    Script(String),
}

impl RpcError {
    /// Whether the failure means the server could not be talked to.
    ///
    /// Both transport failures and non-200 statuses count; a script error
    /// proves the server is up.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }
}
