//! Error types for remote management.

use std::time::Duration;

/// Errors from a single remote operation.
///
/// The public operations on [`SshManager`](crate::SshManager) log these
/// and report plain success or failure.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The local `ssh`/`sshpass` process could not be started.
    #[error("failed to launch {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Streaming stdin to, or collecting output from, the local process
    /// failed.
    #[error("remote command I/O failed: {0}")]
    Io(#[source] std::io::Error),

    /// The remote command did not finish in time.
    #[error("remote command timed out after {0:?}")]
    Timeout(Duration),

    /// The remote command exited unsuccessfully.
    #[error("remote command failed (exit {code:?}): {stderr}")]
    Remote {
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },
}
