//! Error types for the core crate.

use epsilon_rpc::RpcError;
use epsilon_telemetry::TelemetryError;
use epsilon_types::InstanceId;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// A fusion cycle that could not produce a snapshot at all.
///
/// Transport failures are not in here: an unreachable server still
/// yields a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// The telemetry state could not be read.
    #[error("telemetry unavailable: {0}")]
    Telemetry(#[from] TelemetryError),

    /// An RPC failure that is not transport-class.
    #[error("rpc failure: {0}")]
    Rpc(#[from] RpcError),
}

/// Errors from starting an instance.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// The RPC client could not be built.
    #[error("rpc client for {instance}: {source}")]
    Client {
        /// Instance being started.
        instance: InstanceId,
        /// Underlying error.
        source: RpcError,
    },

    /// The telemetry socket or decoder could not be set up.
    #[error("telemetry for {instance}: {source}")]
    Telemetry {
        /// Instance being started.
        instance: InstanceId,
        /// Underlying error.
        source: TelemetryError,
    },
}

/// Errors surfaced to whoever invoked a command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// No command with that name exists.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The parameters did not deserialize.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// The parameters deserialized but failed validation.
    #[error("parameter validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// The named instance is not configured.
    #[error("unknown instance: {0}")]
    UnknownInstance(InstanceId),

    /// No instance was named and more than one is configured.
    #[error("multiple instances configured; specify instance_id")]
    AmbiguousTarget,

    /// No instances are configured at all.
    #[error("no instances configured")]
    NoInstances,

    /// The command is switched off in configuration.
    #[error("{0} is disabled for this instance")]
    Disabled(&'static str),

    /// The command needs SSH settings the instance does not have.
    #[error("no ssh settings configured for {0}")]
    NoSsh(InstanceId),

    /// The game server rejected or did not receive the command.
    #[error("rpc failure: {0}")]
    Rpc(#[from] RpcError),

    /// A remote management operation reported failure.
    #[error("remote operation failed: {0}")]
    Remote(&'static str),
}
