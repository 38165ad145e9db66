//! Configuration loading and typed config structures for the bridge.
//!
//! The configuration lives in `epsilon-bridge.yaml`. Every section and
//! field has a default, so an empty file (or no file at all) yields a
//! bridge for one game server on `127.0.0.1:8080`.

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use epsilon_deploy::{SshManager, SshTarget};
use epsilon_rpc::ClientConfig;
use epsilon_telemetry::ListenerConfig;
use epsilon_types::InstanceId;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pause::PauseSettings;

/// Default config file name, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "epsilon-bridge.yaml";

/// Top-level bridge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Game servers to bridge.
    #[serde(default = "default_instances")]
    pub instances: Vec<InstanceConfig>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            logging: LoggingConfig::default(),
            instances: default_instances(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a YAML file, apply environment overrides
    /// and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] or [`ConfigError::Invalid`].
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load from `EPSILON_CONFIG`, or [`DEFAULT_CONFIG_PATH`] when unset.
    ///
    /// A missing default file yields the default configuration; a missing
    /// file named explicitly through the environment is an error.
    ///
    /// # Errors
    ///
    /// See [`BridgeConfig::from_file`].
    pub fn load() -> Result<(Self, PathBuf), ConfigError> {
        match std::env::var("EPSILON_CONFIG") {
            Ok(path) => {
                let path = PathBuf::from(path);
                Self::from_file(&path).map(|config| (config, path))
            }
            Err(_) => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::from_file(&path).map(|config| (config, path))
                } else {
                    let mut config = Self::default();
                    config.apply_overrides(|key| std::env::var(key).ok());
                    config.validate()?;
                    Ok((config, path))
                }
            }
        }
    }

    /// Apply `EPSILON_GATEWAY_HOST` and `EPSILON_GATEWAY_PORT`.
    ///
    /// `lookup` resolves a variable name; unparsable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("EPSILON_GATEWAY_HOST") {
            self.gateway.host = host;
        }
        if let Some(port) = lookup("EPSILON_GATEWAY_PORT").and_then(|p| p.parse().ok()) {
            self.gateway.port = port;
        }
    }

    /// Check invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instances.is_empty() {
            return Err(ConfigError::Invalid("no instances configured".to_owned()));
        }
        let mut seen = BTreeSet::new();
        for instance in &self.instances {
            instance.validate()?;
            if !seen.insert(instance.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate instance id: {}",
                    instance.id
                )));
            }
        }
        Ok(())
    }
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// One bridged game server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// URL-safe identifier (`[a-z0-9_-]+`).
    pub id: InstanceId,

    /// Display name.
    #[serde(default = "default_instance_name")]
    pub name: String,

    /// Scripting endpoint.
    #[serde(default)]
    pub server: ServerConfig,

    /// Telemetry feed.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Refresh cadence.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Pause inference thresholds.
    #[serde(default)]
    pub pause_inference: PauseInferenceConfig,

    /// Remote management; commands that need it fail without it.
    #[serde(default)]
    pub ssh: Option<SshConfig>,

    /// Allow the raw script execution command.
    #[serde(default)]
    pub enable_exec_script: bool,

    /// Victory faction substring that counts as a win (case-insensitive).
    #[serde(default = "default_victory_keyword")]
    pub victory_keyword: String,
}

impl InstanceConfig {
    /// A default instance named `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: InstanceId::new(id),
            name: default_instance_name(),
            server: ServerConfig::default(),
            telemetry: TelemetryConfig::default(),
            polling: PollingConfig::default(),
            pause_inference: PauseInferenceConfig::default(),
            ssh: None,
            enable_exec_script: false,
            victory_keyword: default_victory_keyword(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let id = self.id.as_str();
        let slug = !id.is_empty()
            && id
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
        if !slug {
            return Err(ConfigError::Invalid(format!(
                "instance id {id:?} must match [a-z0-9_-]+"
            )));
        }
        if self.polling.interval_seconds == 0 {
            return Err(ConfigError::Invalid(format!(
                "{id}: polling.interval_seconds must be positive"
            )));
        }
        if self.pause_inference.resume_confirmations == 0 {
            return Err(ConfigError::Invalid(format!(
                "{id}: pause_inference.resume_confirmations must be positive"
            )));
        }
        if !self.pause_inference.threshold_seconds.is_finite()
            || self.pause_inference.threshold_seconds <= 0.0
        {
            return Err(ConfigError::Invalid(format!(
                "{id}: pause_inference.threshold_seconds must be positive"
            )));
        }
        if self.telemetry.universe == 0 || self.telemetry.universe > 63_999 {
            return Err(ConfigError::Invalid(format!(
                "{id}: telemetry.universe {} outside 1..=63999",
                self.telemetry.universe
            )));
        }
        Ok(())
    }

    /// RPC client settings.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            host: self.server.host.clone(),
            port: self.server.http_port,
            timeout: Duration::from_millis(self.server.request_timeout_ms),
        }
    }

    /// Telemetry socket settings.
    pub const fn listener_config(&self) -> ListenerConfig {
        ListenerConfig {
            bind_addr: self.telemetry.bind_address,
            port: self.telemetry.bind_port,
            universe: self.telemetry.universe,
        }
    }

    /// Pause inference settings.
    pub const fn pause_settings(&self) -> PauseSettings {
        PauseSettings {
            min_sample_spacing: Duration::from_millis(self.pause_inference.min_sample_spacing_ms),
            threshold_seconds: self.pause_inference.threshold_seconds,
            resume_confirmations: self.pause_inference.resume_confirmations,
        }
    }

    /// Remote manager, when SSH is configured.
    pub fn ssh_manager(&self) -> Option<SshManager> {
        self.ssh.as_ref().map(|ssh| {
            let target = SshTarget {
                host: ssh.host.clone().unwrap_or_else(|| self.server.host.clone()),
                port: ssh.port,
                username: ssh.username.clone(),
                password: ssh.password.clone().filter(|p| !p.is_empty()),
                key_path: ssh.key_path.clone(),
                known_hosts: ssh.known_hosts.clone(),
                skip_host_key_check: ssh.skip_host_key_check,
            };
            SshManager::new(target, ssh.install_path.clone())
        })
    }
}

/// Scripting endpoint of the game server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host name or address.
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Port of the game's HTTP server.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            http_port: default_http_port(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Telemetry feed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// sACN universe.
    #[serde(default = "default_universe")]
    pub universe: u16,

    /// DMX slots the game is told to send.
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Game-side retransmission delay in milliseconds.
    #[serde(default = "default_resend_delay_ms")]
    pub resend_delay_ms: u32,

    /// Local address for the UDP socket.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Local UDP port.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Minimum milliseconds between telemetry-triggered refreshes.
    #[serde(default = "default_burst_refresh_min_ms")]
    pub burst_refresh_min_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            universe: default_universe(),
            channels: default_channels(),
            resend_delay_ms: default_resend_delay_ms(),
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            burst_refresh_min_ms: default_burst_refresh_min_ms(),
        }
    }
}

/// Refresh cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between scheduled refreshes.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    /// Milliseconds after a command before the follow-up refresh.
    #[serde(default = "default_command_refresh_delay_ms")]
    pub command_refresh_delay_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            command_refresh_delay_ms: default_command_refresh_delay_ms(),
        }
    }
}

/// Pause inference thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauseInferenceConfig {
    /// Minimum real time between samples that are compared.
    #[serde(default = "default_min_sample_spacing_ms")]
    pub min_sample_spacing_ms: u64,

    /// Scenario-clock advance below which a sample counts as stalled.
    #[serde(default = "default_threshold_seconds")]
    pub threshold_seconds: f64,

    /// Consecutive advancing samples needed to leave the paused state.
    #[serde(default = "default_resume_confirmations")]
    pub resume_confirmations: u32,
}

impl Default for PauseInferenceConfig {
    fn default() -> Self {
        Self {
            min_sample_spacing_ms: default_min_sample_spacing_ms(),
            threshold_seconds: default_threshold_seconds(),
            resume_confirmations: default_resume_confirmations(),
        }
    }
}

/// Remote management settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshConfig {
    /// SSH host; defaults to the server host.
    #[serde(default)]
    pub host: Option<String>,

    /// SSH port.
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// Remote user.
    pub username: String,

    /// Password (requires `sshpass` locally).
    #[serde(default)]
    pub password: Option<String>,

    /// Private key file.
    #[serde(default)]
    pub key_path: Option<PathBuf>,

    /// `known_hosts` file for host key verification.
    #[serde(default)]
    pub known_hosts: Option<PathBuf>,

    /// Accept any host key.
    #[serde(default = "default_true")]
    pub skip_host_key_check: bool,

    /// Game install directory on the remote host.
    #[serde(default = "default_install_path")]
    pub install_path: String,

    /// Deploy config and start the game when the bridge starts.
    #[serde(default)]
    pub start_on_launch: bool,

    /// Seconds to wait after a launch-time start before polling.
    #[serde(default = "default_startup_delay_seconds")]
    pub startup_delay_seconds: u64,

    /// Scenario loaded by the headless server.
    #[serde(default = "default_scenario")]
    pub scenario: String,
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_instances() -> Vec<InstanceConfig> {
    vec![InstanceConfig::new("local")]
}

fn default_gateway_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_gateway_port() -> u16 {
    8099
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_instance_name() -> String {
    "EmptyEpsilon".to_owned()
}

fn default_victory_keyword() -> String {
    "human".to_owned()
}

fn default_server_host() -> String {
    "127.0.0.1".to_owned()
}

const fn default_http_port() -> u16 {
    8080
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}

const fn default_universe() -> u16 {
    2
}

const fn default_channels() -> u16 {
    50
}

const fn default_resend_delay_ms() -> u32 {
    50
}

const fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

const fn default_bind_port() -> u16 {
    epsilon_telemetry::packet::E131_PORT
}

const fn default_burst_refresh_min_ms() -> u64 {
    2_000
}

const fn default_interval_seconds() -> u64 {
    10
}

const fn default_command_refresh_delay_ms() -> u64 {
    1_000
}

const fn default_min_sample_spacing_ms() -> u64 {
    1_000
}

const fn default_threshold_seconds() -> f64 {
    0.5
}

const fn default_resume_confirmations() -> u32 {
    2
}

const fn default_ssh_port() -> u16 {
    22
}

const fn default_true() -> bool {
    true
}

fn default_install_path() -> String {
    "/opt/EmptyEpsilon".to_owned()
}

const fn default_startup_delay_seconds() -> u64 {
    8
}

fn default_scenario() -> String {
    "scenario_00_basic.lua".to_owned()
}
