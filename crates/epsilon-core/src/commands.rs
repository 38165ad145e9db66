//! Named commands with validated parameters.
//!
//! A command arrives as a name plus a JSON object. The name picks a
//! [`CommandName`], the object deserializes into that command's parameter
//! struct and is checked with `validator`, then the command runs against the
//! instance's RPC client or remote manager. Every state-changing command is
//! followed by an immediate and a delayed refresh.

use epsilon_rpc::{ShipOrder, WeaponCounts};
use epsilon_types::InstanceId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use validator::Validate;

use crate::error::CommandError;
use crate::instance::InstanceHandle;
use crate::registry::BridgeRegistry;

/// Every command the bridge accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandName {
    /// Broadcast a message to every player station.
    GlobalMessage,
    /// End the scenario with a winning faction.
    Victory,
    /// Spawn a crewable ship.
    SpawnPlayerShip,
    /// Spawn an AI ship.
    SpawnCpuShip,
    /// Spawn a station.
    SpawnStation,
    /// Spawn a nebula.
    SpawnNebula,
    /// Spawn an asteroid.
    SpawnAsteroid,
    /// Write to a ship's comms log.
    SendCommsMessage,
    /// Set a ship's hull percentage.
    ModifyHull,
    /// Set a ship's shield percentages.
    ModifyShields,
    /// Add missiles to a ship.
    GiveWeapons,
    /// Red alert on every player ship.
    RedAlertAll,
    /// Refill every player ship.
    ResupplyAll,
    /// Repair every player ship.
    RepairAll,
    /// Pause the game.
    Pause,
    /// Resume the game.
    Unpause,
    /// Quit the game process.
    Shutdown,
    /// Run arbitrary Lua. Off unless enabled per instance.
    ExecScript,
    /// Deploy config and start the game over SSH.
    StartServer,
    /// Stop the game over SSH.
    StopServer,
    /// Write `hardware.ini` and `options.ini` over SSH.
    DeployConfig,
    /// Poll now.
    Refresh,
}

impl CommandName {
    /// All commands, in declaration order.
    pub const ALL: [Self; 22] = [
        Self::GlobalMessage,
        Self::Victory,
        Self::SpawnPlayerShip,
        Self::SpawnCpuShip,
        Self::SpawnStation,
        Self::SpawnNebula,
        Self::SpawnAsteroid,
        Self::SendCommsMessage,
        Self::ModifyHull,
        Self::ModifyShields,
        Self::GiveWeapons,
        Self::RedAlertAll,
        Self::ResupplyAll,
        Self::RepairAll,
        Self::Pause,
        Self::Unpause,
        Self::Shutdown,
        Self::ExecScript,
        Self::StartServer,
        Self::StopServer,
        Self::DeployConfig,
        Self::Refresh,
    ];

    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GlobalMessage => "global_message",
            Self::Victory => "victory",
            Self::SpawnPlayerShip => "spawn_player_ship",
            Self::SpawnCpuShip => "spawn_cpu_ship",
            Self::SpawnStation => "spawn_station",
            Self::SpawnNebula => "spawn_nebula",
            Self::SpawnAsteroid => "spawn_asteroid",
            Self::SendCommsMessage => "send_comms_message",
            Self::ModifyHull => "modify_hull",
            Self::ModifyShields => "modify_shields",
            Self::GiveWeapons => "give_weapons",
            Self::RedAlertAll => "red_alert_all",
            Self::ResupplyAll => "resupply_all",
            Self::RepairAll => "repair_all",
            Self::Pause => "pause",
            Self::Unpause => "unpause",
            Self::Shutdown => "shutdown",
            Self::ExecScript => "exec_script",
            Self::StartServer => "start_server",
            Self::StopServer => "stop_server",
            Self::DeployConfig => "deploy_config",
            Self::Refresh => "refresh",
        }
    }

    /// Look a command up by wire name.
    ///
    /// # Errors
    ///
    /// [`CommandError::UnknownCommand`] for names not in [`Self::ALL`].
    pub fn parse(name: &str) -> Result<Self, CommandError> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_owned()))
    }

    /// Whether the command needs SSH settings.
    pub const fn needs_ssh(self) -> bool {
        matches!(self, Self::StartServer | Self::StopServer | Self::DeployConfig)
    }
}

impl core::fmt::Display for CommandName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

fn default_navy() -> String {
    "Human Navy".to_owned()
}

fn default_kraylor() -> String {
    "Kraylor".to_owned()
}

fn default_player_template() -> String {
    "Atlantis".to_owned()
}

fn default_cpu_template() -> String {
    "Adder MK3".to_owned()
}

fn default_station_template() -> String {
    "Small Station".to_owned()
}

fn default_callsign() -> String {
    "Epsilon".to_owned()
}

const fn full() -> f64 {
    100.0
}

/// `global_message` parameters.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GlobalMessageParams {
    /// Message text.
    #[validate(length(min = 1))]
    pub message: String,
}

/// `victory` parameters.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VictoryParams {
    /// Winning faction.
    #[serde(default = "default_navy")]
    #[validate(length(min = 1))]
    pub faction: String,
}

/// `spawn_player_ship` parameters.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SpawnPlayerShipParams {
    /// Ship template.
    #[serde(default = "default_player_template")]
    #[validate(length(min = 1))]
    pub template: String,
    /// Call sign.
    #[serde(default = "default_callsign")]
    #[validate(length(min = 1))]
    pub callsign: String,
    /// Faction.
    #[serde(default = "default_navy")]
    #[validate(length(min = 1))]
    pub faction: String,
    /// Sector-space x.
    #[serde(default)]
    pub x: f64,
    /// Sector-space y.
    #[serde(default)]
    pub y: f64,
}

/// `spawn_cpu_ship` parameters.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SpawnCpuShipParams {
    /// Ship template.
    #[serde(default = "default_cpu_template")]
    #[validate(length(min = 1))]
    pub template: String,
    /// Faction.
    #[serde(default = "default_kraylor")]
    #[validate(length(min = 1))]
    pub faction: String,
    /// Sector-space x.
    #[serde(default)]
    pub x: f64,
    /// Sector-space y.
    #[serde(default)]
    pub y: f64,
    /// Initial AI order.
    #[serde(default)]
    pub order: ShipOrder,
}

/// `spawn_station` parameters.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SpawnStationParams {
    /// Station template.
    #[serde(default = "default_station_template")]
    #[validate(length(min = 1))]
    pub template: String,
    /// Faction.
    #[serde(default = "default_navy")]
    #[validate(length(min = 1))]
    pub faction: String,
    /// Sector-space x.
    #[serde(default)]
    pub x: f64,
    /// Sector-space y.
    #[serde(default)]
    pub y: f64,
}

/// Parameters of commands that only need a position.
#[derive(Debug, Clone, Copy, Default, Deserialize, Validate)]
#[serde(default)]
pub struct PositionParams {
    /// Sector-space x.
    pub x: f64,
    /// Sector-space y.
    pub y: f64,
}

/// `send_comms_message` parameters.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CommsMessageParams {
    /// Receiving ship.
    #[validate(length(min = 1))]
    pub callsign: String,
    /// Message text.
    #[validate(length(min = 1))]
    pub message: String,
}

/// `modify_hull` parameters. Values outside 0..=100 are clamped.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ModifyHullParams {
    /// Target ship.
    #[validate(length(min = 1))]
    pub callsign: String,
    /// Percent of maximum hull.
    #[serde(default = "full")]
    pub value: f64,
}

/// `modify_shields` parameters. Values outside 0..=100 are clamped.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ModifyShieldsParams {
    /// Target ship.
    #[validate(length(min = 1))]
    pub callsign: String,
    /// Percent of maximum front shield.
    #[serde(default = "full")]
    pub front: f64,
    /// Percent of maximum rear shield.
    #[serde(default = "full")]
    pub rear: f64,
}

/// `give_weapons` parameters.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GiveWeaponsParams {
    /// Target ship.
    #[validate(length(min = 1))]
    pub callsign: String,
    /// Missiles to add, keyed by weapon.
    #[serde(flatten)]
    pub weapons: WeaponCounts,
}

/// `exec_script` parameters.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExecScriptParams {
    /// Lua source.
    #[validate(length(min = 1))]
    pub code: String,
}

/// `start_server` and `deploy_config` parameters.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ServerParams {
    /// Scenario file; defaults to the configured one.
    #[validate(length(min = 1))]
    pub scenario: Option<String>,
    /// HTTP API port; defaults to the configured one.
    #[validate(range(min = 1))]
    pub httpserver: Option<u16>,
}

/// Deserialize and validate parameters. `null` counts as `{}`.
fn params<T: DeserializeOwned + Validate>(value: Value) -> Result<T, CommandError> {
    let value = if value.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        value
    };
    let parsed: T =
        serde_json::from_value(value).map_err(|e| CommandError::InvalidParams(e.to_string()))?;
    parsed.validate()?;
    Ok(parsed)
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Result of a dispatched command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    /// Instance the command ran on.
    pub instance: InstanceId,
    /// Command that ran.
    pub command: CommandName,
    /// Script output, for `exec_script`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Run `command` on `handle`.
///
/// Returns script output for `exec_script` and `None` otherwise.
///
/// # Errors
///
/// Returns [`CommandError`] if parameters are invalid, the command is
/// disabled or unsupported for this instance, or the game server or remote
/// host reports failure.
pub async fn execute(
    handle: &InstanceHandle,
    command: CommandName,
    raw: Value,
) -> Result<Option<String>, CommandError> {
    let client = handle.coordinator().client();
    let mut output = None;

    match command {
        CommandName::GlobalMessage => {
            let p: GlobalMessageParams = params(raw)?;
            client.global_message(&p.message).await?;
        }
        CommandName::Victory => {
            let p: VictoryParams = params(raw)?;
            client.victory(&p.faction).await?;
        }
        CommandName::SpawnPlayerShip => {
            let p: SpawnPlayerShipParams = params(raw)?;
            client
                .spawn_player_ship(&p.template, &p.callsign, &p.faction, p.x, p.y)
                .await?;
        }
        CommandName::SpawnCpuShip => {
            let p: SpawnCpuShipParams = params(raw)?;
            client
                .spawn_cpu_ship(&p.template, &p.faction, p.x, p.y, p.order)
                .await?;
        }
        CommandName::SpawnStation => {
            let p: SpawnStationParams = params(raw)?;
            client
                .spawn_station(&p.template, &p.faction, p.x, p.y)
                .await?;
        }
        CommandName::SpawnNebula => {
            let p: PositionParams = params(raw)?;
            client.spawn_nebula(p.x, p.y).await?;
        }
        CommandName::SpawnAsteroid => {
            let p: PositionParams = params(raw)?;
            client.spawn_asteroid(p.x, p.y).await?;
        }
        CommandName::SendCommsMessage => {
            let p: CommsMessageParams = params(raw)?;
            client.send_comms_message(&p.callsign, &p.message).await?;
        }
        CommandName::ModifyHull => {
            let p: ModifyHullParams = params(raw)?;
            client.modify_hull(&p.callsign, p.value).await?;
        }
        CommandName::ModifyShields => {
            let p: ModifyShieldsParams = params(raw)?;
            client.modify_shields(&p.callsign, p.front, p.rear).await?;
        }
        CommandName::GiveWeapons => {
            let p: GiveWeaponsParams = params(raw)?;
            client.give_weapons(&p.callsign, &p.weapons).await?;
        }
        CommandName::RedAlertAll => client.red_alert_all().await?,
        CommandName::ResupplyAll => client.resupply_all().await?,
        CommandName::RepairAll => client.repair_all().await?,
        CommandName::Pause => client.pause().await?,
        CommandName::Unpause => client.unpause().await?,
        CommandName::Shutdown => client.shutdown().await?,
        CommandName::ExecScript => {
            if !handle.config().enable_exec_script {
                return Err(CommandError::Disabled("exec_script"));
            }
            let p: ExecScriptParams = params(raw)?;
            output = Some(client.exec_script(&p.code).await?);
        }
        CommandName::StartServer => {
            let p: ServerParams = params(raw)?;
            handle
                .deploy_and_start(p.httpserver, p.scenario.as_deref())
                .await?;
        }
        CommandName::StopServer => {
            let ssh = handle
                .ssh()
                .ok_or_else(|| CommandError::NoSsh(handle.id().clone()))?;
            if !ssh.stop().await {
                return Err(CommandError::Remote("stop"));
            }
        }
        CommandName::DeployConfig => {
            let p: ServerParams = params(raw)?;
            let (ssh, ssh_config) = handle
                .ssh()
                .zip(handle.config().ssh.as_ref())
                .ok_or_else(|| CommandError::NoSsh(handle.id().clone()))?;
            let http_port = p.httpserver.unwrap_or(handle.config().server.http_port);
            let scenario = p.scenario.as_deref().unwrap_or(&ssh_config.scenario);
            if !ssh
                .deploy_config(&handle.deploy_params(http_port, scenario))
                .await
            {
                return Err(CommandError::Remote("deploy_config"));
            }
        }
        CommandName::Refresh => {
            handle.coordinator().request_refresh();
            return Ok(None);
        }
    }

    handle.coordinator().refresh_after_command();
    Ok(output)
}

/// Commands `handle` can run with its configuration.
pub fn available(handle: &InstanceHandle) -> Vec<CommandName> {
    CommandName::ALL
        .into_iter()
        .filter(|c| !c.needs_ssh() || handle.ssh().is_some())
        .filter(|c| *c != CommandName::ExecScript || handle.config().enable_exec_script)
        .collect()
}

/// Resolve the target instance, then run the named command on it.
///
/// # Errors
///
/// Returns [`CommandError`] for unknown commands, unresolvable targets, and
/// anything [`execute`] reports.
pub async fn dispatch(
    registry: &BridgeRegistry,
    target: Option<&InstanceId>,
    name: &str,
    raw: Value,
) -> Result<CommandOutcome, CommandError> {
    let command = CommandName::parse(name)?;
    let handle = registry.resolve(target)?;

    match execute(handle, command, raw).await {
        Ok(output) => {
            info!(instance = %handle.id(), %command, "command executed");
            Ok(CommandOutcome {
                instance: handle.id().clone(),
                command,
                output,
            })
        }
        Err(e) => {
            warn!(instance = %handle.id(), %command, error = %e, "command failed");
            Err(e)
        }
    }
}
