//! Platform entities projected from snapshots.
//!
//! Every entity is an [`EntityDescriptor`]: a key, a name, an icon and an
//! [`EntityKind`] carrying plain projection functions. Entities hold no
//! state of their own; their value is recomputed from the latest
//! [`Publication`] whenever asked.

use epsilon_types::{Channel, GameStatus, Publication, Snapshot};
use serde::Serialize;

use crate::commands::CommandName;

/// A projected value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntityValue {
    /// On/off.
    Bool(bool),
    /// Count.
    Count(u32),
    /// Measurement.
    Number(f64),
    /// Text.
    Text(String),
}

/// Projection producing a sensor value, `None` meaning unavailable.
pub type ValueProjection = fn(&Snapshot) -> Option<EntityValue>;

/// Projection producing an on/off state, `None` meaning unavailable.
pub type StateProjection = fn(&Snapshot) -> Option<bool>;

/// What kind of entity this is and how it reads the snapshot.
#[derive(Debug, Clone, Copy)]
pub enum EntityKind {
    /// Read-only value.
    Sensor {
        /// Value projection.
        project: ValueProjection,
        /// Unit of measurement.
        unit: Option<&'static str>,
    },
    /// Read-only on/off.
    BinarySensor {
        /// State projection.
        project: StateProjection,
    },
    /// On/off backed by a pair of commands.
    Switch {
        /// State projection.
        project: StateProjection,
        /// Command run to switch on.
        turn_on: CommandName,
        /// Command run to switch off.
        turn_off: CommandName,
    },
    /// Stateless action.
    Button {
        /// Command run on press.
        press: CommandName,
    },
}

impl EntityKind {
    /// Platform name of the kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sensor { .. } => "sensor",
            Self::BinarySensor { .. } => "binary_sensor",
            Self::Switch { .. } => "switch",
            Self::Button { .. } => "button",
        }
    }
}

/// Static description of one entity.
#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    /// Stable key, unique per instance.
    pub key: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Material Design icon.
    pub icon: &'static str,
    /// Diagnostic entities are hidden by default on most platforms.
    pub diagnostic: bool,
    /// Kind and projections.
    pub kind: EntityKind,
}

/// Commands an entity can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityCommands {
    /// Switch on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_on: Option<CommandName>,
    /// Switch off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_off: Option<CommandName>,
    /// Press.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub press: Option<CommandName>,
}

/// The current state of one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    /// Stable key.
    pub key: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Kind name.
    pub kind: &'static str,
    /// Icon.
    pub icon: &'static str,
    /// Unit, for sensors that have one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    /// Diagnostic flag.
    pub diagnostic: bool,
    /// Whether the value can be trusted.
    pub available: bool,
    /// Current value; `None` when unavailable and for buttons.
    pub value: Option<EntityValue>,
    /// Commands the entity triggers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commands: Option<EntityCommands>,
}

impl EntityDescriptor {
    /// Project the entity's state from `publication`.
    ///
    /// Everything is unavailable after a failed cycle.
    pub fn project(&self, publication: &Publication) -> EntityState {
        let snapshot = publication.snapshot.as_ref();
        let healthy = publication.last_update_success;

        let (value, unit, commands) = match self.kind {
            EntityKind::Sensor { project, unit } => (project(snapshot), unit, None),
            EntityKind::BinarySensor { project } => {
                (project(snapshot).map(EntityValue::Bool), None, None)
            }
            EntityKind::Switch {
                project,
                turn_on,
                turn_off,
            } => (
                project(snapshot).map(EntityValue::Bool),
                None,
                Some(EntityCommands {
                    turn_on: Some(turn_on),
                    turn_off: Some(turn_off),
                    press: None,
                }),
            ),
            EntityKind::Button { press } => (
                None,
                None,
                Some(EntityCommands {
                    turn_on: None,
                    turn_off: None,
                    press: Some(press),
                }),
            ),
        };

        let available = healthy
            && match self.kind {
                EntityKind::Button { .. } => snapshot.server_reachable,
                _ => value.is_some(),
            };

        EntityState {
            key: self.key,
            name: self.name,
            kind: self.kind.as_str(),
            icon: self.icon,
            unit,
            diagnostic: self.diagnostic,
            available,
            value: if available { value } else { None },
            commands,
        }
    }
}

/// Project every entity in the catalog.
pub fn project_all(publication: &Publication) -> Vec<EntityState> {
    catalog().iter().map(|d| d.project(publication)).collect()
}

/// Find a descriptor by key.
pub fn find(key: &str) -> Option<&'static EntityDescriptor> {
    catalog().iter().find(|d| d.key == key)
}

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Facts only mean something when the server answered.
fn fact<T>(snapshot: &Snapshot, get: impl FnOnce(&Snapshot) -> Option<T>) -> Option<T> {
    if snapshot.server_reachable {
        get(snapshot)
    } else {
        None
    }
}

fn percent(snapshot: &Snapshot, channel: Channel) -> Option<EntityValue> {
    Some(EntityValue::Number(round1(snapshot.telemetry.get(channel) * 100.0)))
}

fn game_status(s: &Snapshot) -> Option<EntityValue> {
    Some(EntityValue::Text(s.status.as_str().to_owned()))
}

fn player_ship_count(s: &Snapshot) -> Option<EntityValue> {
    fact(s, |s| Some(EntityValue::Count(s.facts.player_ship_count)))
}

fn scenario_time(s: &Snapshot) -> Option<EntityValue> {
    fact(s, |s| s.facts.scenario_time.map(|t| EntityValue::Number(round1(t))))
}

fn active_scenario(s: &Snapshot) -> Option<EntityValue> {
    fact(s, |s| s.facts.active_scenario.clone().map(EntityValue::Text))
}

fn victory_faction(s: &Snapshot) -> Option<EntityValue> {
    fact(s, |s| s.facts.victory_faction.clone().map(EntityValue::Text))
}

fn total_objects(s: &Snapshot) -> Option<EntityValue> {
    fact(s, |s| Some(EntityValue::Count(s.facts.total_objects)))
}

fn enemy_ship_count(s: &Snapshot) -> Option<EntityValue> {
    fact(s, |s| Some(EntityValue::Count(s.facts.enemy_ship_count)))
}

fn friendly_station_count(s: &Snapshot) -> Option<EntityValue> {
    fact(s, |s| Some(EntityValue::Count(s.facts.friendly_station_count)))
}

fn callsign(s: &Snapshot) -> Option<EntityValue> {
    fact(s, |s| s.facts.primary_ship.callsign.clone().map(EntityValue::Text))
}

fn ship_type(s: &Snapshot) -> Option<EntityValue> {
    fact(s, |s| s.facts.primary_ship.ship_type.clone().map(EntityValue::Text))
}

fn sector(s: &Snapshot) -> Option<EntityValue> {
    fact(s, |s| s.facts.primary_ship.sector.clone().map(EntityValue::Text))
}

fn homing(s: &Snapshot) -> Option<EntityValue> {
    fact(s, |s| s.facts.primary_ship.homing.map(EntityValue::Count))
}

fn nuke(s: &Snapshot) -> Option<EntityValue> {
    fact(s, |s| s.facts.primary_ship.nuke.map(EntityValue::Count))
}

fn emp(s: &Snapshot) -> Option<EntityValue> {
    fact(s, |s| s.facts.primary_ship.emp.map(EntityValue::Count))
}

fn mine(s: &Snapshot) -> Option<EntityValue> {
    fact(s, |s| s.facts.primary_ship.mine.map(EntityValue::Count))
}

fn hvli(s: &Snapshot) -> Option<EntityValue> {
    fact(s, |s| s.facts.primary_ship.hvli.map(EntityValue::Count))
}

fn reputation(s: &Snapshot) -> Option<EntityValue> {
    fact(s, |s| s.facts.primary_ship.reputation.map(EntityValue::Count))
}

fn hull(s: &Snapshot) -> Option<EntityValue> {
    percent(s, Channel::Hull)
}

fn front_shield(s: &Snapshot) -> Option<EntityValue> {
    percent(s, Channel::FrontShield)
}

fn rear_shield(s: &Snapshot) -> Option<EntityValue> {
    percent(s, Channel::RearShield)
}

fn energy(s: &Snapshot) -> Option<EntityValue> {
    percent(s, Channel::Energy)
}

fn impulse(s: &Snapshot) -> Option<EntityValue> {
    percent(s, Channel::Impulse)
}

fn warp(s: &Snapshot) -> Option<EntityValue> {
    percent(s, Channel::Warp)
}

fn online(s: &Snapshot) -> Option<bool> {
    Some(s.server_reachable || s.telemetry.is_on(Channel::HasShip))
}

fn http_server(s: &Snapshot) -> Option<bool> {
    Some(s.server_reachable)
}

fn has_ship(s: &Snapshot) -> Option<bool> {
    Some(s.telemetry.is_on(Channel::HasShip))
}

fn game_paused(s: &Snapshot) -> Option<bool> {
    fact(s, |s| Some(s.status == GameStatus::Paused))
}

fn shields_up(s: &Snapshot) -> Option<bool> {
    Some(s.telemetry.is_on(Channel::ShieldsUp))
}

fn docked(s: &Snapshot) -> Option<bool> {
    Some(s.telemetry.is_on(Channel::Docked))
}

fn docking(s: &Snapshot) -> Option<bool> {
    Some(s.telemetry.is_on(Channel::Docking))
}

fn red_alert(s: &Snapshot) -> Option<bool> {
    Some(s.telemetry.is_on(Channel::RedAlert))
}

fn yellow_alert(s: &Snapshot) -> Option<bool> {
    Some(s.telemetry.is_on(Channel::YellowAlert))
}

const fn sensor(
    key: &'static str,
    name: &'static str,
    icon: &'static str,
    unit: Option<&'static str>,
    project: ValueProjection,
) -> EntityDescriptor {
    EntityDescriptor {
        key,
        name,
        icon,
        diagnostic: false,
        kind: EntityKind::Sensor { project, unit },
    }
}

const fn binary(
    key: &'static str,
    name: &'static str,
    icon: &'static str,
    project: StateProjection,
) -> EntityDescriptor {
    EntityDescriptor {
        key,
        name,
        icon,
        diagnostic: false,
        kind: EntityKind::BinarySensor { project },
    }
}

const fn button(
    key: &'static str,
    name: &'static str,
    icon: &'static str,
    press: CommandName,
) -> EntityDescriptor {
    EntityDescriptor {
        key,
        name,
        icon,
        diagnostic: false,
        kind: EntityKind::Button { press },
    }
}

const fn diagnostic(mut descriptor: EntityDescriptor) -> EntityDescriptor {
    descriptor.diagnostic = true;
    descriptor
}

const PERCENT: Option<&str> = Some("%");

static CATALOG: [EntityDescriptor; 36] = [
    // Game state
    sensor("game_status", "Game status", "mdi:gamepad-variant", None, game_status),
    sensor("player_ship_count", "Player ship count", "mdi:ship", Some("ships"), player_ship_count),
    sensor("scenario_time", "Scenario time", "mdi:clock-outline", Some("s"), scenario_time),
    sensor("active_scenario", "Active scenario", "mdi:map", None, active_scenario),
    sensor("victory_faction", "Victory faction", "mdi:trophy", None, victory_faction),
    sensor("total_objects", "Total objects", "mdi:earth", Some("objects"), total_objects),
    sensor("enemy_ship_count", "Enemy ships", "mdi:skull-crossbones", Some("ships"), enemy_ship_count),
    sensor(
        "friendly_station_count",
        "Friendly stations",
        "mdi:space-station",
        Some("stations"),
        friendly_station_count,
    ),
    // Primary ship, from RPC
    sensor("callsign", "Callsign", "mdi:card-account-details", None, callsign),
    sensor("ship_type", "Ship type", "mdi:rocket", None, ship_type),
    sensor("sector", "Sector", "mdi:grid", None, sector),
    sensor("homing", "Homing missiles", "mdi:rocket-launch", None, homing),
    sensor("nuke", "Nukes", "mdi:radioactive", None, nuke),
    sensor("emp", "EMPs", "mdi:flash", None, emp),
    sensor("mine", "Mines", "mdi:mine", None, mine),
    sensor("hvli", "HVLI", "mdi:bullet", None, hvli),
    sensor("reputation", "Reputation", "mdi:star", Some("points"), reputation),
    // Primary ship, from telemetry
    sensor("hull", "Hull", "mdi:shield-half-full", PERCENT, hull),
    sensor("front_shield", "Front shields", "mdi:shield", PERCENT, front_shield),
    sensor("rear_shield", "Rear shields", "mdi:shield-outline", PERCENT, rear_shield),
    sensor("energy", "Energy", "mdi:battery", PERCENT, energy),
    sensor("impulse", "Impulse", "mdi:speedometer", None, impulse),
    sensor("warp", "Warp", "mdi:speedometer-medium", None, warp),
    // Binary sensors
    diagnostic(binary("server_reachable", "Online", "mdi:server-network", online)),
    diagnostic(binary("http_server", "HTTP server", "mdi:web", http_server)),
    binary("has_ship", "Has ship", "mdi:ship", has_ship),
    binary("game_paused", "Game paused", "mdi:pause", game_paused),
    binary("shields_up", "Shields up", "mdi:shield", shields_up),
    binary("docked", "Docked", "mdi:anchor", docked),
    binary("docking", "Docking", "mdi:ship-wheel", docking),
    binary("red_alert", "Red alert", "mdi:alarm-light", red_alert),
    binary("yellow_alert", "Yellow alert", "mdi:alarm-light-outline", yellow_alert),
    // Controls
    EntityDescriptor {
        key: "pause",
        name: "Pause",
        icon: "mdi:pause",
        diagnostic: false,
        kind: EntityKind::Switch {
            project: game_paused,
            turn_on: CommandName::Pause,
            turn_off: CommandName::Unpause,
        },
    },
    button("red_alert_all", "Red alert all", "mdi:alert", CommandName::RedAlertAll),
    button(
        "resupply_all",
        "Resupply all",
        "mdi:package-variant-closed",
        CommandName::ResupplyAll,
    ),
    button("repair_all", "Repair all", "mdi:wrench", CommandName::RepairAll),
];

/// Every entity a bridged instance exposes.
pub fn catalog() -> &'static [EntityDescriptor] {
    &CATALOG
}
