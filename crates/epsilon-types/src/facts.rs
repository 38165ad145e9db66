//! Facts fetched from the game server's scripting endpoint.

use serde::{Deserialize, Serialize};

/// Where the published pause flag came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseSource {
    /// The server answered the pause query directly.
    Reported,
    /// The server's answer was indeterminate; the flag was inferred from the
    /// scenario clock.
    #[default]
    Inferred,
}

/// Detailed status of the first player-controlled ship.
///
/// Every field is independently optional: the server may have no player
/// ship, or a field may be missing from the reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryShip {
    /// Ship call sign.
    pub callsign: Option<String>,
    /// Ship template name.
    pub ship_type: Option<String>,
    /// Sector designation (e.g. `F5`).
    pub sector: Option<String>,
    /// Homing missiles in storage.
    pub homing: Option<u32>,
    /// Nukes in storage.
    pub nuke: Option<u32>,
    /// EMP missiles in storage.
    pub emp: Option<u32>,
    /// Mines in storage.
    pub mine: Option<u32>,
    /// HVLI rounds in storage.
    pub hvli: Option<u32>,
    /// Reputation points.
    pub reputation: Option<u32>,
}

impl PrimaryShip {
    /// Whether the reply described no ship at all.
    pub const fn is_empty(&self) -> bool {
        self.callsign.is_none()
            && self.ship_type.is_none()
            && self.sector.is_none()
            && self.homing.is_none()
            && self.nuke.is_none()
            && self.emp.is_none()
            && self.mine.is_none()
            && self.hvli.is_none()
            && self.reputation.is_none()
    }
}

/// Authoritative facts collected during one fusion cycle.
///
/// `Default` is the "no game" shape: every count zero, every optional
/// field empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameFacts {
    /// A scenario is loaded and a player ship exists.
    pub has_game: bool,
    /// Scenario clock in seconds, when a game runs.
    pub scenario_time: Option<f64>,
    /// Number of active player ships.
    pub player_ship_count: u32,
    /// Whether the game is paused (reported or inferred).
    pub paused: bool,
    /// Provenance of [`paused`](Self::paused).
    pub pause_source: PauseSource,
    /// Faction that won, once the game is over.
    pub victory_faction: Option<String>,
    /// Name of the running scenario.
    pub active_scenario: Option<String>,
    /// Number of objects in the world.
    pub total_objects: u32,
    /// Ships hostile to the primary ship.
    pub enemy_ship_count: u32,
    /// Stations friendly to the primary ship.
    pub friendly_station_count: u32,
    /// Primary ship details.
    pub primary_ship: PrimaryShip,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_facts_describe_no_game() {
        let facts = GameFacts::default();
        assert!(!facts.has_game);
        assert!(facts.scenario_time.is_none());
        assert_eq!(facts.player_ship_count, 0);
        assert!(facts.primary_ship.is_empty());
    }

    #[test]
    fn primary_ship_with_one_field_is_not_empty() {
        let ship = PrimaryShip {
            reputation: Some(0),
            ..PrimaryShip::default()
        };
        assert!(!ship.is_empty());
    }
}
