//! Lua snippets sent to `exec.lua`.
//!
//! Read-only queries are constants so a test server can match on them.
//! Mutations are built from typed arguments; every piece of free text goes
//! through [`lua_string`] and every number through [`lua_number`], so no
//! caller-supplied value can break out of its literal.

use serde::Deserialize;

/// `"true"` iff a scenario is loaded and at least one player ship exists.
pub const HAS_GAME: &str =
    "return tostring(getScenarioTime() ~= nil and getPlayerShip(-1) ~= nil)";

/// Scenario clock in seconds, or an empty string without a scenario.
pub const SCENARIO_TIME: &str = "return tostring(getScenarioTime() or '')";

/// Number of player ships, counted from index 1 until the first gap.
pub const PLAYER_SHIP_COUNT: &str =
    "local n = 0; while getPlayerShip(n + 1) do n = n + 1 end; return tostring(n)";

/// Winning faction name, or an empty string while the game is running.
pub const VICTORY_FACTION: &str = "local g = gameGlobalInfo; \
     if g then return tostring(g:getVictoryFaction() or '') end; return ''";

/// `"true"`/`"false"` from the game speed, `"unknown"` when the server
/// cannot tell (headless servers do not report a speed).
pub const PAUSED: &str = "local ok, speed = pcall(function() return gameGlobalInfo:getGameSpeed() end); \
     if ok and speed ~= nil then return tostring(speed == 0) end; return 'unknown'";

/// Name of the loaded scenario, or an empty string.
pub const ACTIVE_SCENARIO: &str = "local ok, name = pcall(function() return gameGlobalInfo:getScenarioName() end); \
     if ok and name ~= nil then return tostring(name) end; return ''";

/// Count of every object in the world.
pub const TOTAL_OBJECTS: &str = "return tostring(#getAllObjects())";

/// Count of CPU ships hostile to the primary player ship.
pub const ENEMY_SHIP_COUNT: &str = "local p = getPlayerShip(-1); if not p then return '0' end; \
     local n = 0; for _, o in ipairs(getAllObjects()) do \
     if o.typeName == 'CpuShip' and o:isEnemy(p) then n = n + 1 end end; return tostring(n)";

/// Count of stations friendly to the primary player ship.
pub const FRIENDLY_STATION_COUNT: &str = "local p = getPlayerShip(-1); if not p then return '0' end; \
     local n = 0; for _, o in ipairs(getAllObjects()) do \
     if o.typeName == 'SpaceStation' and o:isFriendly(p) then n = n + 1 end end; return tostring(n)";

/// Nine `|`-separated fields describing the primary player ship:
/// callsign, type, sector, homing, nuke, EMP, mine, HVLI, reputation.
pub const PRIMARY_SHIP: &str = "local p = getPlayerShip(-1); if not p then return '' end; \
     local function f(fn) local ok, v = pcall(fn); if ok and v ~= nil then return tostring(v) end; return '' end; \
     return table.concat({\
     f(function() return p:getCallSign() end), \
     f(function() return p:getTypeName() end), \
     f(function() return p:getSectorName() end), \
     f(function() return p:getWeaponStorage('Homing') end), \
     f(function() return p:getWeaponStorage('Nuke') end), \
     f(function() return p:getWeaponStorage('EMP') end), \
     f(function() return p:getWeaponStorage('Mine') end), \
     f(function() return p:getWeaponStorage('HVLI') end), \
     f(function() return p:getReputationPoints() end)}, '|')";

/// Liveness probe.
pub const PING: &str = "return \"ok\"";

/// Pause the simulation.
pub const PAUSE: &str = "pauseGame()";

/// Resume the simulation.
pub const UNPAUSE: &str = "unpauseGame()";

/// Stop the game server process.
pub const SHUTDOWN: &str = "shutdownGame()";

/// Weapon storage names in the order the game uses them.
const WEAPONS: [&str; 5] = ["Homing", "Nuke", "EMP", "Mine", "HVLI"];

/// Ship systems restored by a full repair.
const SYSTEMS: [&str; 9] = [
    "reactor",
    "beamweapons",
    "missilesystem",
    "maneuver",
    "impulse",
    "warp",
    "jumpdrive",
    "frontshield",
    "rearshield",
];

/// Standing order for a spawned CPU ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipOrder {
    /// Hold position.
    #[default]
    Idle,
    /// Wander and engage.
    Roam,
}

impl ShipOrder {
    const fn method(self) -> &'static str {
        match self {
            Self::Idle => "orderIdle()",
            Self::Roam => "orderRoaming()",
        }
    }
}

/// Missiles added to a ship's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct WeaponCounts {
    /// Homing missiles.
    pub homing: u32,
    /// Nukes.
    pub nuke: u32,
    /// EMPs.
    pub emp: u32,
    /// Mines.
    pub mine: u32,
    /// HVLI rounds.
    pub hvli: u32,
}

impl WeaponCounts {
    const fn by_weapon(&self) -> [u32; 5] {
        [self.homing, self.nuke, self.emp, self.mine, self.hvli]
    }
}

/// Quote `text` as a Lua double-quoted string literal.
///
/// Backslash, double quote, newline, carriage return and NUL are escaped.
pub fn lua_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len().saturating_add(2));
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Render a float as a Lua number literal. Non-finite values become `0`.
pub fn lua_number(value: f64) -> String {
    if value.is_finite() {
        format!("{value}")
    } else {
        "0".to_owned()
    }
}

fn percent(value: f64) -> String {
    let clamped = if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    };
    lua_number(clamped)
}

/// Run `body` with `p` bound to every player ship.
fn for_each_player_ship(body: &str) -> String {
    format!(
        "local n = 1; while true do local p = getPlayerShip(n); \
         if not p then break end; {body}; n = n + 1 end"
    )
}

/// Run `body` with `p` bound to each player ship whose callsign matches.
fn with_player_ship(callsign: &str, body: &str) -> String {
    for_each_player_ship(&format!(
        "if p:getCallSign() == {} then {body} end",
        lua_string(callsign)
    ))
}

/// Broadcast a message to every station.
pub fn global_message(message: &str) -> String {
    format!("globalMessage({})", lua_string(message))
}

/// Declare `faction` the winner.
pub fn victory(faction: &str) -> String {
    format!("victory({})", lua_string(faction))
}

/// Spawn a crewable ship.
pub fn spawn_player_ship(template: &str, callsign: &str, faction: &str, x: f64, y: f64) -> String {
    format!(
        "PlayerSpaceship():setTemplate({}):setCallSign({}):setFaction({}):setPosition({}, {})",
        lua_string(template),
        lua_string(callsign),
        lua_string(faction),
        lua_number(x),
        lua_number(y)
    )
}

/// Spawn an AI ship with a standing order.
pub fn spawn_cpu_ship(template: &str, faction: &str, x: f64, y: f64, order: ShipOrder) -> String {
    format!(
        "CpuShip():setTemplate({}):setFaction({}):setPosition({}, {}):{}",
        lua_string(template),
        lua_string(faction),
        lua_number(x),
        lua_number(y),
        order.method()
    )
}

/// Spawn a station.
pub fn spawn_station(template: &str, faction: &str, x: f64, y: f64) -> String {
    format!(
        "SpaceStation():setTemplate({}):setFaction({}):setPosition({}, {})",
        lua_string(template),
        lua_string(faction),
        lua_number(x),
        lua_number(y)
    )
}

/// Spawn a nebula.
pub fn spawn_nebula(x: f64, y: f64) -> String {
    format!("Nebula():setPosition({}, {})", lua_number(x), lua_number(y))
}

/// Spawn an asteroid.
pub fn spawn_asteroid(x: f64, y: f64) -> String {
    format!("Asteroid():setPosition({}, {})", lua_number(x), lua_number(y))
}

/// Append a line to a ship's comms log.
pub fn send_comms_message(callsign: &str, message: &str) -> String {
    with_player_ship(
        callsign,
        &format!("p:addToShipLog({}, \"white\")", lua_string(message)),
    )
}

/// Set hull to a percentage of its maximum.
pub fn modify_hull(callsign: &str, percent_of_max: f64) -> String {
    with_player_ship(
        callsign,
        &format!("p:setHull(p:getHullMax() * {} / 100)", percent(percent_of_max)),
    )
}

/// Set front and rear shields to percentages of their maxima.
pub fn modify_shields(callsign: &str, front: f64, rear: f64) -> String {
    with_player_ship(
        callsign,
        &format!(
            "p:setShields(p:getShieldMax(0) * {} / 100, p:getShieldMax(1) * {} / 100)",
            percent(front),
            percent(rear)
        ),
    )
}

/// Add missiles to a ship's storage.
pub fn give_weapons(callsign: &str, counts: &WeaponCounts) -> String {
    let body = WEAPONS
        .iter()
        .zip(counts.by_weapon())
        .filter(|(_, count)| *count > 0)
        .map(|(weapon, count)| {
            format!("p:setWeaponStorage(\"{weapon}\", p:getWeaponStorage(\"{weapon}\") + {count})")
        })
        .collect::<Vec<_>>()
        .join("; ");
    with_player_ship(callsign, &body)
}

/// Put every player ship on red alert.
pub fn red_alert_all() -> String {
    for_each_player_ship("p:commandSetAlertLevel(\"red\")")
}

/// Refill every player ship's missiles and energy.
pub fn resupply_all() -> String {
    let refill = WEAPONS
        .iter()
        .map(|w| format!("p:setWeaponStorage(\"{w}\", p:getWeaponStorageMax(\"{w}\"))"))
        .collect::<Vec<_>>()
        .join("; ");
    for_each_player_ship(&format!("{refill}; p:setEnergy(p:getMaxEnergy())"))
}

/// Restore hull, shields and system health on every player ship.
pub fn repair_all() -> String {
    let systems = SYSTEMS
        .iter()
        .map(|s| format!("p:setSystemHealth(\"{s}\", 1.0)"))
        .collect::<Vec<_>>()
        .join("; ");
    for_each_player_ship(&format!(
        "p:setHull(p:getHullMax()); p:setShields(p:getShieldMax(0), p:getShieldMax(1)); {systems}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lua_string_escapes_breakout_characters() {
        assert_eq!(lua_string("plain"), "\"plain\"");
        assert_eq!(
            lua_string("a\"b\\c\nd\re\0f"),
            "\"a\\\"b\\\\c\\nd\\re\\0f\""
        );
    }

    #[test]
    fn injected_quote_stays_inside_literal() {
        let script = global_message("\") shutdownGame() --");
        assert_eq!(script, "globalMessage(\"\\\") shutdownGame() --\")");
    }

    #[test]
    fn non_finite_numbers_become_zero() {
        assert_eq!(lua_number(f64::NAN), "0");
        assert_eq!(lua_number(f64::INFINITY), "0");
        assert_eq!(lua_number(-1500.5), "-1500.5");
        assert_eq!(spawn_nebula(f64::NEG_INFINITY, 2.0), "Nebula():setPosition(0, 2)");
    }

    #[test]
    fn cpu_ship_order_is_appended() {
        let idle = spawn_cpu_ship("Adder MK3", "Kraylor", 0.0, 0.0, ShipOrder::Idle);
        assert!(idle.ends_with(":orderIdle()"));
        let roam = spawn_cpu_ship("Adder MK3", "Kraylor", 0.0, 0.0, ShipOrder::Roam);
        assert!(roam.ends_with(":orderRoaming()"));
    }

    #[test]
    fn hull_percentage_is_clamped() {
        assert!(modify_hull("Epsilon", 250.0).contains("p:getHullMax() * 100 / 100"));
        assert!(modify_hull("Epsilon", -3.0).contains("p:getHullMax() * 0 / 100"));
        let shields = modify_shields("Epsilon", 50.0, f64::NAN);
        assert!(shields.contains("getShieldMax(0) * 50 / 100"));
        assert!(shields.contains("getShieldMax(1) * 0 / 100"));
    }

    #[test]
    fn give_weapons_skips_zero_counts() {
        let counts = WeaponCounts {
            homing: 4,
            hvli: 10,
            ..WeaponCounts::default()
        };
        let script = give_weapons("Epsilon", &counts);
        assert!(script.contains("getWeaponStorage(\"Homing\") + 4"));
        assert!(script.contains("getWeaponStorage(\"HVLI\") + 10"));
        assert!(!script.contains("\"Nuke\""));
        assert!(script.contains("p:getCallSign() == \"Epsilon\""));
    }

    #[test]
    fn ship_order_deserializes_from_snake_case() {
        let order: Result<ShipOrder, _> = serde_json::from_str("\"roam\"");
        assert_eq!(order.ok(), Some(ShipOrder::Roam));
    }
}
