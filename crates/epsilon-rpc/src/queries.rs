//! Typed read-only queries.
//!
//! Only transport-class failures ([`RpcError::is_transport`]) escape from
//! these methods. A script error or a reply that does not parse yields the
//! query's safe default, because a half-initialised scenario routinely
//! produces both and they say nothing about whether the server is up.

use epsilon_types::PrimaryShip;
use tracing::debug;

use crate::client::EpsilonClient;
use crate::error::RpcError;
use crate::parse;
use crate::scripts;

impl EpsilonClient {
    /// Run a query, mapping script errors to `None`.
    async fn query(&self, name: &'static str, snippet: &str) -> Result<Option<String>, RpcError> {
        match self.execute(snippet).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.is_transport() => Err(e),
            Err(e) => {
                debug!(query = name, error = %e, "query failed, using default");
                Ok(None)
            }
        }
    }

    async fn query_count(&self, name: &'static str, snippet: &str) -> Result<u32, RpcError> {
        Ok(self
            .query(name, snippet)
            .await?
            .map_or(0, |text| parse::count_or_zero(&text)))
    }

    /// Whether a scenario is loaded with at least one player ship.
    pub async fn has_game(&self) -> Result<bool, RpcError> {
        Ok(self
            .query("has_game", scripts::HAS_GAME)
            .await?
            .is_some_and(|text| parse::boolean(&text)))
    }

    /// Scenario clock in seconds; `None` without a scenario.
    pub async fn scenario_time(&self) -> Result<Option<f64>, RpcError> {
        Ok(self
            .query("scenario_time", scripts::SCENARIO_TIME)
            .await?
            .and_then(|text| parse::float(&text)))
    }

    /// Number of player ships.
    pub async fn player_ship_count(&self) -> Result<u32, RpcError> {
        self.query_count("player_ship_count", scripts::PLAYER_SHIP_COUNT)
            .await
    }

    /// Winning faction once the game is over.
    pub async fn victory_faction(&self) -> Result<Option<String>, RpcError> {
        Ok(self
            .query("victory_faction", scripts::VICTORY_FACTION)
            .await?
            .and_then(|text| parse::non_empty(&text)))
    }

    /// Whether the server reports the game as paused.
    ///
    /// `None` when the server cannot tell, which is normal for headless
    /// servers; callers fall back to inference.
    pub async fn paused(&self) -> Result<Option<bool>, RpcError> {
        Ok(self
            .query("paused", scripts::PAUSED)
            .await?
            .and_then(|text| parse::tristate(&text)))
    }

    /// Name of the loaded scenario.
    pub async fn active_scenario(&self) -> Result<Option<String>, RpcError> {
        Ok(self
            .query("active_scenario", scripts::ACTIVE_SCENARIO)
            .await?
            .and_then(|text| parse::non_empty(&text)))
    }

    /// Number of objects in the world.
    pub async fn total_objects(&self) -> Result<u32, RpcError> {
        self.query_count("total_objects", scripts::TOTAL_OBJECTS)
            .await
    }

    /// Number of CPU ships hostile to the primary player ship.
    pub async fn enemy_ship_count(&self) -> Result<u32, RpcError> {
        self.query_count("enemy_ship_count", scripts::ENEMY_SHIP_COUNT)
            .await
    }

    /// Number of stations friendly to the primary player ship.
    pub async fn friendly_station_count(&self) -> Result<u32, RpcError> {
        self.query_count("friendly_station_count", scripts::FRIENDLY_STATION_COUNT)
            .await
    }

    /// Details of the primary player ship in one round trip.
    pub async fn primary_ship(&self) -> Result<PrimaryShip, RpcError> {
        Ok(self
            .query("primary_ship", scripts::PRIMARY_SHIP)
            .await?
            .map(|text| parse::primary_ship(&text))
            .unwrap_or_default())
    }

    /// Whether the server runs scripts at all.
    ///
    /// Unlike the other queries a script error is returned, since the
    /// probe is meant to surface exactly that.
    pub async fn ping(&self) -> Result<bool, RpcError> {
        let reply = self.execute(scripts::PING).await?;
        Ok(reply.trim() == "ok")
    }
}
