//! Mutating operations.
//!
//! These are fire-and-forget: the reply text is discarded and every error,
//! script errors included, is returned to the caller.

use tracing::debug;

use crate::client::EpsilonClient;
use crate::error::RpcError;
use crate::scripts::{self, ShipOrder, WeaponCounts};

impl EpsilonClient {
    async fn mutate(&self, name: &'static str, snippet: &str) -> Result<(), RpcError> {
        debug!(command = name, "sending command");
        self.execute(snippet).await.map(drop)
    }

    /// Broadcast a message to every station.
    pub async fn global_message(&self, message: &str) -> Result<(), RpcError> {
        self.mutate("global_message", &scripts::global_message(message))
            .await
    }

    /// End the game with `faction` as winner.
    pub async fn victory(&self, faction: &str) -> Result<(), RpcError> {
        self.mutate("victory", &scripts::victory(faction)).await
    }

    /// Spawn a crewable ship.
    pub async fn spawn_player_ship(
        &self,
        template: &str,
        callsign: &str,
        faction: &str,
        x: f64,
        y: f64,
    ) -> Result<(), RpcError> {
        self.mutate(
            "spawn_player_ship",
            &scripts::spawn_player_ship(template, callsign, faction, x, y),
        )
        .await
    }

    /// Spawn an AI ship.
    pub async fn spawn_cpu_ship(
        &self,
        template: &str,
        faction: &str,
        x: f64,
        y: f64,
        order: ShipOrder,
    ) -> Result<(), RpcError> {
        self.mutate(
            "spawn_cpu_ship",
            &scripts::spawn_cpu_ship(template, faction, x, y, order),
        )
        .await
    }

    /// Spawn a station.
    pub async fn spawn_station(
        &self,
        template: &str,
        faction: &str,
        x: f64,
        y: f64,
    ) -> Result<(), RpcError> {
        self.mutate(
            "spawn_station",
            &scripts::spawn_station(template, faction, x, y),
        )
        .await
    }

    /// Spawn a nebula.
    pub async fn spawn_nebula(&self, x: f64, y: f64) -> Result<(), RpcError> {
        self.mutate("spawn_nebula", &scripts::spawn_nebula(x, y))
            .await
    }

    /// Spawn an asteroid.
    pub async fn spawn_asteroid(&self, x: f64, y: f64) -> Result<(), RpcError> {
        self.mutate("spawn_asteroid", &scripts::spawn_asteroid(x, y))
            .await
    }

    /// Write to a ship's comms log.
    pub async fn send_comms_message(&self, callsign: &str, message: &str) -> Result<(), RpcError> {
        self.mutate(
            "send_comms_message",
            &scripts::send_comms_message(callsign, message),
        )
        .await
    }

    /// Set a ship's hull to a percentage of maximum (clamped to 0..=100).
    pub async fn modify_hull(&self, callsign: &str, percent: f64) -> Result<(), RpcError> {
        self.mutate("modify_hull", &scripts::modify_hull(callsign, percent))
            .await
    }

    /// Set a ship's shields to percentages of maximum (clamped to 0..=100).
    pub async fn modify_shields(
        &self,
        callsign: &str,
        front: f64,
        rear: f64,
    ) -> Result<(), RpcError> {
        self.mutate(
            "modify_shields",
            &scripts::modify_shields(callsign, front, rear),
        )
        .await
    }

    /// Add missiles to a ship.
    pub async fn give_weapons(&self, callsign: &str, counts: &WeaponCounts) -> Result<(), RpcError> {
        self.mutate("give_weapons", &scripts::give_weapons(callsign, counts))
            .await
    }

    /// Red alert on every player ship.
    pub async fn red_alert_all(&self) -> Result<(), RpcError> {
        self.mutate("red_alert_all", &scripts::red_alert_all()).await
    }

    /// Refill every player ship.
    pub async fn resupply_all(&self) -> Result<(), RpcError> {
        self.mutate("resupply_all", &scripts::resupply_all()).await
    }

    /// Repair every player ship.
    pub async fn repair_all(&self) -> Result<(), RpcError> {
        self.mutate("repair_all", &scripts::repair_all()).await
    }

    /// Pause the simulation.
    pub async fn pause(&self) -> Result<(), RpcError> {
        self.mutate("pause", scripts::PAUSE).await
    }

    /// Resume the simulation.
    pub async fn unpause(&self) -> Result<(), RpcError> {
        self.mutate("unpause", scripts::UNPAUSE).await
    }

    /// Stop the game server.
    pub async fn shutdown(&self) -> Result<(), RpcError> {
        self.mutate("shutdown", scripts::SHUTDOWN).await
    }

    /// Run an arbitrary script and return its output.
    ///
    /// The bridge only exposes this when explicitly enabled.
    pub async fn exec_script(&self, code: &str) -> Result<String, RpcError> {
        debug!(len = code.len(), "executing raw script");
        self.execute(code).await
    }
}
