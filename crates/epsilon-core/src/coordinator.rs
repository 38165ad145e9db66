//! The fusion cycle and its scheduling loop.
//!
//! A cycle reads the latest telemetry, asks the game server for facts,
//! feeds the pause inferencer, derives the status and publishes one
//! [`Snapshot`]. Cycles are triggered by:
//!
//! 1. **Interval** -- the poll timer, reset after every cycle
//! 2. **Telemetry** -- any accepted packet, throttled by [`BurstThrottle`]
//! 3. **Explicit** -- [`Coordinator::request_refresh`], including the
//!    delayed follow-up after a command
//!
//! Triggers that arrive while a cycle is running collapse into a single
//! follow-up cycle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use epsilon_rpc::{EpsilonClient, RpcError};
use epsilon_telemetry::{TelemetryCallback, TelemetryDecoder, TelemetryError};
use epsilon_types::{
    GameFacts, GameStatus, InstanceId, PauseSource, Publication, Snapshot, SubscriptionId,
    TelemetrySnapshot,
};
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::InstanceConfig;
use crate::delayed::DelayedRefresh;
use crate::error::CoordinatorError;
use crate::hub::{PublicationHub, SubscriberCallback};
use crate::pause::{PauseInferencer, PauseSettings};
use crate::status::derive_status;
use crate::throttle::BurstThrottle;

/// Where a cycle reads telemetry from.
pub trait TelemetrySource: Send + Sync {
    /// Copy of the latest decoded values.
    ///
    /// # Errors
    ///
    /// Any error here is a hard cycle failure.
    fn telemetry(&self) -> Result<TelemetrySnapshot, TelemetryError>;
}

impl TelemetrySource for TelemetryDecoder {
    fn telemetry(&self) -> Result<TelemetrySnapshot, TelemetryError> {
        self.snapshot()
    }
}

/// Timing and policy for one coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorSettings {
    /// Time between scheduled cycles.
    pub poll_interval: Duration,
    /// Minimum time between telemetry-triggered cycles.
    pub burst_refresh_min: Duration,
    /// Delay of the follow-up cycle after a command.
    pub command_refresh_delay: Duration,
    /// Pause inference thresholds.
    pub pause: PauseSettings,
    /// Victory faction substring that counts as a win.
    pub victory_keyword: String,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            burst_refresh_min: Duration::from_secs(2),
            command_refresh_delay: Duration::from_secs(1),
            pause: PauseSettings::default(),
            victory_keyword: "human".to_owned(),
        }
    }
}

impl CoordinatorSettings {
    /// Settings for a configured instance.
    pub fn from_config(config: &InstanceConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.polling.interval_seconds),
            burst_refresh_min: Duration::from_millis(config.telemetry.burst_refresh_min_ms),
            command_refresh_delay: Duration::from_millis(config.polling.command_refresh_delay_ms),
            pause: config.pause_settings(),
            victory_keyword: config.victory_keyword.clone(),
        }
    }
}

/// Owns the fused state of one game server.
pub struct Coordinator {
    instance: InstanceId,
    client: EpsilonClient,
    telemetry: Arc<dyn TelemetrySource>,
    settings: CoordinatorSettings,
    /// Held for the whole cycle; only one cycle runs at a time.
    cycle: Mutex<PauseInferencer>,
    hub: PublicationHub,
    refresh_signal: Arc<Notify>,
    shutdown: Notify,
    throttle: BurstThrottle,
    delayed: DelayedRefresh,
}

impl Coordinator {
    /// Create a coordinator. Nothing runs until [`Coordinator::spawn`] or
    /// a manual [`Coordinator::refresh`].
    pub fn new(
        instance: InstanceId,
        client: EpsilonClient,
        telemetry: Arc<dyn TelemetrySource>,
        settings: CoordinatorSettings,
    ) -> Self {
        let refresh_signal = Arc::new(Notify::new());
        Self {
            instance,
            client,
            telemetry,
            cycle: Mutex::new(PauseInferencer::new(settings.pause)),
            hub: PublicationHub::new(Publication::success(Arc::new(Snapshot::initial()))),
            throttle: BurstThrottle::new(settings.burst_refresh_min),
            delayed: DelayedRefresh::new(Arc::clone(&refresh_signal)),
            refresh_signal,
            shutdown: Notify::new(),
            settings,
        }
    }

    /// Instance this coordinator serves.
    pub const fn instance_id(&self) -> &InstanceId {
        &self.instance
    }

    /// RPC client for the game server.
    pub const fn client(&self) -> &EpsilonClient {
        &self.client
    }

    /// Active settings.
    pub const fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    // -----------------------------------------------------------------------
    // Subscriber interface
    // -----------------------------------------------------------------------

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.hub.snapshot()
    }

    /// Latest publication, including the outcome of the last cycle.
    pub fn publication(&self) -> Publication {
        self.hub.current()
    }

    /// Register a callback for every publication.
    pub fn subscribe(&self, callback: SubscriberCallback) -> SubscriptionId {
        self.hub.subscribe(callback)
    }

    /// Remove a callback.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.hub.unsubscribe(id)
    }

    /// Receiver for async consumers.
    pub fn watch(&self) -> watch::Receiver<Publication> {
        self.hub.watch()
    }

    // -----------------------------------------------------------------------
    // Triggers
    // -----------------------------------------------------------------------

    /// Ask the loop for a cycle as soon as possible.
    pub fn request_refresh(&self) {
        self.refresh_signal.notify_one();
    }

    /// Request an immediate cycle and a follow-up after the command delay.
    pub fn refresh_after_command(&self) {
        self.request_refresh();
        self.delayed.schedule(self.settings.command_refresh_delay);
    }

    /// Telemetry arrived at `now`. Returns whether a refresh was requested.
    pub fn on_telemetry(&self, now: Instant) -> bool {
        let allowed = self.throttle.try_acquire(now);
        if allowed {
            self.request_refresh();
        }
        allowed
    }

    /// Callback to install on the telemetry decoder.
    ///
    /// Holds only a weak reference, so the decoder does not keep the
    /// coordinator alive.
    pub fn telemetry_trigger(self: &Arc<Self>) -> TelemetryCallback {
        let weak = Arc::downgrade(self);
        Arc::new(move |_snapshot: &TelemetrySnapshot| {
            if let Some(coordinator) = weak.upgrade() {
                coordinator.on_telemetry(Instant::now());
            }
        })
    }

    // -----------------------------------------------------------------------
    // Loop
    // -----------------------------------------------------------------------

    /// Start the scheduling loop.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run())
    }

    /// Stop the loop after the current cycle and cancel the delayed
    /// refresh.
    pub fn stop(&self) {
        self.shutdown.notify_one();
        self.delayed.cancel();
    }

    /// Run cycles until [`Coordinator::stop`] is called.
    pub async fn run(self: Arc<Self>) {
        info!(
            instance = %self.instance,
            endpoint = self.client.endpoint(),
            interval_secs = self.settings.poll_interval.as_secs(),
            "coordinator started"
        );
        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.shutdown.notified() => break,
                _ = ticker.tick() => {}
                () = self.refresh_signal.notified() => {}
            }
            self.refresh().await;
            ticker.reset();
        }
        info!(instance = %self.instance, "coordinator stopped");
    }

    // -----------------------------------------------------------------------
    // Cycle
    // -----------------------------------------------------------------------

    /// Run one cycle now.
    pub async fn refresh(&self) -> Publication {
        self.refresh_at(Instant::now()).await
    }

    /// Run one cycle as if the current instant were `now`.
    ///
    /// Publishes and returns the resulting publication. A hard failure
    /// keeps the previous snapshot and marks the publication failed.
    pub async fn refresh_at(&self, now: Instant) -> Publication {
        let mut inferencer = self.cycle.lock().await;
        let previous = self.hub.snapshot();

        let publication = match self.collect(&previous, now, &mut inferencer).await {
            Ok(snapshot) => Publication::success(Arc::new(snapshot)),
            Err(e) => {
                warn!(
                    instance = %self.instance,
                    error = %e,
                    "fusion cycle failed, keeping previous snapshot"
                );
                Publication::failure(previous, e.to_string())
            }
        };

        self.hub.publish(publication.clone());
        publication
    }

    async fn collect(
        &self,
        previous: &Snapshot,
        now: Instant,
        inferencer: &mut PauseInferencer,
    ) -> Result<Snapshot, CoordinatorError> {
        let telemetry = self.telemetry.telemetry()?;

        let (facts, server_reachable) = match self.fetch_facts(now, inferencer).await {
            Ok(facts) => (facts, true),
            Err(e) if e.is_transport() => {
                if previous.server_reachable || previous.cycle == 0 {
                    warn!(instance = %self.instance, error = %e, "game server unreachable");
                } else {
                    debug!(instance = %self.instance, error = %e, "game server still unreachable");
                }
                (GameFacts::default(), false)
            }
            Err(e) => return Err(e.into()),
        };

        let status = if server_reachable {
            derive_status(&facts, &self.settings.victory_keyword)
        } else {
            GameStatus::Setup
        };
        if status != previous.status {
            info!(
                instance = %self.instance,
                from = %previous.status,
                to = %status,
                "game status changed"
            );
        }

        Ok(Snapshot {
            cycle: previous.cycle.saturating_add(1),
            telemetry,
            facts,
            status,
            server_reachable,
            published_at: Utc::now(),
        })
    }

    async fn fetch_facts(
        &self,
        now: Instant,
        inferencer: &mut PauseInferencer,
    ) -> Result<GameFacts, RpcError> {
        let client = &self.client;
        if !client.has_game().await? {
            inferencer.reset();
            return Ok(GameFacts::default());
        }

        let scenario_time = client.scenario_time().await?;
        let player_ship_count = client.player_ship_count().await?;
        let inferred = inferencer.observe(scenario_time, now);
        let (paused, pause_source) = match client.paused().await? {
            Some(reported) => (reported, PauseSource::Reported),
            None => (inferred, PauseSource::Inferred),
        };

        Ok(GameFacts {
            has_game: true,
            scenario_time,
            player_ship_count,
            paused,
            pause_source,
            victory_faction: client.victory_faction().await?,
            active_scenario: client.active_scenario().await?,
            total_objects: client.total_objects().await?,
            enemy_ship_count: client.enemy_ship_count().await?,
            friendly_station_count: client.friendly_station_count().await?,
            primary_ship: client.primary_ship().await?,
        })
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("instance", &self.instance)
            .field("endpoint", &self.client.endpoint())
            .field("hub", &self.hub)
            .finish_non_exhaustive()
    }
}
