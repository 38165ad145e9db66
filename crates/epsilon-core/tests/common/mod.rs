//! In-process stand-in for a game server's `exec.lua` endpoint.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use epsilon_core::coordinator::TelemetrySource;
use epsilon_rpc::{ClientConfig, EpsilonClient, scripts};
use epsilon_telemetry::TelemetryError;
use epsilon_types::{Channel, TelemetrySnapshot};

/// What the fake server reports.
#[derive(Debug, Clone)]
pub struct Game {
    /// Reply to the has-game query.
    pub has_game: bool,
    /// Scenario clock; `None` replies with an empty string.
    pub scenario_time: Option<f64>,
    /// Reply to the pause query: `"true"`, `"false"` or `"unknown"`.
    pub paused: &'static str,
    /// Reply to the victory query.
    pub victory: &'static str,
    /// Answer every request with this status instead.
    pub fail_with: Option<StatusCode>,
}

impl Default for Game {
    fn default() -> Self {
        Self {
            has_game: true,
            scenario_time: Some(100.0),
            paused: "false",
            victory: "",
            fail_with: None,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    game: Game,
    received: Vec<String>,
}

/// Handle on a running fake server.
#[derive(Debug, Clone)]
pub struct MockGame {
    inner: Arc<Mutex<Inner>>,
    /// Port the server listens on.
    pub port: u16,
}

impl MockGame {
    /// Start serving on an ephemeral port.
    pub async fn start(game: Game) -> Self {
        let inner = Arc::new(Mutex::new(Inner {
            game,
            received: Vec::new(),
        }));
        let app = Router::new()
            .route("/exec.lua", post(exec))
            .with_state(Arc::clone(&inner));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { inner, port }
    }

    /// Change what the server reports.
    pub fn update(&self, change: impl FnOnce(&mut Game)) {
        change(&mut self.inner.lock().unwrap().game);
    }

    /// Every script received so far.
    pub fn received(&self) -> Vec<String> {
        self.inner.lock().unwrap().received.clone()
    }

    /// A client pointed at this server.
    pub fn client(&self) -> EpsilonClient {
        EpsilonClient::new(&self.client_config()).unwrap()
    }

    /// Client settings for this server.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            host: "127.0.0.1".to_owned(),
            port: self.port,
            timeout: Duration::from_secs(5),
        }
    }
}

async fn exec(State(inner): State<Arc<Mutex<Inner>>>, body: String) -> (StatusCode, String) {
    let mut inner = inner.lock().unwrap();
    inner.received.push(body.clone());
    let game = &inner.game;
    if let Some(status) = game.fail_with {
        return (status, "internal error".to_owned());
    }

    let reply = match body.as_str() {
        s if s == scripts::HAS_GAME => game.has_game.to_string(),
        s if s == scripts::SCENARIO_TIME => {
            game.scenario_time.map(|t| t.to_string()).unwrap_or_default()
        }
        s if s == scripts::PLAYER_SHIP_COUNT => "1".to_owned(),
        s if s == scripts::PAUSED => game.paused.to_owned(),
        s if s == scripts::VICTORY_FACTION => game.victory.to_owned(),
        s if s == scripts::ACTIVE_SCENARIO => "Basic".to_owned(),
        s if s == scripts::TOTAL_OBJECTS => "40".to_owned(),
        s if s == scripts::ENEMY_SHIP_COUNT => "3".to_owned(),
        s if s == scripts::FRIENDLY_STATION_COUNT => "2".to_owned(),
        s if s == scripts::PRIMARY_SHIP => "Epsilon|Atlantis|F5|4|2|1|0|10|125".to_owned(),
        s if s == scripts::PING => "ok".to_owned(),
        "return 6 * 7" => "42".to_owned(),
        "error(\"boom\")" => r#"{"ERROR": "boom"}"#.to_owned(),
        _ => String::new(),
    };
    (StatusCode::OK, reply)
}

/// Telemetry source with a fixed hull reading and a failure switch.
#[derive(Debug, Default)]
pub struct FakeTelemetry {
    /// Report a poisoned lock instead of a snapshot.
    pub fail: AtomicBool,
}

impl FakeTelemetry {
    /// Hull reading every snapshot carries.
    pub const HULL: f64 = 0.75;

    /// Start or stop failing.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl TelemetrySource for FakeTelemetry {
    fn telemetry(&self) -> Result<TelemetrySnapshot, TelemetryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TelemetryError::Poisoned);
        }
        let mut snapshot = TelemetrySnapshot::new();
        snapshot.set(Channel::Hull, Self::HULL);
        snapshot.set(Channel::HasShip, 1.0);
        Ok(snapshot)
    }
}
