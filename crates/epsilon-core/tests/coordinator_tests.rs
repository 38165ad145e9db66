//! Fusion cycles against a fake game server.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use common::{FakeTelemetry, Game, MockGame};
use epsilon_core::{Coordinator, CoordinatorSettings};
use epsilon_types::{Channel, GameStatus, InstanceId, PauseSource, Publication};

async fn coordinator(game: Game) -> (Arc<Coordinator>, MockGame, Arc<FakeTelemetry>) {
    let server = MockGame::start(game).await;
    let telemetry = Arc::new(FakeTelemetry::default());
    let coordinator = Arc::new(Coordinator::new(
        InstanceId::new("test"),
        server.client(),
        Arc::clone(&telemetry) as Arc<dyn epsilon_core::coordinator::TelemetrySource>,
        CoordinatorSettings::default(),
    ));
    (coordinator, server, telemetry)
}

fn after(t0: Instant, secs: f64) -> Instant {
    t0 + Duration::from_secs_f64(secs)
}

#[tokio::test]
async fn running_game_is_playing() {
    let (coordinator, _server, _) = coordinator(Game::default()).await;

    let publication = coordinator.refresh().await;
    assert!(publication.last_update_success);
    let snapshot = publication.snapshot;
    assert_eq!(snapshot.cycle, 1);
    assert_eq!(snapshot.status, GameStatus::Playing);
    assert!(snapshot.server_reachable);
    assert!(snapshot.facts.has_game);
    assert_eq!(snapshot.facts.player_ship_count, 1);
    assert_eq!(snapshot.facts.total_objects, 40);
    assert_eq!(snapshot.facts.enemy_ship_count, 3);
    assert_eq!(snapshot.facts.friendly_station_count, 2);
    assert_eq!(snapshot.facts.active_scenario.as_deref(), Some("Basic"));
    assert_eq!(snapshot.facts.primary_ship.callsign.as_deref(), Some("Epsilon"));
    assert!((snapshot.telemetry.get(Channel::Hull) - FakeTelemetry::HULL).abs() < f64::EPSILON);
    assert!(Arc::ptr_eq(&coordinator.snapshot(), &snapshot));
}

#[tokio::test]
async fn reported_pause_wins() {
    let (coordinator, _server, _) = coordinator(Game {
        paused: "true",
        ..Game::default()
    })
    .await;

    let snapshot = coordinator.refresh().await.snapshot;
    assert_eq!(snapshot.status, GameStatus::Paused);
    assert!(snapshot.facts.paused);
    assert_eq!(snapshot.facts.pause_source, PauseSource::Reported);
}

#[tokio::test]
async fn stalled_clock_is_inferred_as_paused_then_resumes_after_two_samples() {
    let (coordinator, server, _) = coordinator(Game {
        paused: "unknown",
        ..Game::default()
    })
    .await;
    let t0 = Instant::now();

    let first = coordinator.refresh_at(t0).await.snapshot;
    assert_eq!(first.status, GameStatus::Playing);
    assert_eq!(first.facts.pause_source, PauseSource::Inferred);

    let stalled = coordinator.refresh_at(after(t0, 1.2)).await.snapshot;
    assert_eq!(stalled.status, GameStatus::Paused);

    server.update(|g| g.scenario_time = Some(101.2));
    let once = coordinator.refresh_at(after(t0, 2.4)).await.snapshot;
    assert_eq!(once.status, GameStatus::Paused);

    server.update(|g| g.scenario_time = Some(102.4));
    let twice = coordinator.refresh_at(after(t0, 3.6)).await.snapshot;
    assert_eq!(twice.status, GameStatus::Playing);
}

#[tokio::test]
async fn samples_closer_than_a_second_do_not_count() {
    let (coordinator, _server, _) = coordinator(Game {
        paused: "unknown",
        ..Game::default()
    })
    .await;
    let t0 = Instant::now();

    coordinator.refresh_at(t0).await;
    let close = coordinator.refresh_at(after(t0, 0.3)).await.snapshot;
    assert_eq!(close.status, GameStatus::Playing);
}

#[tokio::test]
async fn http_error_keeps_telemetry_and_marks_unreachable() {
    let (coordinator, _server, _) = coordinator(Game {
        fail_with: Some(StatusCode::INTERNAL_SERVER_ERROR),
        ..Game::default()
    })
    .await;

    let publication = coordinator.refresh().await;
    assert!(publication.last_update_success);
    let snapshot = publication.snapshot;
    assert_eq!(snapshot.status, GameStatus::Setup);
    assert!(!snapshot.server_reachable);
    assert!(!snapshot.facts.has_game);
    assert!((snapshot.telemetry.get(Channel::Hull) - FakeTelemetry::HULL).abs() < f64::EPSILON);
}

#[tokio::test]
async fn server_recovers_after_outage() {
    let (coordinator, server, _) = coordinator(Game {
        fail_with: Some(StatusCode::BAD_GATEWAY),
        ..Game::default()
    })
    .await;

    assert!(!coordinator.refresh().await.snapshot.server_reachable);
    server.update(|g| g.fail_with = None);
    let snapshot = coordinator.refresh().await.snapshot;
    assert!(snapshot.server_reachable);
    assert_eq!(snapshot.status, GameStatus::Playing);
    assert_eq!(snapshot.cycle, 2);
}

#[tokio::test]
async fn no_game_is_setup() {
    let (coordinator, _server, _) = coordinator(Game {
        has_game: false,
        ..Game::default()
    })
    .await;

    let snapshot = coordinator.refresh().await.snapshot;
    assert_eq!(snapshot.status, GameStatus::Setup);
    assert!(snapshot.server_reachable);
    assert_eq!(snapshot.facts.player_ship_count, 0);
}

#[tokio::test]
async fn victory_faction_decides_game_over() {
    let (coordinator, server, _) = coordinator(Game {
        victory: "Human Navy",
        ..Game::default()
    })
    .await;
    assert_eq!(
        coordinator.refresh().await.snapshot.status,
        GameStatus::GameOverVictory
    );

    server.update(|g| g.victory = "Kraylor");
    assert_eq!(
        coordinator.refresh().await.snapshot.status,
        GameStatus::GameOverDefeat
    );
}

#[tokio::test]
async fn hard_failure_keeps_previous_snapshot_and_notifies() {
    let (coordinator, _server, telemetry) = coordinator(Game::default()).await;
    let good = coordinator.refresh().await.snapshot;

    let failures = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&failures);
    coordinator.subscribe(Arc::new(move |publication: &Publication| {
        if !publication.last_update_success {
            seen.fetch_add(1, Ordering::SeqCst);
        }
    }));

    telemetry.set_failing(true);
    let publication = coordinator.refresh().await;
    assert!(!publication.last_update_success);
    assert!(publication.last_error.unwrap().contains("poisoned"));
    assert!(Arc::ptr_eq(&publication.snapshot, &good));
    assert_eq!(failures.load(Ordering::SeqCst), 1);

    telemetry.set_failing(false);
    let recovered = coordinator.refresh().await;
    assert!(recovered.last_update_success);
    assert_eq!(recovered.snapshot.cycle, 2);
}

#[tokio::test]
async fn unsubscribed_callbacks_stop_firing() {
    let (coordinator, _server, _) = coordinator(Game::default()).await;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let id = coordinator.subscribe(Arc::new(move |_: &Publication| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    coordinator.refresh().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(coordinator.unsubscribe(id));
    assert!(!coordinator.unsubscribe(id));
    coordinator.refresh().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn loop_polls_on_start_and_on_request() {
    let (coordinator, _server, _) = coordinator(Game::default()).await;
    let mut updates = coordinator.watch();
    let task = coordinator.spawn();

    tokio::time::timeout(Duration::from_secs(5), updates.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updates.borrow_and_update().snapshot.cycle, 1);

    coordinator.request_refresh();
    tokio::time::timeout(Duration::from_secs(5), updates.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updates.borrow_and_update().snapshot.cycle, 2);

    coordinator.stop();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn telemetry_refreshes_are_throttled() {
    let (coordinator, _server, _) = coordinator(Game::default()).await;
    let t0 = Instant::now();
    assert!(coordinator.on_telemetry(t0));
    assert!(!coordinator.on_telemetry(after(t0, 1.0)));
    assert!(coordinator.on_telemetry(after(t0, 2.5)));
}
