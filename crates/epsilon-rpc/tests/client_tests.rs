//! `EpsilonClient` against an in-process `exec.lua` server.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::post;
use epsilon_rpc::{ClientConfig, EpsilonClient, RpcError, scripts};

type Reply = fn(&str) -> (StatusCode, String);

/// Serve `reply` on `/exec.lua` and return a client pointed at it, plus a
/// log of every script the server received.
async fn mock(reply: Reply, timeout: Duration) -> (EpsilonClient, Arc<Mutex<Vec<String>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&received);
    let app = Router::new().route(
        "/exec.lua",
        post(move |body: String| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(body.clone());
                reply(&body)
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = EpsilonClient::new(&ClientConfig {
        host: "127.0.0.1".to_owned(),
        port,
        timeout,
    })
    .unwrap();
    (client, received)
}

async fn mock_ok(reply: Reply) -> EpsilonClient {
    mock(reply, Duration::from_secs(5)).await.0
}

fn running_game(script: &str) -> (StatusCode, String) {
    let text = match script {
        s if s == scripts::HAS_GAME => "true",
        s if s == scripts::SCENARIO_TIME => "123.5",
        s if s == scripts::PLAYER_SHIP_COUNT => "2",
        s if s == scripts::VICTORY_FACTION => "",
        s if s == scripts::PAUSED => "false",
        s if s == scripts::TOTAL_OBJECTS => "57",
        s if s == scripts::PRIMARY_SHIP => "Epsilon|Atlantis|F5|4|2|1|0|10|125",
        s if s == scripts::PING => "ok",
        _ => "",
    };
    (StatusCode::OK, text.to_owned())
}

#[tokio::test]
async fn typed_queries_parse_replies() {
    let client = mock_ok(running_game).await;

    assert!(client.has_game().await.unwrap());
    let time = client.scenario_time().await.unwrap().unwrap();
    assert!((time - 123.5).abs() < f64::EPSILON);
    assert_eq!(client.player_ship_count().await.unwrap(), 2);
    assert_eq!(client.victory_faction().await.unwrap(), None);
    assert_eq!(client.paused().await.unwrap(), Some(false));
    assert_eq!(client.total_objects().await.unwrap(), 57);
    let ship = client.primary_ship().await.unwrap();
    assert_eq!(ship.callsign.as_deref(), Some("Epsilon"));
    assert_eq!(ship.reputation, Some(125));
    assert!(client.ping().await.unwrap());
}

#[tokio::test]
async fn nonsense_replies_become_defaults() {
    let client = mock_ok(|_| (StatusCode::OK, "nope".to_owned())).await;

    assert!(!client.has_game().await.unwrap());
    assert_eq!(client.scenario_time().await.unwrap(), None);
    assert_eq!(client.player_ship_count().await.unwrap(), 0);
    assert_eq!(client.total_objects().await.unwrap(), 0);
    assert_eq!(client.enemy_ship_count().await.unwrap(), 0);
    assert_eq!(client.paused().await.unwrap(), None);
    assert_eq!(client.primary_ship().await.unwrap().homing, None);
}

#[tokio::test]
async fn script_errors_become_defaults() {
    let client = mock_ok(|_| {
        (
            StatusCode::OK,
            r#"{"ERROR": "attempt to index a nil value"}"#.to_owned(),
        )
    })
    .await;

    assert!(!client.has_game().await.unwrap());
    assert_eq!(client.victory_faction().await.unwrap(), None);
    assert_eq!(client.friendly_station_count().await.unwrap(), 0);
    assert!(client.primary_ship().await.unwrap().is_empty());
}

#[tokio::test]
async fn script_errors_surface_from_commands() {
    let client = mock_ok(|_| (StatusCode::OK, r#"{"ERROR": "bad template"}"#.to_owned())).await;

    let result = client.spawn_station("Nope", "Human Navy", 0.0, 0.0).await;
    assert_eq!(result, Err(RpcError::Script("bad template".to_owned())));
}

#[tokio::test]
async fn server_error_is_transport_class() {
    let client = mock_ok(|_| (StatusCode::INTERNAL_SERVER_ERROR, "boom".to_owned())).await;

    let err = client.has_game().await.unwrap_err();
    assert!(err.is_transport());
    assert!(matches!(err, RpcError::Status { status: 500, .. }));
    assert!(client.scenario_time().await.unwrap_err().is_transport());
}

#[tokio::test]
async fn connection_refused_is_transport() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = EpsilonClient::new(&ClientConfig {
        host: "127.0.0.1".to_owned(),
        port,
        timeout: Duration::from_secs(2),
    })
    .unwrap();
    assert!(matches!(
        client.has_game().await,
        Err(RpcError::Transport(_))
    ));
}

#[tokio::test]
async fn slow_server_times_out() {
    let app = Router::new().route(
        "/exec.lua",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = EpsilonClient::new(&ClientConfig {
        host: "127.0.0.1".to_owned(),
        port,
        timeout: Duration::from_millis(200),
    })
    .unwrap();
    let err = client.execute("return 1").await.unwrap_err();
    assert!(matches!(err, RpcError::Transport(_)));
}

#[tokio::test]
async fn commands_send_escaped_scripts() {
    let (client, received) = mock(|_| (StatusCode::OK, String::new()), Duration::from_secs(5)).await;

    client.global_message("Red \"alert\"\n").await.unwrap();
    client.pause().await.unwrap();
    client.modify_hull("Epsilon", 150.0).await.unwrap();

    let log = received.lock().unwrap().clone();
    assert_eq!(log.first().map(String::as_str), Some("globalMessage(\"Red \\\"alert\\\"\\n\")"));
    assert_eq!(log.get(1).map(String::as_str), Some("pauseGame()"));
    assert!(log.get(2).is_some_and(|s| s.contains("getHullMax() * 100 / 100")));
}
