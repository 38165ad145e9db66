//! Gateway endpoints exercised through the router with `tower::ServiceExt`,
//! backed by an in-process game server.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use epsilon_core::config::SshConfig;
use epsilon_core::{BridgeRegistry, InstanceConfig, InstanceHandle};
use epsilon_gateway::{AppState, build_router};
use epsilon_rpc::scripts;
use serde_json::{Value, json};
use tower::ServiceExt;

type Received = Arc<Mutex<Vec<String>>>;

async fn game_server() -> (u16, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&received);
    let app = Router::new().route(
        "/exec.lua",
        post(move |body: String| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(body.clone());
                match body.as_str() {
                    s if s == scripts::HAS_GAME => "true",
                    s if s == scripts::SCENARIO_TIME => "42.5",
                    s if s == scripts::PLAYER_SHIP_COUNT => "1",
                    s if s == scripts::PAUSED => "false",
                    s if s == scripts::PING => "ok",
                    _ => "",
                }
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (port, received)
}

fn config(id: &str, port: u16) -> InstanceConfig {
    let mut config = InstanceConfig::new(id);
    config.server.host = "127.0.0.1".to_owned();
    config.server.http_port = port;
    config
}

fn state_with(configs: Vec<InstanceConfig>) -> Arc<AppState> {
    let mut registry = BridgeRegistry::new();
    for config in configs {
        registry.insert(Arc::new(InstanceHandle::new(config).unwrap()));
    }
    Arc::new(AppState::new(Arc::new(registry)))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(state: &Arc<AppState>, path: &str) -> (StatusCode, Value) {
    let response = build_router(Arc::clone(state))
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn post_json(state: &Arc<AppState>, path: &str, body: &str) -> (StatusCode, Value) {
    let response = build_router(Arc::clone(state))
        .oneshot(
            Request::post(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_owned()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

#[tokio::test]
async fn lists_instances_before_first_cycle() {
    let (port, _) = game_server().await;
    let state = state_with(vec![config("bridge", port)]);

    let (status, json) = get(&state, "/api/instances").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["instances"][0]["id"], "bridge");
    assert_eq!(json["instances"][0]["status"], "setup");
    assert_eq!(json["instances"][0]["cycle"], 0);
    let commands = json["instances"][0]["commands"].as_array().unwrap();
    assert!(commands.contains(&json!("pause")));
    assert!(!commands.contains(&json!("exec_script")));
}

#[tokio::test]
async fn unknown_instance_is_404_json() {
    let (port, _) = game_server().await;
    let state = state_with(vec![config("bridge", port)]);

    let (status, json) = get(&state, "/api/instances/nope/snapshot").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
    assert!(json["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn snapshot_and_entities_follow_the_coordinator() {
    let (port, _) = game_server().await;
    let state = state_with(vec![config("bridge", port)]);
    let handle = Arc::clone(state.registry.iter().next().unwrap());
    handle.coordinator().refresh().await;

    let (status, json) = get(&state, "/api/instances/bridge/snapshot").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["last_update_success"], true);
    assert_eq!(json["snapshot"]["cycle"], 1);
    assert_eq!(json["snapshot"]["status"], "playing");
    assert_eq!(json["snapshot"]["server_reachable"], true);

    let (status, json) = get(&state, "/api/instances/bridge/entities").await;
    assert_eq!(status, StatusCode::OK);
    let entities = json["entities"].as_array().unwrap();
    let game_status = entities.iter().find(|e| e["key"] == "game_status").unwrap();
    assert_eq!(game_status["value"], "playing");
    assert_eq!(game_status["available"], true);
    let pause = entities.iter().find(|e| e["key"] == "pause").unwrap();
    assert_eq!(pause["kind"], "switch");
    assert_eq!(pause["commands"]["turn_on"], "pause");
}

#[tokio::test]
async fn refresh_is_accepted() {
    let (port, _) = game_server().await;
    let state = state_with(vec![config("bridge", port)]);

    let (status, json) = post_json(&state, "/api/instances/bridge/refresh", "").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["ok"], true);
}

#[tokio::test]
async fn instance_command_reaches_the_server() {
    let (port, received) = game_server().await;
    let state = state_with(vec![config("bridge", port)]);

    let (status, json) = post_json(&state, "/api/instances/bridge/commands/pause", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["instance"], "bridge");
    assert_eq!(json["command"], "pause");
    assert!(received.lock().unwrap().iter().any(|s| s == scripts::PAUSE));
}

#[tokio::test]
async fn command_target_comes_from_the_body() {
    let (port, received) = game_server().await;
    let state = state_with(vec![config("a", port), config("b", port)]);

    let (status, _) = post_json(&state, "/api/commands/global_message", r#"{"message": "hi"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = post_json(
        &state,
        "/api/commands/global_message",
        r#"{"instance_id": "b", "message": "hi"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["instance"], "b");
    assert!(
        received
            .lock()
            .unwrap()
            .contains(&scripts::global_message("hi"))
    );
}

#[tokio::test]
async fn command_errors_map_to_statuses() {
    let (port, _) = game_server().await;
    let state = state_with(vec![config("bridge", port)]);

    let (status, _) = post_json(&state, "/api/instances/bridge/commands/warp_core_breach", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = post_json(
        &state,
        "/api/instances/bridge/commands/global_message",
        r#"{"message": ""}"#,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["status"], 422);

    let (status, _) = post_json(
        &state,
        "/api/instances/bridge/commands/exec_script",
        r#"{"code": "return 1"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = post_json(&state, "/api/instances/bridge/commands/stop_server", "").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post_json(&state, "/api/instances/bridge/commands/pause", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn diagnostics_redact_secrets_and_ping() {
    let (port, _) = game_server().await;
    let mut instance = config("bridge", port);
    instance.ssh = Some(SshConfig {
        host: None,
        port: 22,
        username: "ee".to_owned(),
        password: Some("hunter2".to_owned()),
        key_path: None,
        known_hosts: None,
        skip_host_key_check: true,
        install_path: "/opt/EmptyEpsilon".to_owned(),
        start_on_launch: false,
        startup_delay_seconds: 8,
        scenario: "scenario_00_basic.lua".to_owned(),
    });
    let state = state_with(vec![instance]);

    let (status, json) = get(&state, "/api/instances/bridge/diagnostics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["config"]["ssh"]["password"], "**REDACTED**");
    assert_eq!(json["config"]["ssh"]["username"], "ee");
    assert_eq!(json["ping"]["ok"], true);
    assert_eq!(json["publication"]["snapshot"]["cycle"], 0);
}
