//! REST endpoint handlers.
//!
//! Reads are served from each coordinator's latest publication and never
//! touch the game server, except the diagnostics ping.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use epsilon_core::entities::{self, EntityState};
use epsilon_core::commands;
use epsilon_core::{CommandName, CommandOutcome, InstanceConfig, InstanceHandle, dispatch};
use epsilon_types::{GameStatus, InstanceId, Publication};
use serde::Serialize;
use serde_json::Value;

use crate::error::GatewayError;
use crate::state::AppState;

const REDACTED: &str = "**REDACTED**";

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// One entry of `GET /api/instances`.
#[derive(Debug, Serialize)]
pub struct InstanceSummary {
    /// Instance id.
    pub id: InstanceId,
    /// Display name.
    pub name: String,
    /// RPC endpoint.
    pub endpoint: String,
    /// Derived game status.
    pub status: GameStatus,
    /// Whether the last cycle reached the game server.
    pub server_reachable: bool,
    /// Whether the last cycle completed.
    pub last_update_success: bool,
    /// Cycle that produced the current snapshot.
    pub cycle: u64,
    /// Commands this instance accepts.
    pub commands: Vec<CommandName>,
}

impl InstanceSummary {
    fn of(handle: &InstanceHandle) -> Self {
        let publication = handle.coordinator().publication();
        Self {
            id: handle.id().clone(),
            name: handle.config().name.clone(),
            endpoint: handle.coordinator().client().endpoint().to_owned(),
            status: publication.snapshot.status,
            server_reachable: publication.snapshot.server_reachable,
            last_update_success: publication.last_update_success,
            cycle: publication.snapshot.cycle,
            commands: commands::available(handle),
        }
    }
}

/// Body of `GET /api/instances/{id}/entities`.
#[derive(Debug, Serialize)]
pub struct EntitiesResponse {
    /// Instance id.
    pub instance: InstanceId,
    /// One state per catalog entry.
    pub entities: Vec<EntityState>,
}

/// Result of the diagnostics ping.
#[derive(Debug, Serialize)]
pub struct PingResult {
    /// The server answered.
    pub ok: bool,
    /// Why it did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `GET /api/instances/{id}/diagnostics`.
#[derive(Debug, Serialize)]
pub struct Diagnostics {
    /// Configuration with secrets replaced.
    pub config: InstanceConfig,
    /// Live ping of the game server.
    pub ping: PingResult,
    /// Latest publication.
    pub publication: Publication,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// `GET /api/instances`
pub async fn list_instances(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let instances: Vec<InstanceSummary> = state
        .registry
        .iter()
        .map(|handle| InstanceSummary::of(handle))
        .collect();
    Json(serde_json::json!({
        "count": instances.len(),
        "instances": instances,
    }))
}

/// `GET /api/instances/{id}/snapshot`
pub async fn get_snapshot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Publication>, GatewayError> {
    let handle = state.instance(&id)?;
    Ok(Json(handle.coordinator().publication()))
}

/// `GET /api/instances/{id}/entities`
pub async fn get_entities(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EntitiesResponse>, GatewayError> {
    let handle = state.instance(&id)?;
    let publication = handle.coordinator().publication();
    Ok(Json(EntitiesResponse {
        instance: handle.id().clone(),
        entities: entities::project_all(&publication),
    }))
}

/// `GET /api/instances/{id}/diagnostics`
pub async fn get_diagnostics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Diagnostics>, GatewayError> {
    let handle = state.instance(&id)?;
    let ping = match handle.coordinator().client().ping().await {
        Ok(ok) => PingResult { ok, error: None },
        Err(e) => PingResult {
            ok: false,
            error: Some(e.to_string()),
        },
    };
    Ok(Json(Diagnostics {
        config: redacted(handle.config()),
        ping,
        publication: handle.coordinator().publication(),
    }))
}

fn redacted(config: &InstanceConfig) -> InstanceConfig {
    let mut config = config.clone();
    if let Some(ssh) = config.ssh.as_mut() {
        if ssh.password.is_some() {
            ssh.password = Some(REDACTED.to_owned());
        }
        if ssh.key_path.is_some() {
            ssh.key_path = Some(REDACTED.into());
        }
    }
    config
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// `POST /api/instances/{id}/refresh`
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let handle = state.instance(&id)?;
    handle.coordinator().request_refresh();
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "ok": true, "instance": handle.id() })),
    ))
}

/// `POST /api/instances/{id}/commands/{name}`
///
/// The body holds the command's parameters; an empty body means none.
pub async fn run_instance_command(
    State(state): State<Arc<AppState>>,
    Path((id, name)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<CommandOutcome>, GatewayError> {
    let params = parse_body(&body)?;
    let target = InstanceId::new(id);
    let outcome = dispatch(&state.registry, Some(&target), &name, params).await?;
    Ok(Json(outcome))
}

/// `POST /api/commands/{name}`
///
/// An `instance_id` field in the body picks the target; without one the
/// only configured instance is used.
pub async fn run_command(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<CommandOutcome>, GatewayError> {
    let mut params = parse_body(&body)?;
    let target = match params.as_object_mut().and_then(|o| o.remove("instance_id")) {
        Some(Value::String(id)) => Some(InstanceId::new(id)),
        Some(Value::Null) | None => None,
        Some(other) => {
            return Err(GatewayError::BadRequest(format!(
                "instance_id must be a string, got {other}"
            )));
        }
    };
    let outcome = dispatch(&state.registry, target.as_ref(), &name, params).await?;
    Ok(Json(outcome))
}

fn parse_body(body: &[u8]) -> Result<Value, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| GatewayError::BadRequest(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use epsilon_core::config::SshConfig;

    use super::*;

    #[test]
    fn empty_body_is_null() {
        assert_eq!(parse_body(b"").unwrap(), Value::Null);
        assert_eq!(parse_body(b"  \n").unwrap(), Value::Null);
        assert_eq!(parse_body(br#"{"x": 1}"#).unwrap()["x"], 1);
        assert!(matches!(parse_body(b"{"), Err(GatewayError::BadRequest(_))));
    }

    #[test]
    fn secrets_are_redacted() {
        let mut config = InstanceConfig::new("a");
        config.ssh = Some(SshConfig {
            host: None,
            port: 22,
            username: "ee".to_owned(),
            password: Some("hunter2".to_owned()),
            key_path: Some("/home/ee/.ssh/id_ed25519".into()),
            known_hosts: None,
            skip_host_key_check: true,
            install_path: "/opt/EmptyEpsilon".to_owned(),
            start_on_launch: false,
            startup_delay_seconds: 8,
            scenario: "scenario_00_basic.lua".to_owned(),
        });

        let shown = redacted(&config);
        let ssh = shown.ssh.unwrap();
        assert_eq!(ssh.password.as_deref(), Some(REDACTED));
        assert_eq!(ssh.key_path.unwrap().to_str(), Some(REDACTED));
        assert_eq!(config.ssh.unwrap().password.as_deref(), Some("hunter2"));
    }
}
