//! Error types for the gateway.
//!
//! [`GatewayError`] converts into a JSON response of the form
//! `{"error": "...", "status": 404}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use epsilon_core::CommandError;
use epsilon_rpc::RpcError;

/// Errors that can occur in the gateway layer.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No instance with this id is configured.
    #[error("unknown instance: {0}")]
    NotFound(String),

    /// The request body is not valid JSON.
    #[error("invalid request body: {0}")]
    BadRequest(String),

    /// A command failed.
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl GatewayError {
    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Command(e) => command_status(e),
        }
    }
}

const fn command_status(error: &CommandError) -> StatusCode {
    match error {
        CommandError::UnknownCommand(_)
        | CommandError::UnknownInstance(_)
        | CommandError::NoInstances => StatusCode::NOT_FOUND,
        CommandError::InvalidParams(_) | CommandError::AmbiguousTarget => StatusCode::BAD_REQUEST,
        CommandError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CommandError::Disabled(_) => StatusCode::FORBIDDEN,
        CommandError::NoSsh(_) => StatusCode::CONFLICT,
        CommandError::Rpc(RpcError::Script(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        CommandError::Rpc(RpcError::Transport(_) | RpcError::Status { .. }) => {
            StatusCode::BAD_GATEWAY
        }
        CommandError::Remote(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
