//! HTTP transport for `exec.lua`.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::error::RpcError;

/// Path of the script endpoint.
pub const EXEC_PATH: &str = "/exec.lua";

/// Connection settings for one game server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server host name or address.
    pub host: String,
    /// Port of the game's HTTP server.
    pub port: u16,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Client for one game server's `exec.lua` endpoint.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct EpsilonClient {
    http: reqwest::Client,
    url: String,
}

impl EpsilonClient {
    /// Build a client for the server in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Transport`] if the TLS backend cannot be
    /// initialised.
    pub fn new(config: &ClientConfig) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RpcError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: format!("http://{}:{}{EXEC_PATH}", config.host, config.port),
        })
    }

    /// Full URL of the script endpoint.
    pub fn endpoint(&self) -> &str {
        &self.url
    }

    /// Run `snippet` on the server and return its textual result.
    ///
    /// # Errors
    ///
    /// - [`RpcError::Transport`] on connection failure or timeout
    /// - [`RpcError::Status`] on any status other than 200
    /// - [`RpcError::Script`] when the body is `{"ERROR": ...}`
    pub async fn execute(&self, snippet: &str) -> Result<String, RpcError> {
        let response = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(snippet.to_owned())
            .send()
            .await
            .map_err(|e| RpcError::Transport(format!("exec.lua request failed: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            debug!(status = status.as_u16(), "exec.lua returned non-200");
            return Err(RpcError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| RpcError::Transport(format!("exec.lua body read failed: {e}")))?;

        if let Some(message) = script_error(&body) {
            return Err(RpcError::Script(message));
        }
        Ok(body)
    }
}

/// Extract the message from a `{"ERROR": ...}` body.
///
/// Bodies that merely look like JSON but do not parse are treated as
/// ordinary script output.
fn script_error(body: &str) -> Option<String> {
    let trimmed = body.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
    let error = value.as_object()?.get("ERROR")?;
    Some(
        error
            .as_str()
            .map_or_else(|| error.to_string(), ToOwned::to_owned),
    )
}
