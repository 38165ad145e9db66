//! `WebSocket` stream of publications.
//!
//! Clients connect to `GET /ws/instances/{id}` and receive the current
//! publication immediately, then one JSON text frame per publication.
//! The coordinator's `watch` channel only keeps the latest value, so a
//! slow client skips straight to the newest state.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::Response;
use epsilon_types::{InstanceId, Publication};
use futures::stream::SplitSink;
use futures::{SinkExt as _, StreamExt as _};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::state::AppState;

/// Upgrade to a `WebSocket` streaming the instance's publications.
///
/// Unknown instances are rejected before the upgrade.
pub async fn ws_instance(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, GatewayError> {
    let handle = state.instance(&id)?;
    let rx = handle.coordinator().watch();
    let instance = handle.id().clone();
    Ok(ws.on_upgrade(move |socket| stream(socket, instance, rx)))
}

/// Forward publications until the client leaves or the coordinator goes
/// away. Incoming frames are only read to notice the close.
async fn stream(socket: WebSocket, instance: InstanceId, rx: watch::Receiver<Publication>) {
    debug!(%instance, "WebSocket client connected");
    let (sink, mut incoming) = socket.split();

    let mut forward = tokio::spawn(forward(sink, rx));
    loop {
        tokio::select! {
            _ = &mut forward => break,
            frame = incoming.next() => match frame {
                Some(Ok(Message::Close(_)) | Err(_)) | None => {
                    forward.abort();
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }
    debug!(%instance, "WebSocket client disconnected");
}

async fn forward(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: watch::Receiver<Publication>,
) {
    loop {
        let publication = rx.borrow_and_update().clone();
        match serde_json::to_string(&publication) {
            Ok(json) => {
                if sink.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize publication"),
        }
        if rx.changed().await.is_err() {
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    }
}
