//! The published unit.
//!
//! A [`Snapshot`] is built once per fusion cycle and shared behind an
//! [`Arc`]; nobody mutates it after publication. A [`Publication`] pairs
//! the latest good snapshot with the outcome of the most recent cycle so a
//! subscriber can tell "stale but valid" apart from "unavailable".

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::facts::GameFacts;
use crate::status::GameStatus;
use crate::telemetry::TelemetrySnapshot;

/// One consistent view of the game, produced by a fusion cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Fusion cycle number that produced this snapshot (0 = never polled).
    pub cycle: u64,
    /// Latest decoded telemetry.
    pub telemetry: TelemetrySnapshot,
    /// Facts from the scripting endpoint.
    pub facts: GameFacts,
    /// Derived game status.
    pub status: GameStatus,
    /// Whether the scripting endpoint answered this cycle.
    pub server_reachable: bool,
    /// Wall-clock time of publication.
    pub published_at: DateTime<Utc>,
}

impl Snapshot {
    /// The snapshot visible before the first fusion cycle completes.
    pub fn initial() -> Self {
        Self {
            cycle: 0,
            telemetry: TelemetrySnapshot::new(),
            facts: GameFacts::default(),
            status: GameStatus::Setup,
            server_reachable: false,
            published_at: Utc::now(),
        }
    }
}

/// What subscribers receive on every publication.
#[derive(Debug, Clone, Serialize)]
pub struct Publication {
    /// Latest good snapshot. Kept unchanged when a cycle hard-fails.
    pub snapshot: Arc<Snapshot>,
    /// Whether the most recent cycle completed.
    pub last_update_success: bool,
    /// Error text of the most recent hard failure, if any.
    pub last_error: Option<String>,
}

impl Publication {
    /// Publication for a successful cycle.
    pub const fn success(snapshot: Arc<Snapshot>) -> Self {
        Self {
            snapshot,
            last_update_success: true,
            last_error: None,
        }
    }

    /// Publication for a failed cycle; keeps the previous snapshot.
    pub const fn failure(snapshot: Arc<Snapshot>, error: String) -> Self {
        Self {
            snapshot,
            last_update_success: false,
            last_error: Some(error),
        }
    }
}
