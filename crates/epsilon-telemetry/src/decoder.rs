//! Universe filtering and partial telemetry updates.
//!
//! [`TelemetryDecoder`] owns the live [`TelemetrySnapshot`]. Packet intake
//! and snapshot reads both go through one mutex that is never held across
//! an `.await`, so a reader can never observe a half-applied packet.

use std::sync::{Arc, Mutex, PoisonError};

use epsilon_types::TelemetrySnapshot;
use tracing::trace;

use crate::error::TelemetryError;
use crate::packet::parse_data_packet;
use crate::spec::CHANNEL_SPEC;

/// Callback invoked with the full snapshot after every accepted packet.
pub type TelemetryCallback = Arc<dyn Fn(&TelemetrySnapshot) + Send + Sync>;

/// Decodes E1.31 datagrams for one universe into a telemetry snapshot.
pub struct TelemetryDecoder {
    universe: u16,
    state: Mutex<TelemetrySnapshot>,
    callback: Mutex<Option<TelemetryCallback>>,
}

impl TelemetryDecoder {
    /// Create a decoder for `universe` with every channel at `0.0`.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidUniverse`] for universe `0` or any
    /// value above 63999.
    pub fn new(universe: u16) -> Result<Self, TelemetryError> {
        if universe == 0 || universe > 63_999 {
            return Err(TelemetryError::InvalidUniverse(universe));
        }
        Ok(Self {
            universe,
            state: Mutex::new(TelemetrySnapshot::new()),
            callback: Mutex::new(None),
        })
    }

    /// The universe this decoder accepts.
    pub const fn universe(&self) -> u16 {
        self.universe
    }

    /// Register (or clear) the per-packet callback.
    pub fn set_callback(&self, callback: Option<TelemetryCallback>) {
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = callback;
    }

    /// Copy of the latest decoded values.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Poisoned`] if a previous holder of the
    /// lock panicked.
    pub fn snapshot(&self) -> Result<TelemetrySnapshot, TelemetryError> {
        self.state
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_poisoned| TelemetryError::Poisoned)
    }

    /// Feed one raw datagram.
    ///
    /// Returns `true` when the packet was accepted and at least one channel
    /// was updated. Malformed packets and packets for other universes are
    /// dropped without touching the snapshot or firing the callback.
    pub fn ingest(&self, datagram: &[u8]) -> bool {
        let frame = match parse_data_packet(datagram) {
            Ok(frame) => frame,
            Err(rejection) => {
                trace!(%rejection, len = datagram.len(), "dropping datagram");
                return false;
            }
        };

        if frame.universe != self.universe {
            trace!(
                universe = frame.universe,
                expected = self.universe,
                "dropping packet for foreign universe"
            );
            return false;
        }

        let updates: Vec<_> = CHANNEL_SPEC
            .iter()
            .filter_map(|spec| {
                frame
                    .slots
                    .get(spec.slot_index())
                    .map(|&raw| (spec.channel, spec.decode(raw)))
            })
            .collect();
        if updates.is_empty() {
            return false;
        }

        let updated = {
            let Ok(mut state) = self.state.lock() else {
                return false;
            };
            for (channel, value) in updates {
                state.set(channel, value);
            }
            state.clone()
        };

        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback(&updated);
        }
        true
    }
}

impl core::fmt::Debug for TelemetryDecoder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TelemetryDecoder")
            .field("universe", &self.universe)
            .finish_non_exhaustive()
    }
}
