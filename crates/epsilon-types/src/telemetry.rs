//! Telemetry channel names and the decoded telemetry map.
//!
//! The game streams a fixed block of lighting-control channels. Each one is
//! a single physical quantity decoded into a float. The map always holds
//! every known channel: values that have not been received yet read as
//! `0.0`, and channels missing from a packet keep their previous value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Threshold above which an on/off channel is considered "on".
pub const ON_THRESHOLD: f64 = 0.5;

/// One named quantity carried in the telemetry feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    /// Hull integrity of the primary ship.
    Hull,
    /// Front shield strength.
    FrontShield,
    /// Rear shield strength.
    RearShield,
    /// Reactor energy.
    Energy,
    /// Red alert active.
    RedAlert,
    /// Yellow alert active.
    YellowAlert,
    /// Shields raised.
    ShieldsUp,
    /// Docked at a station.
    Docked,
    /// Docking in progress.
    Docking,
    /// A player ship exists.
    HasShip,
    /// Impulse throttle.
    Impulse,
    /// Warp factor.
    Warp,
}

impl Channel {
    /// Every known channel, in feed order.
    pub const ALL: [Self; 12] = [
        Self::Hull,
        Self::FrontShield,
        Self::RearShield,
        Self::Energy,
        Self::RedAlert,
        Self::YellowAlert,
        Self::ShieldsUp,
        Self::Docked,
        Self::Docking,
        Self::HasShip,
        Self::Impulse,
        Self::Warp,
    ];

    /// The channel's wire and entity key (camel case).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hull => "hull",
            Self::FrontShield => "frontShield",
            Self::RearShield => "rearShield",
            Self::Energy => "energy",
            Self::RedAlert => "redAlert",
            Self::YellowAlert => "yellowAlert",
            Self::ShieldsUp => "shieldsUp",
            Self::Docked => "docked",
            Self::Docking => "docking",
            Self::HasShip => "hasShip",
            Self::Impulse => "impulse",
            Self::Warp => "warp",
        }
    }
}

impl core::fmt::Display for Channel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Latest decoded value of every telemetry channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetrySnapshot(BTreeMap<Channel, f64>);

impl TelemetrySnapshot {
    /// Create a snapshot with every channel set to `0.0`.
    pub fn new() -> Self {
        Self(Channel::ALL.iter().map(|&channel| (channel, 0.0)).collect())
    }

    /// Read one channel.
    pub fn get(&self, channel: Channel) -> f64 {
        self.0.get(&channel).copied().unwrap_or(0.0)
    }

    /// Overwrite one channel.
    pub fn set(&mut self, channel: Channel, value: f64) {
        self.0.insert(channel, value);
    }

    /// Whether an on/off channel currently reads as "on".
    pub fn is_on(&self, channel: Channel) -> bool {
        self.get(channel) > ON_THRESHOLD
    }

    /// Iterate over `(channel, value)` pairs in feed order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, f64)> + '_ {
        self.0.iter().map(|(&channel, &value)| (channel, value))
    }
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self::new()
    }
}
