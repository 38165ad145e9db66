//! Generators for the game's configuration files.
//!
//! `hardware.ini` is what makes the game emit telemetry: it declares an
//! sACN output device and, for every row of the channel table, a channel
//! plus an always-on state that drives it from a game variable.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use epsilon_telemetry::CHANNEL_SPEC;

/// Settings for the sACN output device in `hardware.ini`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareIni {
    /// Universe the game transmits on.
    pub universe: u16,
    /// Number of DMX slots the device sends.
    pub channels: u16,
    /// Milliseconds between retransmissions.
    pub resend_delay_ms: u32,
}

impl Default for HardwareIni {
    fn default() -> Self {
        Self {
            universe: 2,
            channels: 50,
            resend_delay_ms: 50,
        }
    }
}

impl HardwareIni {
    /// Render the file.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "[hardware]");
        let _ = writeln!(out, "device = sACNDevice");
        let _ = writeln!(out, "universe = {}", self.universe);
        let _ = writeln!(out, "channels = {}", self.channels);
        let _ = writeln!(out, "resend_delay = {}", self.resend_delay_ms);

        for spec in &CHANNEL_SPEC {
            let _ = writeln!(out);
            let _ = writeln!(out, "[channel]");
            let _ = writeln!(out, "name = {}", spec.channel.name());
            let _ = writeln!(out, "channel = {}", spec.dmx_channel);
        }

        for spec in &CHANNEL_SPEC {
            let _ = writeln!(out);
            let _ = writeln!(out, "[state]");
            let _ = writeln!(out, "condition = Always");
            let _ = writeln!(out, "target = {}", spec.channel.name());
            let _ = writeln!(out, "effect = variable");
            let _ = writeln!(out, "input = {}", spec.variable);
            let _ = writeln!(out, "min_input = {}", spec.input_min);
            let _ = writeln!(out, "max_input = {}", spec.input_max);
            let _ = writeln!(out, "min_output = {}", spec.output_min);
            let _ = writeln!(out, "max_output = {}", spec.output_max);
        }
        out
    }
}

/// `key=value` server options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionsIni {
    entries: BTreeMap<String, String>,
}

impl OptionsIni {
    /// Options for a headless server with the HTTP API enabled.
    pub fn for_server(http_port: u16, scenario: &str) -> Self {
        let mut options = Self::default();
        options.set("httpserver", http_port.to_string());
        options.set("headless", scenario);
        options
    }

    /// Set or replace one option.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Current value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Render the file, one option per line in key order.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .fold(String::new(), |mut out, (key, value)| {
                let _ = writeln!(out, "{key}={value}");
                out
            })
    }
}
