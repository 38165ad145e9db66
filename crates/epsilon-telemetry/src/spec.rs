//! The static channel table.
//!
//! Each entry maps a 1-based DMX slot to a game variable. The input range
//! tells the game how to scale the variable onto the slot (it is written
//! into `hardware.ini`); the output range tells the decoder how to scale the
//! slot back. The game writes `0.0..=1.0` onto `0..=255`, so every output
//! range here is normalized.

use epsilon_types::Channel;

/// One row of the channel table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelSpec {
    /// DMX slot, 1-based as in the game's hardware config.
    pub dmx_channel: u16,
    /// Game variable feeding this slot.
    pub variable: &'static str,
    /// Named channel the slot decodes into.
    pub channel: Channel,
    /// Lowest value of the game variable.
    pub input_min: f64,
    /// Highest value of the game variable.
    pub input_max: f64,
    /// Decoded value for byte `0`.
    pub output_min: f64,
    /// Decoded value for byte `255`.
    pub output_max: f64,
}

impl ChannelSpec {
    /// Decode a raw DMX byte for this slot.
    pub fn decode(&self, raw: u8) -> f64 {
        decode_value(raw, self.output_min, self.output_max)
    }

    /// Zero-based index of this slot in a DMX payload.
    pub const fn slot_index(&self) -> usize {
        (self.dmx_channel as usize).saturating_sub(1)
    }
}

const fn row(
    dmx_channel: u16,
    variable: &'static str,
    channel: Channel,
    input_min: f64,
    input_max: f64,
) -> ChannelSpec {
    ChannelSpec {
        dmx_channel,
        variable,
        channel,
        input_min,
        input_max,
        output_min: 0.0,
        output_max: 1.0,
    }
}

/// The channel table, in feed order.
pub const CHANNEL_SPEC: [ChannelSpec; 12] = [
    row(1, "Hull", Channel::Hull, 0.0, 100.0),
    row(2, "Shield0", Channel::FrontShield, 0.0, 100.0),
    row(3, "Shield1", Channel::RearShield, 0.0, 100.0),
    row(4, "Energy", Channel::Energy, 0.0, 100.0),
    row(5, "RedAlert", Channel::RedAlert, 0.0, 1.0),
    row(6, "YellowAlert", Channel::YellowAlert, 0.0, 1.0),
    row(7, "ShieldsUp", Channel::ShieldsUp, 0.0, 1.0),
    row(8, "Docked", Channel::Docked, 0.0, 1.0),
    row(9, "Docking", Channel::Docking, 0.0, 1.0),
    row(10, "HasShip", Channel::HasShip, 0.0, 1.0),
    // The game reports impulse as -1..1.
    row(11, "Impulse", Channel::Impulse, -1.0, 1.0),
    row(12, "Warp", Channel::Warp, 0.0, 4.0),
];

/// Linearly map a DMX byte onto `[out_min, out_max]`.
///
/// `decode_value(0, lo, hi) == lo` and `decode_value(255, lo, hi) == hi`
/// hold exactly.
pub fn decode_value(raw: u8, out_min: f64, out_max: f64) -> f64 {
    match raw {
        0 => out_min,
        u8::MAX => out_max,
        _ => out_min + (f64::from(raw) / 255.0) * (out_max - out_min),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn decode_endpoints_are_exact() {
        for (lo, hi) in [(0.0, 1.0), (0.0, 100.0), (-1.0, 1.0), (3.5, -2.25)] {
            assert!(decode_value(0, lo, hi).to_bits() == f64::to_bits(lo));
            assert!(decode_value(255, lo, hi).to_bits() == f64::to_bits(hi));
        }
    }

    #[test]
    fn decode_is_linear_for_every_byte() {
        let (lo, hi) = (0.0, 100.0);
        for raw in 0..=u8::MAX {
            let expected = lo + (f64::from(raw) / 255.0) * (hi - lo);
            assert!(close(decode_value(raw, lo, hi), expected), "byte {raw}");
        }
    }

    #[test]
    fn table_covers_every_channel_once() {
        for channel in Channel::ALL {
            let rows = CHANNEL_SPEC.iter().filter(|s| s.channel == channel).count();
            assert_eq!(rows, 1, "{channel}");
        }
    }

    #[test]
    fn slots_are_consecutive_from_one() {
        for (position, spec) in CHANNEL_SPEC.iter().enumerate() {
            assert_eq!(spec.slot_index(), position);
        }
    }

    #[test]
    fn midpoint_decodes_to_half() {
        let spec = CHANNEL_SPEC.first().copied();
        let hull = spec.map(|s| s.decode(51)).unwrap_or_default();
        assert!(close(hull, 0.2));
    }
}
