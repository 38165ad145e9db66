//! Lenient parsing of `exec.lua` replies.
//!
//! Every number is parsed as a float first and coerced afterwards, so
//! `"3"`, `"3.0"` and `" 3 "` all mean three. Nothing here fails: an
//! unusable reply becomes `None` or zero.

use epsilon_types::PrimaryShip;

/// Parse a finite float.
pub fn float(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a non-negative count, truncating any fraction.
pub fn count(text: &str) -> Option<u32> {
    let value = float(text)?;
    if value < 0.0 || value > f64::from(u32::MAX) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let truncated = value.trunc() as u32;
    Some(truncated)
}

/// Parse a count, defaulting to zero.
pub fn count_or_zero(text: &str) -> u32 {
    count(text).unwrap_or(0)
}

/// `true` only for a case-insensitive `"true"`.
pub fn boolean(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("true")
}

/// `Some(true)`/`Some(false)` for `"true"`/`"false"`, `None` otherwise.
pub fn tristate(text: &str) -> Option<bool> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Trimmed text, `None` when empty.
pub fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Split a nine-field primary ship reply.
///
/// Missing or malformed fields are null; extra separators end up in the
/// last field and make it unparsable rather than shifting the others.
pub fn primary_ship(text: &str) -> PrimaryShip {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return PrimaryShip::default();
    }
    let mut fields = trimmed.splitn(9, '|');
    let mut next = || fields.next().unwrap_or("");
    PrimaryShip {
        callsign: non_empty(next()),
        ship_type: non_empty(next()),
        sector: non_empty(next()),
        homing: count(next()),
        nuke: count(next()),
        emp: count(next()),
        mine: count(next()),
        hvli: count(next()),
        reputation: count(next()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_go_through_float() {
        assert_eq!(count("3"), Some(3));
        assert_eq!(count(" 3.0\n"), Some(3));
        assert_eq!(count("7.9"), Some(7));
        assert_eq!(count("-1"), None);
        assert_eq!(count("nope"), None);
        assert_eq!(count("inf"), None);
        assert_eq!(count_or_zero("nope"), 0);
    }

    #[test]
    fn float_rejects_garbage_and_nan() {
        assert_eq!(float(""), None);
        assert_eq!(float("NaN"), None);
        assert!(float("12.25").is_some_and(|v| (v - 12.25).abs() < f64::EPSILON));
    }

    #[test]
    fn booleans() {
        assert!(boolean("TRUE\n"));
        assert!(!boolean("yes"));
        assert_eq!(tristate("false"), Some(false));
        assert_eq!(tristate("unknown"), None);
    }

    #[test]
    fn full_primary_ship() {
        let ship = primary_ship("Epsilon|Atlantis|F5|4|2|1|0|10|125.5");
        assert_eq!(ship.callsign.as_deref(), Some("Epsilon"));
        assert_eq!(ship.ship_type.as_deref(), Some("Atlantis"));
        assert_eq!(ship.sector.as_deref(), Some("F5"));
        assert_eq!(ship.homing, Some(4));
        assert_eq!(ship.mine, Some(0));
        assert_eq!(ship.hvli, Some(10));
        assert_eq!(ship.reputation, Some(125));
    }

    #[test]
    fn short_primary_ship_reply_defaults_the_rest() {
        let ship = primary_ship("Epsilon|Atlantis");
        assert_eq!(ship.callsign.as_deref(), Some("Epsilon"));
        assert_eq!(ship.sector, None);
        assert_eq!(ship.homing, None);
        assert_eq!(ship.reputation, None);
    }

    #[test]
    fn extra_separators_do_not_shift_fields() {
        let ship = primary_ship("A|B|C|1|2|3|4|5|6|7");
        assert_eq!(ship.hvli, Some(5));
        assert_eq!(ship.reputation, None);
    }

    #[test]
    fn empty_reply_is_empty_ship() {
        assert!(primary_ship("  ").is_empty());
    }
}
