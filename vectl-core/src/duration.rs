//! Compose duration strings (`1m30s`, `500ms`, `1.5s`).
//!
//! Compose inherits Go's `time.ParseDuration` grammar: one or more
//! `<decimal><unit>` groups, units `ns us µs ms s m h`. A bare `0` is allowed.
//! Negative durations are rejected because no manifest field accepts them.

use std::time::Duration;

use crate::error::{Result, VectlError};

const NANOS_PER_UNIT: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("us", 1_000.0),
    ("µs", 1_000.0),
    ("ms", 1_000_000.0),
    ("s", 1_000_000_000.0),
    ("m", 60_000_000_000.0),
    ("h", 3_600_000_000_000.0),
];

/// Parse a compose duration string.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let value = input.trim();
    if value.is_empty() {
        return Err(VectlError::invalid_duration(input, "empty duration"));
    }
    if value == "0" {
        return Ok(Duration::ZERO);
    }
    if value.starts_with('-') {
        return Err(VectlError::invalid_duration(input, "negative duration"));
    }
    let mut rest = value.strip_prefix('+').unwrap_or(value);

    let mut total_nanos = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        if number.is_empty() || number == "." {
            return Err(VectlError::invalid_duration(input, "expected a number"));
        }
        let amount: f64 = number
            .parse()
            .map_err(|_| VectlError::invalid_duration(input, format!("bad number '{number}'")))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        if unit.is_empty() {
            return Err(VectlError::invalid_duration(input, "missing unit"));
        }
        let scale = NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| VectlError::invalid_duration(input, format!("unknown unit '{unit}'")))?;

        total_nanos += amount * scale;
        rest = next;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(VectlError::invalid_duration(input, "duration overflows"));
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_units() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("10us").unwrap(), Duration::from_micros(10));
    }

    #[test]
    fn parses_compound_and_fractional() {
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(
            parse_duration("1h2m3s").unwrap(),
            Duration::from_secs(3600 + 120 + 3)
        );
    }

    #[test]
    fn bare_zero_is_allowed() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "5", "s", "5x", "-1s", "1.2.3s", "."] {
            assert!(parse_duration(bad).is_err(), "accepted {bad:?}");
        }
    }
}
