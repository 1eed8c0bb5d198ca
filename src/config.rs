// src/config.rs
//
// Bridge configuration: pacing delays, buffer capacities, and the duration
// grammar used by the delay flags ("300ms", "1.5s", "1m30s", bare "0").

use std::time::Duration;

use crate::error::Error;

/// The five pacing delays applied around reads and writes. All default to
/// the values the bridge has always shipped with; zero disables a delay.
#[derive(Debug, Clone, Copy)]
pub struct PacingConfig {
    /// Slept by each gated reader before every read attempt.
    pub before_read: Duration,
    /// Slept before forwarding network bytes to the serial device.
    pub serial_before_write: Duration,
    /// Slept after a serial write cycle completes.
    pub serial_after_write: Duration,
    /// Slept before forwarding serial bytes to the network client.
    pub tcp_before_write: Duration,
    /// Slept after a network write cycle completes.
    pub tcp_after_write: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        PacingConfig {
            before_read: Duration::from_millis(1000),
            serial_before_write: Duration::ZERO,
            serial_after_write: Duration::from_millis(100),
            tcp_before_write: Duration::ZERO,
            tcp_after_write: Duration::ZERO,
        }
    }
}

impl PacingConfig {
    /// All delays disabled. Flat-out relaying, no pacing.
    pub fn zero() -> Self {
        PacingConfig {
            before_read: Duration::ZERO,
            serial_before_write: Duration::ZERO,
            serial_after_write: Duration::ZERO,
            tcp_before_write: Duration::ZERO,
            tcp_after_write: Duration::ZERO,
        }
    }
}

/// Everything the bridge core needs beyond its I/O handles.
#[derive(Debug, Clone, Copy)]
pub struct BridgeConfig {
    pub pacing: PacingConfig,
    /// Capacity of the serial read buffer (one chunk).
    pub serial_buffer_size: usize,
    /// Capacity of the network read buffer (one chunk).
    pub tcp_buffer_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            pacing: PacingConfig::default(),
            serial_buffer_size: 64,
            tcp_buffer_size: 64,
        }
    }
}

const NANOS_PER_UNIT: &[(&str, u64)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
];

/// Parses a duration string: one or more `<number><unit>` segments, where the
/// number may carry a fraction and the unit is one of ns, us, ms, s, m, h.
/// A bare `0` needs no unit. Negative durations are rejected.
pub fn parse_duration(input: &str) -> Result<Duration, Error> {
    let invalid = || Error::config(format!("invalid duration {:?}", input));

    let s = input.trim();
    let s = s.strip_prefix('+').unwrap_or(s);
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() || s.starts_with('-') {
        return Err(invalid());
    }

    let mut total_nanos: u64 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let number = &rest[..number_len];
        if number.is_empty() || number == "." || number.matches('.').count() > 1 {
            return Err(invalid());
        }
        let value: f64 = number.parse().map_err(|_| invalid())?;

        rest = &rest[number_len..];
        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        if unit.is_empty() {
            return Err(Error::config(format!("missing unit in duration {:?}", input)));
        }
        let scale = NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, nanos)| *nanos)
            .ok_or_else(|| {
                Error::config(format!("unknown unit {:?} in duration {:?}", unit, input))
            })?;

        let segment = (value * scale as f64).round();
        if !segment.is_finite() || segment > u64::MAX as f64 {
            return Err(invalid());
        }
        total_nanos = total_nanos.checked_add(segment as u64).ok_or_else(|| invalid())?;
        rest = &rest[unit_len..];
    }

    Ok(Duration::from_nanos(total_nanos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_basic_units() {
        assert_eq!(parse_duration("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(parse_duration("1000ms").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("10us").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("250ns").unwrap(), Duration::from_nanos(250));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
    }

    #[test]
    fn test_parse_duration_fractions_and_compounds() {
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("0.1s").unwrap(), Duration::from_millis(100));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("2h45m").unwrap(), Duration::from_secs(9900));
        assert_eq!(parse_duration("1s500ms").unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn test_parse_duration_zero_and_sign() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("+0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("+2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("0ms").unwrap(), Duration::ZERO);
        assert!(parse_duration("-5s").is_err());
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("1..5s").is_err());
        assert!(parse_duration(".s").is_err());
        assert!(parse_duration("5 s").is_err());
    }

    #[test]
    fn test_parse_duration_error_names_the_input() {
        let err = parse_duration("10q").unwrap_err();
        let text = err.to_string();
        assert!(text.contains("unknown unit"), "got: {}", text);
        assert!(text.contains("10q"), "got: {}", text);
    }

    #[test]
    fn test_default_pacing_matches_shipped_defaults() {
        let pacing = PacingConfig::default();
        assert_eq!(pacing.before_read, Duration::from_millis(1000));
        assert_eq!(pacing.serial_before_write, Duration::ZERO);
        assert_eq!(pacing.serial_after_write, Duration::from_millis(100));
        assert_eq!(pacing.tcp_before_write, Duration::ZERO);
        assert_eq!(pacing.tcp_after_write, Duration::ZERO);
    }
}
