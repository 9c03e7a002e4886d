//! Duration rendering for proxy response metadata.
//!
//! The frontend reports how long the backend call took as a human-readable
//! string (`"235ms"`, `"1.5s"`). Values are first rounded to a precision
//! that suits their magnitude, then rendered in Go-style notation so the
//! demo UI displays compact figures.

use std::time::Duration;

/// Rounds a measured backend call duration for reporting.
///
/// Millisecond precision when the value exceeds one millisecond, microsecond
/// precision otherwise. Halfway values round up.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use aviary_common::duration::round_duration;
///
/// let rounded = round_duration(Duration::from_micros(1_500_499));
/// assert_eq!(rounded, Duration::from_millis(1500));
///
/// let rounded = round_duration(Duration::from_nanos(842_499));
/// assert_eq!(rounded, Duration::from_micros(842));
/// ```
pub fn round_duration(d: Duration) -> Duration {
    if d > Duration::from_millis(1) {
        round_to(d, 1_000_000)
    } else {
        round_to(d, 1_000)
    }
}

fn round_to(d: Duration, unit_nanos: u128) -> Duration {
    let nanos = d.as_nanos();
    let rounded = ((nanos + unit_nanos / 2) / unit_nanos) * unit_nanos;
    Duration::from_nanos(rounded.min(u64::MAX as u128) as u64)
}

/// Renders a duration in Go-style notation.
///
/// Zero renders as `"0s"`; sub-millisecond values in whole microseconds
/// (`"842µs"`), sub-second values in whole milliseconds (`"235ms"`), seconds
/// with up to three fractional digits and trailing zeros trimmed (`"1.5s"`,
/// `"2s"`), and minutes as `"1m2.5s"`. Expects a value already rounded by
/// [`round_duration`]; finer precision is cut off at the rendered unit.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use aviary_common::duration::format_duration;
///
/// assert_eq!(format_duration(Duration::ZERO), "0s");
/// assert_eq!(format_duration(Duration::from_micros(842)), "842µs");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
/// assert_eq!(format_duration(Duration::from_millis(62_500)), "1m2.5s");
/// ```
pub fn format_duration(d: Duration) -> String {
    if d.is_zero() {
        return "0s".to_string();
    }
    if d < Duration::from_millis(1) {
        return format!("{}µs", d.as_micros());
    }
    if d < Duration::from_secs(1) {
        return format!("{}ms", d.as_millis());
    }
    if d < Duration::from_secs(60) {
        return format!("{}s", format_seconds(d));
    }
    let minutes = d.as_secs() / 60;
    let remainder = d - Duration::from_secs(minutes * 60);
    format!("{}m{}s", minutes, format_seconds(remainder))
}

/// Formats whole-plus-fractional seconds with trailing zeros trimmed.
fn format_seconds(d: Duration) -> String {
    let millis = d.as_millis();
    let secs = millis / 1000;
    let frac = millis % 1000;
    if frac == 0 {
        format!("{}", secs)
    } else {
        let frac = format!("{:03}", frac);
        format!("{}.{}", secs, frac.trim_end_matches('0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_duration_submillisecond_uses_microseconds() {
        assert_eq!(
            round_duration(Duration::from_nanos(842_400)),
            Duration::from_micros(842)
        );
        assert_eq!(
            round_duration(Duration::from_nanos(500)),
            Duration::from_micros(1)
        );
        assert_eq!(
            round_duration(Duration::from_nanos(499)),
            Duration::from_micros(0)
        );
    }

    #[test]
    fn test_round_duration_millisecond_precision_above_one_ms() {
        assert_eq!(
            round_duration(Duration::from_micros(235_400)),
            Duration::from_millis(235)
        );
        assert_eq!(
            round_duration(Duration::from_micros(235_500)),
            Duration::from_millis(236)
        );
    }

    #[test]
    fn test_round_duration_exactly_one_ms_keeps_microseconds() {
        // 1ms is not "greater than 1ms", so it rounds at microsecond
        // precision; the rendered value is identical either way.
        assert_eq!(
            round_duration(Duration::from_millis(1)),
            Duration::from_millis(1)
        );
    }

    #[test]
    fn test_format_duration_zero() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn test_format_duration_microseconds() {
        assert_eq!(format_duration(Duration::from_micros(842)), "842µs");
        assert_eq!(format_duration(Duration::from_micros(1)), "1µs");
    }

    #[test]
    fn test_format_duration_milliseconds() {
        assert_eq!(format_duration(Duration::from_millis(235)), "235ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
    }

    #[test]
    fn test_format_duration_seconds_trims_trailing_zeros() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_millis(1235)), "1.235s");
        assert_eq!(format_duration(Duration::from_millis(1050)), "1.05s");
        assert_eq!(format_duration(Duration::from_secs(2)), "2s");
    }

    #[test]
    fn test_format_duration_minutes() {
        assert_eq!(format_duration(Duration::from_millis(62_500)), "1m2.5s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m0s");
    }

    #[test]
    fn test_round_then_format_boundary() {
        // 999.5ms rounds up across the unit boundary and renders as seconds.
        let d = round_duration(Duration::from_micros(999_500));
        assert_eq!(format_duration(d), "1s");
    }
}
