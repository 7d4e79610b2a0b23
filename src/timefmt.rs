//! Finish-time codec: "HH:MM:SS" strings to elapsed seconds and back.
//!
//! Pure and side-effect-free. Malformed input degrades to `None` — a bad
//! time string downgrades one field, it never rejects a row.

/// Parse a colon-separated "HH:MM:SS" string into elapsed seconds.
///
/// Requires exactly three non-negative integer components. Returns `None`
/// on a wrong component count or a non-numeric component.
pub fn seconds_of_hms(time: &str) -> Option<i64> {
    let mut parts = time.split(':');
    let h: i64 = parts.next()?.trim().parse().ok()?;
    let m: i64 = parts.next()?.trim().parse().ok()?;
    let s: i64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    if h < 0 || m < 0 || s < 0 {
        return None;
    }
    Some(h * 3600 + m * 60 + s)
}

/// Format elapsed seconds as a zero-padded "HH:MM:SS" string.
///
/// Hours widen past two digits for very long times; minutes and seconds are
/// always two digits. Negative input clamps to zero.
pub fn hms_of_seconds(total: i64) -> String {
    let total = total.max(0);
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        assert_eq!(seconds_of_hms("3:00:00"), Some(10800));
        assert_eq!(seconds_of_hms("02:30:15"), Some(9015));
        assert_eq!(seconds_of_hms("0:00:00"), Some(0));
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(seconds_of_hms("abc"), None);
        assert_eq!(seconds_of_hms("1:2"), None);
        assert_eq!(seconds_of_hms("1:2:3:4"), None);
        assert_eq!(seconds_of_hms("1:x:3"), None);
        assert_eq!(seconds_of_hms(""), None);
        assert_eq!(seconds_of_hms("-1:00:00"), None);
    }

    #[test]
    fn test_format_zero_padded() {
        assert_eq!(hms_of_seconds(9015), "02:30:15");
        assert_eq!(hms_of_seconds(0), "00:00:00");
        assert_eq!(hms_of_seconds(59), "00:00:59");
        assert_eq!(hms_of_seconds(3600), "01:00:00");
    }

    #[test]
    fn test_round_trip() {
        for time in ["00:00:00", "02:30:15", "11:59:59", "100:00:01"] {
            let secs = seconds_of_hms(time).unwrap();
            assert_eq!(hms_of_seconds(secs), time, "round trip for {}", time);
        }
    }

    #[test]
    fn test_round_trip_sweep() {
        for secs in (0..36_000).step_by(7) {
            let time = hms_of_seconds(secs);
            assert_eq!(seconds_of_hms(&time), Some(secs));
        }
    }
}
