//! ISO-8601 local date-time handling.
//!
//! Readings carry wall-clock instants with no UTC offset. Incoming strings
//! follow `YYYY-MM-DDTHH:MM[:SS[.fraction]]` and outgoing values are always
//! rendered with seconds.

use chrono::{Local, NaiveDateTime, TimeDelta, Timelike};

const WITH_SECONDS: &str = "%Y-%m-%dT%H:%M:%S%.f";
const WITHOUT_SECONDS: &str = "%Y-%m-%dT%H:%M";

/// Current local wall-clock time without offset.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Parses an ISO local date-time. Offsets, surrounding whitespace, short
/// fields, signed years, leap seconds and fractions past nanoseconds are
/// rejected. The `T` separator is case-insensitive.
pub fn parse_local(raw: &str) -> Option<NaiveDateTime> {
    if !has_iso_shape(raw.as_bytes()) {
        return None;
    }
    // Shape check guarantees ASCII, so byte 10 is a char boundary.
    let normalized = format!("{}T{}", &raw[..10], &raw[11..]);
    let ts = NaiveDateTime::parse_from_str(&normalized, WITH_SECONDS)
        .or_else(|_| NaiveDateTime::parse_from_str(&normalized, WITHOUT_SECONDS))
        .ok()?;
    (ts.nanosecond() < 1_000_000_000).then_some(ts)
}

/// `YYYY-MM-DD(T|t)HH:MM[:SS[.f{1,9}]]` with fixed-width digit fields.
fn has_iso_shape(b: &[u8]) -> bool {
    let digits = |range: std::ops::Range<usize>| b[range].iter().all(u8::is_ascii_digit);

    if b.len() < 16
        || !digits(0..4)
        || b[4] != b'-'
        || !digits(5..7)
        || b[7] != b'-'
        || !digits(8..10)
        || !matches!(b[10], b'T' | b't')
        || !digits(11..13)
        || b[13] != b':'
        || !digits(14..16)
    {
        return false;
    }

    match b.len() {
        16 => true,
        17 | 18 => false,
        _ => {
            if b[16] != b':' || !digits(17..19) {
                return false;
            }
            match b.len() {
                19 => true,
                n => b[19] == b'.' && (21..=29).contains(&n) && digits(20..n),
            }
        }
    }
}

pub fn format_local(ts: &NaiveDateTime) -> String {
    ts.format(WITH_SECONDS).to_string()
}

/// `now - minutes`, saturating at the earliest representable instant.
pub fn minutes_before(now: NaiveDateTime, minutes: i64) -> NaiveDateTime {
    TimeDelta::try_minutes(minutes)
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(if minutes >= 0 {
            NaiveDateTime::MIN
        } else {
            NaiveDateTime::MAX
        })
}

/// `now + minutes`, or `None` past the representable range.
pub fn minutes_after(now: NaiveDateTime, minutes: i64) -> Option<NaiveDateTime> {
    TimeDelta::try_minutes(minutes).and_then(|delta| now.checked_add_signed(delta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_parse_full_seconds() {
        assert_eq!(parse_local("2024-03-15T10:30:45"), Some(at(10, 30, 45)));
    }

    #[test]
    fn test_parse_without_seconds() {
        assert_eq!(parse_local("2024-03-15T10:30"), Some(at(10, 30, 0)));
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let ts = parse_local("2024-03-15T10:30:45.123456").unwrap();
        assert_eq!(ts.nanosecond(), 123_456_000);

        let ts = parse_local("2024-03-15T10:30:45.5").unwrap();
        assert_eq!(ts.nanosecond(), 500_000_000);
    }

    #[test]
    fn test_parse_rejects_offsets_and_garbage() {
        assert!(parse_local("2024-03-15T10:30:45Z").is_none());
        assert!(parse_local("2024-03-15T10:30:45+02:00").is_none());
        assert!(parse_local("2024-03-15 10:30:45").is_none());
        assert!(parse_local("not-a-date").is_none());
        assert!(parse_local(" 2024-03-15T10:30:45").is_none());
        assert!(parse_local("").is_none());
    }

    #[test]
    fn test_parse_rejects_loose_fields() {
        for bad in [
            "2024-3-5T1:2:3",
            "2024-03-15T7:05",
            "+2024-03-15T10:30:00",
            "2024-03-15T10:30:60",
            "2024-03-15T10:30:00.1234567891",
            "2024-03-15T10:30:00.",
            "2024-03-15T10:3",
            "2024-03-15T10:30:0",
            "24-03-15T10:30:00",
        ] {
            assert!(parse_local(bad).is_none(), "{bad:?}");
        }
    }

    #[test]
    fn test_parse_lowercase_separator_and_nanos() {
        assert_eq!(parse_local("2024-03-15t10:30:45"), Some(at(10, 30, 45)));
        assert_eq!(parse_local("2024-03-15t10:30"), Some(at(10, 30, 0)));

        let ts = parse_local("2024-03-15T10:30:45.123456789").unwrap();
        assert_eq!(ts.nanosecond(), 123_456_789);
    }

    #[test]
    fn test_format_keeps_seconds() {
        assert_eq!(format_local(&at(9, 5, 0)), "2024-03-15T09:05:00");
    }

    #[test]
    fn test_minutes_before_saturates() {
        assert_eq!(minutes_before(at(10, 0, 0), 60), at(9, 0, 0));
        assert_eq!(minutes_before(at(10, 0, 0), i64::MAX), NaiveDateTime::MIN);
    }

    #[test]
    fn test_minutes_after_overflow() {
        assert_eq!(minutes_after(at(10, 0, 0), 5), Some(at(10, 5, 0)));
        assert!(minutes_after(NaiveDateTime::MAX, 1).is_none());
    }
}
