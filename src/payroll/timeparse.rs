use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Timestamp formats seen in attendance data. Rows come from several
/// generations of clients, so a value may be a bare time, a SQL datetime or a
/// full ISO-8601 instant. Malformed input degrades to `None`, never an error.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// Minutes since midnight of the time-of-day carried by `raw`, or `None` if
/// no time component can be parsed out of it.
pub fn time_of_day(raw: &str) -> Option<u32> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in TIME_FORMATS {
        if let Ok(t) = NaiveTime::parse_from_str(s, fmt) {
            return Some(t.hour() * 60 + t.minute());
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.hour() * 60 + dt.minute());
        }
    }

    // Offset-carrying instants keep their own wall clock.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.hour() * 60 + dt.minute());
    }

    None
}

/// Calendar date carried by `raw` (date-only, SQL datetime or ISO instant),
/// or `None` if it cannot be parsed.
pub fn calendar_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }

    // Date+time forms carry the date in the leading "YYYY-MM-DD".
    if let (Some(head), Some(sep)) = (s.get(..10), s.as_bytes().get(10)) {
        if *sep == b'T' || *sep == b' ' {
            if let Ok(d) = NaiveDate::parse_from_str(head, "%Y-%m-%d") {
                return Some(d);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn time_of_day_accepts_every_documented_shape() {
        let cases = [
            ("08:30", 510),
            ("08:30:15", 510),
            ("2026-01-05 08:45:00", 525),
            ("2026-01-05 08:45", 525),
            ("2026-01-05T09:00:00", 540),
            ("2026-01-05T09:00:00+07:00", 540),
            ("2026-01-05T00:15:00Z", 15),
            ("  08:30  ", 510),
        ];
        for (raw, want) in cases {
            assert_eq!(time_of_day(raw), Some(want), "raw = {raw:?}");
        }
    }

    #[test]
    fn time_of_day_degrades_to_none_on_garbage() {
        for raw in ["", "   ", "not a time", "25:99", "2026-01-05", "สวัสดี"] {
            assert_eq!(time_of_day(raw), None, "raw = {raw:?}");
        }
    }

    #[test]
    fn calendar_date_accepts_every_documented_shape() {
        let want = date(2026, 1, 5);
        for raw in [
            "2026-01-05",
            "2026-01-05 08:45:00",
            "2026-01-05T08:45:00",
            "2026-01-05T08:45:00Z",
            " 2026-01-05 ",
        ] {
            assert_eq!(calendar_date(raw), Some(want), "raw = {raw:?}");
        }
    }

    #[test]
    fn calendar_date_degrades_to_none_on_garbage() {
        for raw in ["", "08:30", "2026-13-05", "garbage", "2026-01-05Xjunk"] {
            assert_eq!(calendar_date(raw), None, "raw = {raw:?}");
        }
    }
}
