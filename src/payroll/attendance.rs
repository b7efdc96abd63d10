use std::collections::HashMap;

use chrono::NaiveDate;

use crate::payroll::timeparse::{calendar_date, time_of_day};

/// Attendance row as delivered by the provider query: the clock timestamps
/// are kept raw because historical rows mix several formats.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawAttendanceRow {
    pub employee_id: u64,
    pub clock_in: Option<String>,
    pub clock_out: Option<String>,
}

/// Earliest clock-in minute per (employee, date) within `[from, to]`.
///
/// Minimum-wins on duplicates, which models "first badge of the day" and
/// makes the aggregation idempotent under retried clock-ins. Rows without a
/// parseable clock-in do not count as presence and are dropped.
pub fn earliest_clock_ins(
    rows: &[RawAttendanceRow],
    from: NaiveDate,
    to: NaiveDate,
) -> HashMap<(u64, NaiveDate), u32> {
    let mut map = HashMap::new();

    for row in rows {
        let Some(raw) = row.clock_in.as_deref() else {
            continue;
        };
        let (Some(date), Some(minute)) = (calendar_date(raw), time_of_day(raw)) else {
            continue;
        };
        if date < from || date > to {
            continue;
        }

        map.entry((row.employee_id, date))
            .and_modify(|m: &mut u32| *m = (*m).min(minute))
            .or_insert(minute);
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(employee_id: u64, clock_in: Option<&str>) -> RawAttendanceRow {
        RawAttendanceRow {
            employee_id,
            clock_in: clock_in.map(String::from),
            clock_out: None,
        }
    }

    #[test]
    fn keeps_the_earliest_clock_in_per_day() {
        let rows = vec![
            row(1, Some("2026-01-05 09:10:00")),
            row(1, Some("2026-01-05 08:25:00")),
            row(1, Some("2026-01-05 12:00:00")),
        ];
        let map = earliest_clock_ins(&rows, date(2026, 1, 1), date(2026, 1, 31));
        assert_eq!(map.get(&(1, date(2026, 1, 5))), Some(&505));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn drops_rows_without_a_parseable_clock_in() {
        let rows = vec![
            row(1, None),
            row(1, Some("not a timestamp")),
            row(2, Some("2026-01-06 08:30:00")),
        ];
        let map = earliest_clock_ins(&rows, date(2026, 1, 1), date(2026, 1, 31));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&(2, date(2026, 1, 6))), Some(&510));
    }

    #[test]
    fn ignores_rows_outside_the_range() {
        let rows = vec![
            row(1, Some("2025-12-31 08:00:00")),
            row(1, Some("2026-02-01 08:00:00")),
        ];
        let map = earliest_clock_ins(&rows, date(2026, 1, 1), date(2026, 1, 31));
        assert!(map.is_empty());
    }

    #[test]
    fn aggregation_is_idempotent_over_identical_input() {
        let rows = vec![
            row(1, Some("2026-01-05 08:25:00")),
            row(1, Some("2026-01-05 09:10:00")),
            row(3, Some("2026-01-07 10:02:00")),
        ];
        let first = earliest_clock_ins(&rows, date(2026, 1, 1), date(2026, 1, 31));
        let second = earliest_clock_ins(&rows, date(2026, 1, 1), date(2026, 1, 31));
        assert_eq!(first, second);
    }
}
