use std::collections::HashMap;

use chrono::NaiveDate;

/// Leave categories that do not reduce pay. Matching is case-insensitive and
/// contains-based because the type column is free text filled in by several
/// client versions (Thai and English spellings both occur).
const PAID_LEAVE_TYPES: [&str; 6] = [
    "ลาป่วย",
    "ลาพักร้อน",
    "ลาประจำปี",
    "sick",
    "vacation",
    "annual",
];

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LeaveKind {
    Paid,
    Unpaid,
}

/// Approved leave request as delivered by the provider query.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApprovedLeaveRow {
    pub employee_id: u64,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Whether a leave type string belongs to a paid category.
pub fn is_paid_leave_type(leave_type: &str) -> bool {
    let t = leave_type.trim().to_lowercase();
    PAID_LEAVE_TYPES.iter().any(|p| t.contains(p))
}

/// Per (employee, date) paid/unpaid flags for every date of each approved
/// span clamped to `[from, to]`. Overlapping spans for the same employee are
/// a data-quality issue upstream; later rows simply overwrite earlier ones.
pub fn leave_flags(
    rows: &[ApprovedLeaveRow],
    from: NaiveDate,
    to: NaiveDate,
) -> HashMap<(u64, NaiveDate), LeaveKind> {
    let mut map = HashMap::new();

    for lv in rows {
        let kind = if is_paid_leave_type(&lv.leave_type) {
            LeaveKind::Paid
        } else {
            LeaveKind::Unpaid
        };

        let mut day = lv.start_date.max(from);
        let last = lv.end_date.min(to);
        while day <= last {
            map.insert((lv.employee_id, day), kind);
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn leave(employee_id: u64, leave_type: &str, start: NaiveDate, end: NaiveDate) -> ApprovedLeaveRow {
        ApprovedLeaveRow {
            employee_id,
            leave_type: leave_type.to_string(),
            start_date: start,
            end_date: end,
        }
    }

    #[test]
    fn classifies_known_paid_categories() {
        for t in ["ลาป่วย", "ลาพักร้อน", "ลาประจำปี", "sick", "vacation", "annual"] {
            assert!(is_paid_leave_type(t), "type = {t:?}");
        }
    }

    #[test]
    fn classification_is_case_insensitive_and_contains_based() {
        assert!(is_paid_leave_type("Sick Leave"));
        assert!(is_paid_leave_type("ANNUAL"));
        assert!(is_paid_leave_type("ลาป่วย (ครึ่งวัน)"));
        assert!(!is_paid_leave_type("personal"));
        assert!(!is_paid_leave_type("ลากิจ"));
        assert!(!is_paid_leave_type(""));
    }

    #[test]
    fn flags_every_date_of_the_span_inclusive() {
        let rows = vec![leave(1, "sick", date(2026, 1, 5), date(2026, 1, 7))];
        let map = leave_flags(&rows, date(2026, 1, 1), date(2026, 1, 31));
        assert_eq!(map.len(), 3);
        for d in 5..=7 {
            assert_eq!(map.get(&(1, date(2026, 1, d))), Some(&LeaveKind::Paid));
        }
    }

    #[test]
    fn clamps_spans_to_the_requested_range() {
        let rows = vec![leave(1, "ลากิจ", date(2025, 12, 29), date(2026, 1, 2))];
        let map = leave_flags(&rows, date(2026, 1, 1), date(2026, 1, 31));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&(1, date(2026, 1, 1))), Some(&LeaveKind::Unpaid));
        assert_eq!(map.get(&(1, date(2026, 1, 2))), Some(&LeaveKind::Unpaid));
    }

    #[test]
    fn later_rows_win_on_overlap() {
        let rows = vec![
            leave(1, "personal", date(2026, 1, 5), date(2026, 1, 5)),
            leave(1, "sick", date(2026, 1, 5), date(2026, 1, 5)),
        ];
        let map = leave_flags(&rows, date(2026, 1, 1), date(2026, 1, 31));
        assert_eq!(map.get(&(1, date(2026, 1, 5))), Some(&LeaveKind::Paid));
    }
}
