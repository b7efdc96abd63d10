use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::payroll::leave::LeaveKind;

/// Shift starts at 08:30; anything after that counts as lateness.
pub const SHIFT_START_MIN: u32 = 510;
pub const WORK_HOURS_PER_DAY: f64 = 8.0;

/// Parse a `YYYY-MM` month identifier.
pub fn parse_month(s: &str) -> Option<(i32, u32)> {
    let (y, m) = s.trim().split_once('-')?;
    if y.len() != 4 || m.len() != 2 {
        return None;
    }
    let year: i32 = y.parse().ok()?;
    let month: u32 = m.parse().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

/// First and last calendar day of the month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next_first.pred_opt()?))
}

/// Every Monday–Friday date of the month. Weekends are always excluded;
/// there is no holiday calendar.
pub fn workdays(year: i32, month: u32) -> Vec<NaiveDate> {
    let Some((first, last)) = month_bounds(year, month) else {
        return Vec::new();
    };

    let mut days = Vec::with_capacity(23);
    let mut day = first;
    while day <= last {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(day);
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    days
}

/// One freshly derived payroll line, not yet persisted. Bonus is always zero
/// here; it only ever comes from a manual admin edit.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedLine {
    pub employee_id: u64,
    pub base_amount: f64,
    pub deduction_amount: f64,
    pub net_amount: f64,
    pub late_minutes: u32,
    pub absent_days: u32,
    pub paid_leave_days: u32,
    pub unpaid_leave_days: u32,
    pub workday_count: u32,
}

/// Derive one employee's line for a month from the aggregated attendance and
/// leave maps.
///
/// Per workday, presence is checked first, so a day is either late-counted or
/// absence-counted, never both. Lateness is penalized at the hourly rate,
/// whole missing days (true no-shows and unpaid leave) at the daily rate.
/// The daily rate divides base by all workdays of the month, including days
/// later taken as leave. That is the established payroll policy; see the
/// note in DESIGN.md before changing it.
pub fn compute_line(
    employee_id: u64,
    base: f64,
    workdays: &[NaiveDate],
    clock_ins: &HashMap<(u64, NaiveDate), u32>,
    leave: &HashMap<(u64, NaiveDate), LeaveKind>,
) -> ComputedLine {
    let mut late_minutes = 0u32;
    let mut absent_days = 0u32;
    let mut paid_leave_days = 0u32;
    let mut unpaid_leave_days = 0u32;

    for day in workdays {
        if let Some(&minute) = clock_ins.get(&(employee_id, *day)) {
            late_minutes += minute.saturating_sub(SHIFT_START_MIN);
        } else {
            match leave.get(&(employee_id, *day)) {
                Some(LeaveKind::Paid) => paid_leave_days += 1,
                Some(LeaveKind::Unpaid) => unpaid_leave_days += 1,
                None => absent_days += 1,
            }
        }
    }

    let workday_count = workdays.len() as u32;
    let daily_rate = if workday_count > 0 {
        base / workday_count as f64
    } else {
        0.0
    };
    let hourly_rate = daily_rate / WORK_HOURS_PER_DAY;

    // The one rounding step; rates above stay floating-point.
    let deduction_amount = ((late_minutes as f64 / 60.0) * hourly_rate
        + (absent_days + unpaid_leave_days) as f64 * daily_rate)
        .round();
    let net_amount = (base - deduction_amount).max(0.0);

    ComputedLine {
        employee_id,
        base_amount: base,
        deduction_amount,
        net_amount,
        late_minutes,
        absent_days,
        paid_leave_days,
        unpaid_leave_days,
        workday_count,
    }
}

/// Net amount after an edit: base + bonus - deduction, floored at zero.
pub fn recompute_net(base: f64, bonus: f64, deduction: f64) -> f64 {
    (base + bonus - deduction).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_month_accepts_yyyy_mm_only() {
        assert_eq!(parse_month("2026-01"), Some((2026, 1)));
        assert_eq!(parse_month("1999-12"), Some((1999, 12)));
        for bad in ["", "2026", "2026-13", "2026-00", "2026-1", "26-01", "2026/01", "abcd-ef"] {
            assert_eq!(parse_month(bad), None, "input = {bad:?}");
        }
    }

    #[test]
    fn month_bounds_cover_the_whole_month() {
        assert_eq!(
            month_bounds(2026, 1),
            Some((date(2026, 1, 1), date(2026, 1, 31)))
        );
        assert_eq!(
            month_bounds(2026, 12),
            Some((date(2026, 12, 1), date(2026, 12, 31)))
        );
        // leap February
        assert_eq!(
            month_bounds(2024, 2),
            Some((date(2024, 2, 1), date(2024, 2, 29)))
        );
    }

    #[test]
    fn workday_count_equals_mon_fri_dates_of_the_month() {
        // June 2024 starts on a Saturday: 20 weekdays.
        assert_eq!(workdays(2024, 6).len(), 20);
        // January 2026: 22 weekdays.
        assert_eq!(workdays(2026, 1).len(), 22);
        // Every returned date is Mon..Fri.
        for day in workdays(2026, 1) {
            assert!(!matches!(day.weekday(), Weekday::Sat | Weekday::Sun));
        }
    }

    #[test]
    fn full_attendance_on_time_deducts_nothing() {
        let days = workdays(2026, 1);
        let mut ins = HashMap::new();
        for d in &days {
            ins.insert((1, *d), SHIFT_START_MIN);
        }
        let line = compute_line(1, 30000.0, &days, &ins, &HashMap::new());
        assert_eq!(line.deduction_amount, 0.0);
        assert_eq!(line.net_amount, 30000.0);
        assert_eq!(line.late_minutes, 0);
        assert_eq!(line.absent_days, 0);
    }

    #[test]
    fn one_half_hour_lateness_over_22_workdays() {
        // base=30000, 22 workdays: hourly rate 170.45; 30 late minutes cost
        // round(0.5 * 170.45) = 85.
        let days = workdays(2026, 1);
        assert_eq!(days.len(), 22);

        let mut ins = HashMap::new();
        for (i, d) in days.iter().enumerate() {
            let minute = if i == 0 { SHIFT_START_MIN + 30 } else { SHIFT_START_MIN };
            ins.insert((1, *d), minute);
        }

        let line = compute_line(1, 30000.0, &days, &ins, &HashMap::new());
        assert_eq!(line.late_minutes, 30);
        assert_eq!(line.deduction_amount, 85.0);
        assert_eq!(line.net_amount, 29915.0);
    }

    #[test]
    fn two_no_show_days_over_20_workdays() {
        // base=20000, 20 workdays: daily rate 1000; two absences cost 2000.
        let days = workdays(2024, 6);
        assert_eq!(days.len(), 20);

        let mut ins = HashMap::new();
        for d in days.iter().skip(2) {
            ins.insert((1, *d), SHIFT_START_MIN);
        }

        let line = compute_line(1, 20000.0, &days, &ins, &HashMap::new());
        assert_eq!(line.absent_days, 2);
        assert_eq!(line.deduction_amount, 2000.0);
        assert_eq!(line.net_amount, 18000.0);
    }

    #[test]
    fn paid_leave_days_are_neither_absent_nor_deducted() {
        let days = workdays(2026, 1);
        let mut ins = HashMap::new();
        for d in days.iter().skip(3) {
            ins.insert((1, *d), SHIFT_START_MIN);
        }
        let mut leave = HashMap::new();
        for d in days.iter().take(3) {
            leave.insert((1, *d), LeaveKind::Paid);
        }

        let line = compute_line(1, 30000.0, &days, &ins, &leave);
        assert_eq!(line.paid_leave_days, 3);
        assert_eq!(line.absent_days, 0);
        assert_eq!(line.deduction_amount, 0.0);
    }

    #[test]
    fn unpaid_leave_is_deducted_at_the_daily_rate() {
        let days = workdays(2024, 6);
        let mut ins = HashMap::new();
        for d in days.iter().skip(1) {
            ins.insert((1, *d), SHIFT_START_MIN);
        }
        let mut leave = HashMap::new();
        leave.insert((1, days[0]), LeaveKind::Unpaid);

        let line = compute_line(1, 20000.0, &days, &ins, &leave);
        assert_eq!(line.unpaid_leave_days, 1);
        assert_eq!(line.absent_days, 0);
        assert_eq!(line.deduction_amount, 1000.0);
    }

    #[test]
    fn workday_with_no_attendance_and_no_leave_is_absent() {
        let days = workdays(2026, 1);
        let line = compute_line(1, 22000.0, &days, &HashMap::new(), &HashMap::new());
        assert_eq!(line.absent_days, days.len() as u32);
        assert_eq!(line.paid_leave_days, 0);
        assert_eq!(line.unpaid_leave_days, 0);
    }

    #[test]
    fn presence_shadows_a_leave_flag_on_the_same_day() {
        // Presence is checked first, so a day can never be both late-counted
        // and absence-counted.
        let days = workdays(2026, 1);
        let mut ins = HashMap::new();
        let mut leave = HashMap::new();
        for d in &days {
            ins.insert((1, *d), SHIFT_START_MIN + 10);
            leave.insert((1, *d), LeaveKind::Unpaid);
        }

        let line = compute_line(1, 30000.0, &days, &ins, &leave);
        assert_eq!(line.unpaid_leave_days, 0);
        assert_eq!(line.late_minutes, 10 * days.len() as u32);
    }

    #[test]
    fn deduction_is_monotone_in_late_minutes() {
        let days = workdays(2026, 1);
        let mut previous = -1.0;
        for late in [0u32, 5, 30, 60, 240, 480] {
            let mut ins = HashMap::new();
            for (i, d) in days.iter().enumerate() {
                let minute = if i == 0 { SHIFT_START_MIN + late } else { SHIFT_START_MIN };
                ins.insert((1, *d), minute);
            }
            let line = compute_line(1, 30000.0, &days, &ins, &HashMap::new());
            assert!(
                line.deduction_amount >= previous,
                "deduction decreased at late = {late}"
            );
            previous = line.deduction_amount;
        }
    }

    #[test]
    fn deduction_never_pushes_net_below_zero() {
        let days = workdays(2026, 1);
        // Tiny base with a month of absences: deduction == base, floored at 0.
        let line = compute_line(1, 100.0, &days, &HashMap::new(), &HashMap::new());
        assert_eq!(line.net_amount, 0.0);
    }

    #[test]
    fn zero_workdays_means_zero_rates() {
        let line = compute_line(1, 30000.0, &[], &HashMap::new(), &HashMap::new());
        assert_eq!(line.workday_count, 0);
        assert_eq!(line.deduction_amount, 0.0);
        assert_eq!(line.net_amount, 30000.0);
    }

    // The daily rate divides by all workdays even when some of them are spent
    // on leave, so a month with leave discounts the remaining days slightly.
    // Documented policy, not an accident; this test pins it down.
    #[test]
    fn rate_denominator_includes_leave_days() {
        let days = workdays(2024, 6); // 20 workdays
        let mut ins = HashMap::new();
        for d in days.iter().skip(10) {
            ins.insert((1, *d), SHIFT_START_MIN);
        }
        let mut leave = HashMap::new();
        for d in days.iter().take(9) {
            leave.insert((1, *d), LeaveKind::Paid);
        }
        // 9 paid leave days, 1 absence: daily rate is still 20000/20, not
        // 20000/11.
        let line = compute_line(1, 20000.0, &days, &ins, &leave);
        assert_eq!(line.absent_days, 1);
        assert_eq!(line.deduction_amount, 1000.0);
    }

    #[test]
    fn recompute_net_applies_the_invariant() {
        assert_eq!(recompute_net(30000.0, 5000.0, 2000.0), 33000.0);
        assert_eq!(recompute_net(1000.0, 0.0, 2500.0), 0.0);
        assert_eq!(recompute_net(0.0, 0.0, 0.0), 0.0);
    }
}
