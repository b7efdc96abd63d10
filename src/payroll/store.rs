use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::model::employee::Employee;
use crate::payroll::attendance::RawAttendanceRow;
use crate::payroll::leave::ApprovedLeaveRow;

/// Stored payroll line joined with the owning employee, as shown to admins
/// and fed to the publish adapter.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct PayrollWithEmployee {
    pub id: u64,
    pub employee_id: u64,
    pub emp_code: String,
    pub full_name: String,
    pub department: String,
    #[schema(example = "2026-01")]
    pub month_year: String,
    pub base_amount: f64,
    pub bonus_amount: f64,
    pub deduction_amount: f64,
    pub net_amount: f64,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub paid_at: Option<NaiveDateTime>,
    pub late_minutes: u32,
    pub absent_days: u32,
    pub paid_leave_days: u32,
    pub unpaid_leave_days: u32,
    pub workday_count: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MonthStats {
    pub total: f64,
    pub paid: i64,
    pub pending: i64,
    pub avg: f64,
}

const LINE_WITH_EMPLOYEE_SELECT: &str = r#"
    SELECT
        p.id, p.employee_id, e.emp_code, e.full_name, e.department,
        p.month_year, p.base_amount, p.bonus_amount, p.deduction_amount,
        p.net_amount, p.status, p.paid_at,
        p.late_minutes, p.absent_days, p.paid_leave_days,
        p.unpaid_leave_days, p.workday_count
    FROM payrolls p
    JOIN employees e ON e.id = p.employee_id
"#;

pub async fn find_by_month(
    pool: &MySqlPool,
    month: &str,
) -> Result<Vec<PayrollWithEmployee>, sqlx::Error> {
    let sql = format!("{LINE_WITH_EMPLOYEE_SELECT} WHERE p.month_year = ? ORDER BY e.full_name ASC");
    sqlx::query_as::<_, PayrollWithEmployee>(&sql)
        .bind(month)
        .fetch_all(pool)
        .await
}

pub async fn find_with_employee(
    pool: &MySqlPool,
    id: u64,
) -> Result<Option<PayrollWithEmployee>, sqlx::Error> {
    let sql = format!("{LINE_WITH_EMPLOYEE_SELECT} WHERE p.id = ?");
    sqlx::query_as::<_, PayrollWithEmployee>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Idempotent month generation: insert a fresh pending line at the current
/// base salary, or refresh base-derived fields of an existing line. The
/// unique (employee_id, month_year) key carries the upsert; bonus, deduction
/// and status of existing rows are never touched, and net is re-derived from
/// the new base against the stored bonus/deduction so the net invariant
/// survives a salary change.
pub async fn upsert_generated(
    pool: &MySqlPool,
    month: &str,
    bases: &[(u64, f64)],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for (employee_id, base) in bases {
        sqlx::query(
            r#"
            INSERT INTO payrolls
                (employee_id, month_year, base_amount, bonus_amount, deduction_amount, net_amount, status)
            VALUES (?, ?, ?, 0, 0, ?, 'pending')
            ON DUPLICATE KEY UPDATE
                base_amount = VALUES(base_amount),
                net_amount = GREATEST(0, VALUES(base_amount) + bonus_amount - deduction_amount),
                updated_at = NOW()
            "#,
        )
        .bind(*employee_id)
        .bind(month)
        .bind(*base)
        .bind(base.max(0.0))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

pub async fn update_amounts(
    pool: &MySqlPool,
    id: u64,
    base: f64,
    bonus: f64,
    deduction: f64,
    net: f64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE payrolls
        SET base_amount = ?, bonus_amount = ?, deduction_amount = ?, net_amount = ?, updated_at = NOW()
        WHERE id = ?
        "#,
    )
    .bind(base)
    .bind(bonus)
    .bind(deduction)
    .bind(net)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Pay transition, serialized by the status guard: only a pending line is
/// updated, so a concurrent second call affects zero rows and the caller
/// treats it as a no-op.
pub async fn mark_paid(pool: &MySqlPool, id: u64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE payrolls
        SET status = 'paid', paid_at = NOW(), updated_at = NOW()
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn month_stats(pool: &MySqlPool, month: &str) -> Result<MonthStats, sqlx::Error> {
    let total: f64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(net_amount), 0) FROM payrolls WHERE month_year = ?")
            .bind(month)
            .fetch_one(pool)
            .await?;

    let paid: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM payrolls WHERE month_year = ? AND status = 'paid'",
    )
    .bind(month)
    .fetch_one(pool)
    .await?;

    let all: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payrolls WHERE month_year = ?")
        .bind(month)
        .fetch_one(pool)
        .await?;

    let pending = (all - paid).max(0);
    let avg = if all > 0 { total / all as f64 } else { 0.0 };

    Ok(MonthStats {
        total,
        paid,
        pending,
        avg,
    })
}

/// Roster provider: active employee accounts only.
pub async fn list_active_employees(pool: &MySqlPool) -> Result<Vec<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>(
        r#"
        SELECT e.id, e.user_id, e.emp_code, e.full_name, e.department,
               e.position_title, e.salary_base, e.start_date, e.work_hours_per_day
        FROM employees e
        JOIN users u ON u.id = e.user_id
        WHERE u.role_id = 2 AND u.status = 'active'
        ORDER BY e.full_name ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Attendance provider: raw rows of the closed date range. Timestamps are
/// cast to text because the aggregator owns the parsing (and its fallbacks).
pub async fn attendance_in_range(
    pool: &MySqlPool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<RawAttendanceRow>, sqlx::Error> {
    sqlx::query_as::<_, RawAttendanceRow>(
        r#"
        SELECT employee_id,
               CAST(clock_in AS CHAR) AS clock_in,
               CAST(clock_out AS CHAR) AS clock_out
        FROM attendance
        WHERE DATE(clock_in) BETWEEN ? AND ?
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

/// Leave provider: approved requests whose inclusive span overlaps the range.
pub async fn approved_leave_in_range(
    pool: &MySqlPool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<ApprovedLeaveRow>, sqlx::Error> {
    sqlx::query_as::<_, ApprovedLeaveRow>(
        r#"
        SELECT employee_id, leave_type, start_date, end_date
        FROM leave_requests
        WHERE status = 'approved' AND start_date <= ? AND end_date >= ?
        "#,
    )
    .bind(to)
    .bind(from)
    .fetch_all(pool)
    .await
}
