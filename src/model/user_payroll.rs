use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Denormalized, employee-facing copy of a paid payroll line. Written by the
/// publish adapter, read by the "my payroll" inbox.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct UserPayroll {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "2026-01")]
    pub month_year: String,
    pub payroll_id: u64,
    pub emp_code: String,
    pub full_name: String,
    pub department: String,
    pub base_amount: f64,
    pub bonus_amount: f64,
    pub deduction_amount: f64,
    pub net_amount: f64,
    #[schema(example = "paid")]
    pub status: String,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub paid_at: Option<NaiveDateTime>,
    pub late_minutes: u32,
    pub absent_days: u32,
    pub paid_leave_days: u32,
    pub unpaid_leave_days: u32,
    pub workday_count: u32,
}
