use crate::auth::auth::AuthUser;
use crate::model::payroll::PayStatus;
use crate::model::user_payroll::UserPayroll;
use crate::payroll::{
    attendance::earliest_clock_ins,
    calc::{self, compute_line},
    leave::leave_flags,
    publish::{PayrollSnapshot, Publisher},
    store::{self, MonthStats, PayrollWithEmployee},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct MonthQuery {
    #[schema(example = "2026-01")]
    pub month_year: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct GeneratePayroll {
    #[schema(example = "2026-01")]
    pub month_year: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePayroll {
    #[schema(example = 31000.0)]
    pub base_amount: Option<f64>,

    #[schema(example = 2000.0)]
    pub bonus_amount: Option<f64>,

    #[schema(example = 500.0)]
    pub deduction_amount: Option<f64>,
}

/// One admin-facing payroll line. `id` is absent on lines that were derived
/// on the fly because the month has not been generated yet.
#[derive(Serialize, ToSchema)]
pub struct PayrollLineView {
    pub id: Option<u64>,
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

impl From<PayrollWithEmployee> for PayrollLineView {
    fn from(line: PayrollWithEmployee) -> Self {
        Self {
            id: Some(line.id),
            employee_id: line.employee_id,
            emp_code: line.emp_code,
            full_name: line.full_name,
            department: line.department,
            month_year: line.month_year,
            base_amount: line.base_amount,
            bonus_amount: line.bonus_amount,
            deduction_amount: line.deduction_amount,
            net_amount: line.net_amount,
            status: line.status,
            paid_at: line.paid_at,
            late_minutes: line.late_minutes,
            absent_days: line.absent_days,
            paid_leave_days: line.paid_leave_days,
            unpaid_leave_days: line.unpaid_leave_days,
            workday_count: line.workday_count,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PayrollListResponse {
    #[schema(example = "2026-01")]
    pub month_year: String,
    /// true when the lines were derived from attendance/leave instead of read
    /// from stored rows
    pub computed: bool,
    pub data: Vec<PayrollLineView>,
}

#[derive(Serialize, ToSchema)]
pub struct PayResponse {
    pub data: PayrollWithEmployee,
    /// Whether the employee-visible copy was delivered; absent on a repeated
    /// pay of an already-paid line
    pub published: Option<bool>,
}

fn bad_month() -> HttpResponse {
    HttpResponse::BadRequest().json(json!({
        "message": "month_year must be provided as YYYY-MM"
    }))
}

/// Month listing. Stored rows win; with none persisted yet, lines are derived
/// from attendance and approved leave so the admin still gets a preview.
#[utoipa::path(
    get,
    path = "/api/v1/payroll",
    params(MonthQuery),
    responses(
        (status = 200, description = "Payroll lines for the month", body = PayrollListResponse),
        (status = 400, description = "Missing or malformed month"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_month(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<MonthQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let Some(month) = query.month_year.as_deref() else {
        return Ok(bad_month());
    };
    let Some((year, month_no)) = calc::parse_month(month) else {
        return Ok(bad_month());
    };

    let stored = store::find_by_month(pool.get_ref(), month)
        .await
        .map_err(|e| {
            error!(error = %e, month, "Failed to fetch payroll month");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if !stored.is_empty() {
        return Ok(HttpResponse::Ok().json(PayrollListResponse {
            month_year: month.to_string(),
            computed: false,
            data: stored.into_iter().map(PayrollLineView::from).collect(),
        }));
    }

    // Nothing persisted yet: derive lines from attendance + approved leave.
    let Some((from, to)) = calc::month_bounds(year, month_no) else {
        return Ok(bad_month());
    };
    let workdays = calc::workdays(year, month_no);

    let employees = store::list_active_employees(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch roster");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
    let attendance_rows = store::attendance_in_range(pool.get_ref(), from, to)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch attendance range");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
    let leave_rows = store::approved_leave_in_range(pool.get_ref(), from, to)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch approved leave");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let clock_ins = earliest_clock_ins(&attendance_rows, from, to);
    let leave = leave_flags(&leave_rows, from, to);

    let data = employees
        .into_iter()
        .map(|emp| {
            let computed = compute_line(emp.id, emp.salary_base, &workdays, &clock_ins, &leave);
            PayrollLineView {
                id: None,
                employee_id: emp.id,
                emp_code: emp.emp_code,
                full_name: emp.full_name,
                department: emp.department,
                month_year: month.to_string(),
                base_amount: computed.base_amount,
                bonus_amount: 0.0,
                deduction_amount: computed.deduction_amount,
                net_amount: computed.net_amount,
                status: PayStatus::Pending.to_string(),
                paid_at: None,
                late_minutes: computed.late_minutes,
                absent_days: computed.absent_days,
                paid_leave_days: computed.paid_leave_days,
                unpaid_leave_days: computed.unpaid_leave_days,
                workday_count: computed.workday_count,
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(PayrollListResponse {
        month_year: month.to_string(),
        computed: true,
        data,
    }))
}

/// Generate (or refresh) the month's lines at the employees' current base
/// salaries. Idempotent; already-set bonus/deduction/status survive.
#[utoipa::path(
    post,
    path = "/api/v1/payroll/generate",
    request_body = GeneratePayroll,
    responses(
        (status = 201, description = "Month generated", body = PayrollListResponse),
        (status = 400, description = "Malformed month or empty roster"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn generate(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<GeneratePayroll>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let month = payload.month_year.trim();
    if calc::parse_month(month).is_none() {
        return Ok(bad_month());
    }

    let employees = store::list_active_employees(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch roster");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if employees.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "No active employees to generate payroll for"
        })));
    }

    let bases: Vec<(u64, f64)> = employees
        .iter()
        .map(|e| (e.id, e.salary_base.max(0.0)))
        .collect();

    store::upsert_generated(pool.get_ref(), month, &bases)
        .await
        .map_err(|e| {
            error!(error = %e, month, "Payroll generation failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    info!(month, lines = bases.len(), "Payroll month generated");

    let lines = store::find_by_month(pool.get_ref(), month)
        .await
        .map_err(|e| {
            error!(error = %e, month, "Failed to re-read generated month");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Created().json(PayrollListResponse {
        month_year: month.to_string(),
        computed: false,
        data: lines.into_iter().map(PayrollLineView::from).collect(),
    }))
}

/// Month totals for the dashboard cards.
#[utoipa::path(
    get,
    path = "/api/v1/payroll/stats",
    params(MonthQuery),
    responses(
        (status = 200, description = "Month stats", body = MonthStats),
        (status = 400, description = "Missing or malformed month"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn stats(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<MonthQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let Some(month) = query.month_year.as_deref() else {
        return Ok(bad_month());
    };
    if calc::parse_month(month).is_none() {
        return Ok(bad_month());
    }

    let stats = store::month_stats(pool.get_ref(), month).await.map_err(|e| {
        error!(error = %e, month, "Failed to compute month stats");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(stats))
}

/// Edit a pending line. Net is recomputed as base + bonus - deduction,
/// floored at zero; paid lines are immutable.
#[utoipa::path(
    patch,
    path = "/api/v1/payroll/{payroll_id}",
    request_body = UpdatePayroll,
    params(("payroll_id", Path, description = "Payroll line ID")),
    responses(
        (status = 200, description = "Updated line", body = PayrollWithEmployee),
        (status = 404, description = "Payroll line not found"),
        (status = 409, description = "Line already paid"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn update(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdatePayroll>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let payroll_id = path.into_inner();

    let current = store::find_with_employee(pool.get_ref(), payroll_id)
        .await
        .map_err(|e| {
            error!(error = %e, payroll_id, "Failed to fetch payroll line");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let Some(current) = current else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Payroll line not found"
        })));
    };

    if current.status.parse::<PayStatus>().ok() == Some(PayStatus::Paid) {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Payroll line is already paid and can no longer be edited"
        })));
    }

    let base = body.base_amount.unwrap_or(current.base_amount);
    let bonus = body.bonus_amount.unwrap_or(current.bonus_amount);
    let deduction = body.deduction_amount.unwrap_or(current.deduction_amount);
    let net = calc::recompute_net(base, bonus, deduction);

    store::update_amounts(pool.get_ref(), payroll_id, base, bonus, deduction, net)
        .await
        .map_err(|e| {
            error!(error = %e, payroll_id, "Failed to update payroll line");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let updated = store::find_with_employee(pool.get_ref(), payroll_id)
        .await
        .map_err(|e| {
            error!(error = %e, payroll_id, "Failed to re-read payroll line");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    match updated {
        Some(line) => Ok(HttpResponse::Ok().json(line)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Payroll line not found"
        }))),
    }
}

/// Pay transition plus best-effort publish of the employee-visible copy.
/// Paying an already-paid line is a no-op that returns the current state.
#[utoipa::path(
    post,
    path = "/api/v1/payroll/{payroll_id}/pay",
    params(("payroll_id", Path, description = "Payroll line ID")),
    responses(
        (status = 200, description = "Line is paid", body = PayResponse),
        (status = 404, description = "Payroll line not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn pay(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    publisher: web::Data<Publisher>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let payroll_id = path.into_inner();

    let transitioned = store::mark_paid(pool.get_ref(), payroll_id)
        .await
        .map_err(|e| {
            error!(error = %e, payroll_id, "Pay transition failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let line = store::find_with_employee(pool.get_ref(), payroll_id)
        .await
        .map_err(|e| {
            error!(error = %e, payroll_id, "Failed to fetch paid line");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let Some(line) = line else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Payroll line not found"
        })));
    };

    if transitioned == 0 {
        // Already paid before this call; nothing to publish again.
        return Ok(HttpResponse::Ok().json(PayResponse {
            data: line,
            published: None,
        }));
    }

    let snapshot = PayrollSnapshot::from(&line);
    let published = publisher.publish(&snapshot).await;
    if !published {
        warn!(
            payroll_id,
            employee_id = line.employee_id,
            "Paid, but the employee-visible copy could not be delivered"
        );
    }

    Ok(HttpResponse::Ok().json(PayResponse {
        data: line,
        published: Some(published),
    }))
}

/// Published payroll inbox of the calling employee, newest month first.
#[utoipa::path(
    get,
    path = "/api/v1/my/payroll",
    responses(
        (status = 200, description = "Published payroll lines", body = [UserPayroll]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn my_payroll(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let rows = sqlx::query_as::<_, UserPayroll>(
        r#"
        SELECT id, employee_id, month_year, payroll_id, emp_code, full_name, department,
               base_amount, bonus_amount, deduction_amount, net_amount, status, paid_at,
               late_minutes, absent_days, paid_leave_days, unpaid_leave_days, workday_count
        FROM user_payrolls
        WHERE employee_id = ?
        ORDER BY month_year DESC
        "#,
    )
    .bind(employee_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch payroll inbox");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(rows))
}
