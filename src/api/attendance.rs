use crate::auth::auth::AuthUser;
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

/// Optional geolocation sent by the mobile client on clock-in/out.
#[derive(Default, Deserialize, ToSchema)]
pub struct ClockPayload {
    #[schema(example = 13.7563)]
    pub lat: Option<f64>,
    #[schema(example = 100.5018)]
    pub lng: Option<f64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct RangeQuery {
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub from: Option<NaiveDate>,
    #[schema(example = "2026-01-31", value_type = String, format = "date")]
    pub to: Option<NaiveDate>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceView {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date-time")]
    pub clock_in: NaiveDateTime,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub clock_out: Option<NaiveDateTime>,
    pub clock_in_lat: Option<f64>,
    pub clock_in_lng: Option<f64>,
    pub clock_out_lat: Option<f64>,
    pub clock_out_lng: Option<f64>,
    /// Session length, NULL while the session is still open
    pub minutes: Option<i64>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceWithEmployee {
    pub id: u64,
    pub employee_id: u64,
    pub emp_code: String,
    pub full_name: String,
    pub department: String,
    #[schema(value_type = String, format = "date-time")]
    pub clock_in: NaiveDateTime,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub clock_out: Option<NaiveDateTime>,
    pub minutes: Option<i64>,
}

/// Clock-in endpoint: opens a new work session.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/clock-in",
    request_body = ClockPayload,
    responses(
        (status = 201, description = "Clocked in", body = Object, example = json!({
            "id": 100, "message": "Clocked in"
        })),
        (status = 409, description = "Previous session still open"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn clock_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: Option<web::Json<ClockPayload>>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let payload = payload.map(|p| p.into_inner()).unwrap_or_default();

    // refuse a second open session
    let open: Option<u64> = sqlx::query_scalar(
        r#"
        SELECT id FROM attendance
        WHERE employee_id = ? AND clock_out IS NULL
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Clock-in lookup failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if open.is_some() {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Previous session has not been clocked out yet"
        })));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO attendance (employee_id, clock_in, clock_in_lat, clock_in_lng)
        VALUES (?, NOW(), ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.lat)
    .bind(payload.lng)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Clock-in failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({
        "id": result.last_insert_id(),
        "message": "Clocked in"
    })))
}

/// Clock-out endpoint: closes the latest open session.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/clock-out",
    request_body = ClockPayload,
    responses(
        (status = 200, description = "Clocked out"),
        (status = 409, description = "No open session found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn clock_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: Option<web::Json<ClockPayload>>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let payload = payload.map(|p| p.into_inner()).unwrap_or_default();

    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET clock_out = NOW(), clock_out_lat = ?, clock_out_lng = ?
        WHERE employee_id = ? AND clock_out IS NULL
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(payload.lat)
    .bind(payload.lng)
    .bind(employee_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Clock-out failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "No open session to clock out from"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Clocked out"
    })))
}

/// Own attendance rows, newest first, optionally bounded by from/to.
#[utoipa::path(
    get,
    path = "/api/v1/my/attendance",
    params(RangeQuery),
    responses(
        (status = 200, description = "Own attendance rows", body = [AttendanceView]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<RangeQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let rows = if let (Some(from), Some(to)) = (query.from, query.to) {
        sqlx::query_as::<_, AttendanceView>(
            r#"
            SELECT id, employee_id, clock_in, clock_out,
                   clock_in_lat, clock_in_lng, clock_out_lat, clock_out_lng,
                   CASE
                       WHEN clock_out IS NULL THEN NULL
                       ELSE TIMESTAMPDIFF(MINUTE, clock_in, clock_out)
                   END AS minutes
            FROM attendance
            WHERE employee_id = ? AND DATE(clock_in) BETWEEN ? AND ?
            ORDER BY id DESC
            "#,
        )
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool.get_ref())
        .await
    } else {
        sqlx::query_as::<_, AttendanceView>(
            r#"
            SELECT id, employee_id, clock_in, clock_out,
                   clock_in_lat, clock_in_lng, clock_out_lat, clock_out_lng,
                   CASE
                       WHEN clock_out IS NULL THEN NULL
                       ELSE TIMESTAMPDIFF(MINUTE, clock_in, clock_out)
                   END AS minutes
            FROM attendance
            WHERE employee_id = ?
            ORDER BY id DESC
            LIMIT 100
            "#,
        )
        .bind(employee_id)
        .fetch_all(pool.get_ref())
        .await
    }
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch attendance");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Admin range query over everyone's attendance, joined with employee info.
#[utoipa::path(
    get,
    path = "/api/v1/attendance/range",
    params(RangeQuery),
    responses(
        (status = 200, description = "Attendance rows in range", body = [AttendanceWithEmployee]),
        (status = 400, description = "Missing from/to"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_range(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<RangeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let (Some(from), Some(to)) = (query.from, query.to) else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "from and to are required (YYYY-MM-DD)"
        })));
    };

    let rows = sqlx::query_as::<_, AttendanceWithEmployee>(
        r#"
        SELECT a.id, a.employee_id, e.emp_code, e.full_name, e.department,
               a.clock_in, a.clock_out,
               CASE
                   WHEN a.clock_out IS NULL THEN NULL
                   ELSE TIMESTAMPDIFF(MINUTE, a.clock_in, a.clock_out)
               END AS minutes
        FROM attendance a
        JOIN employees e ON e.id = a.employee_id
        WHERE DATE(a.clock_in) BETWEEN ? AND ?
        ORDER BY a.clock_in DESC, a.id DESC
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch attendance range");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(rows))
}
