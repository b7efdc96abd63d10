use crate::{
    auth::{auth::AuthUser, handlers::is_email_available, password::hash_password},
    utils::db_utils::{build_update_sql, execute_update},
    utils::{email_cache, email_filter},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

/// Default credential for accounts created by an admin; employees are
/// expected to change it on first login.
const DEFAULT_PASSWORD: &str = "User@123";

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    /// Derived from emp_code when omitted
    #[schema(example = "somchai@company.local", format = "email", value_type = String)]
    pub email: Option<String>,
    #[schema(example = "EMP-001")]
    pub emp_code: String,
    #[schema(example = "Somchai Jaidee")]
    pub full_name: String,
    #[schema(example = "Engineering")]
    pub department: String,
    #[schema(example = "Backend Developer")]
    pub position_title: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = 30000.0)]
    pub salary_base: Option<f64>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub department: Option<String>,
    pub search: Option<String>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct EmployeeView {
    pub id: u64,
    pub user_id: u64,
    pub emp_code: String,
    pub full_name: String,
    pub email: String,
    pub status: String,
    pub department: String,
    pub position_title: Option<String>,
    pub salary_base: f64,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<EmployeeView>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

const EMPLOYEE_VIEW_SELECT: &str = r#"
    SELECT e.id, e.user_id, e.emp_code, e.full_name, u.email, u.status,
           e.department, e.position_title, e.salary_base, e.start_date
    FROM employees e
    JOIN users u ON u.id = e.user_id
"#;

/// Create Employee (user account + profile in one transaction)
#[utoipa::path(
    post,
    path = "/api/v1/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Object, example = json!({
            "id": 12, "employee_id": 7, "email": "somchai@company.local"
        })),
        (status = 400, description = "Missing required fields"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email or employee code already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    if payload.full_name.trim().is_empty()
        || payload.department.trim().is_empty()
        || payload.emp_code.trim().is_empty()
    {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "emp_code, full_name and department are required"
        })));
    }

    let email = payload
        .email
        .clone()
        .unwrap_or_else(|| format!("{}@company.local", payload.emp_code.to_lowercase()));

    if !is_email_available(&email, pool.get_ref()).await {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Email already taken"
        })));
    }

    let hashed = hash_password(payload.password.as_deref().unwrap_or(DEFAULT_PASSWORD));

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, "Failed to open transaction");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let user_result = sqlx::query(
        r#"
        INSERT INTO users (role_id, email, password_hash, full_name, status)
        VALUES (2, ?, ?, ?, 'active')
        "#,
    )
    .bind(&email)
    .bind(&hashed)
    .bind(&payload.full_name)
    .execute(&mut *tx)
    .await;

    let user_id = match user_result {
        Ok(r) => r.last_insert_id(),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Email already taken"
                    })));
                }
            }
            error!(error = %e, "Failed to create user account");
            return Err(ErrorInternalServerError("Internal Server Error"));
        }
    };

    let employee_result = sqlx::query(
        r#"
        INSERT INTO employees
            (user_id, emp_code, full_name, department, position_title, start_date, salary_base)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(&payload.emp_code)
    .bind(&payload.full_name)
    .bind(&payload.department)
    .bind(&payload.position_title)
    .bind(payload.start_date)
    .bind(payload.salary_base.unwrap_or(0.0).max(0.0))
    .execute(&mut *tx)
    .await;

    let employee_id = match employee_result {
        Ok(r) => r.last_insert_id(),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Employee code already exists"
                    })));
                }
            }
            error!(error = %e, "Failed to create employee profile");
            return Err(ErrorInternalServerError("Internal Server Error"));
        }
    };

    tx.commit().await.map_err(|e| {
        error!(error = %e, "Failed to commit employee creation");
        ErrorInternalServerError("Internal Server Error")
    })?;

    // keep the availability fast path warm
    email_filter::insert(&email);
    email_cache::mark_taken(&email).await;

    Ok(HttpResponse::Created().json(json!({
        "id": user_id,
        "employee_id": employee_id,
        "email": email
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut where_sql = String::from(" WHERE u.role_id = 2");
    let mut args: Vec<String> = Vec::new();

    if let Some(department) = &query.department {
        where_sql.push_str(" AND e.department = ?");
        args.push(department.clone());
    }

    if let Some(search) = &query.search {
        where_sql.push_str(" AND (e.full_name LIKE ? OR u.email LIKE ? OR e.emp_code LIKE ?)");
        let like = format!("%{}%", search);
        args.push(like.clone());
        args.push(like.clone());
        args.push(like);
    }

    // ---------- total count ----------
    let count_sql = format!(
        "SELECT COUNT(*) FROM employees e JOIN users u ON u.id = e.user_id{}",
        where_sql
    );
    debug!(sql = %count_sql, "Counting employees");

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = count_q.bind(arg.clone());
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count employees");
        ErrorInternalServerError("Database error")
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "{EMPLOYEE_VIEW_SELECT}{} ORDER BY e.id DESC LIMIT ? OFFSET ?",
        where_sql
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

    let mut data_q = sqlx::query_as::<_, EmployeeView>(&data_sql);
    for arg in args {
        data_q = data_q.bind(arg);
    }

    let employees = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch employees");
            ErrorInternalServerError("Database error")
        })?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = EmployeeView),
        (status = 404, description = "Employee not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employee_id = path.into_inner();

    let sql = format!("{EMPLOYEE_VIEW_SELECT} WHERE e.id = ?");
    let employee = sqlx::query_as::<_, EmployeeView>(&sql)
        .bind(employee_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to fetch employee");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match employee {
        Some(emp) => Ok(HttpResponse::Ok().json(emp)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        }))),
    }
}

/// Columns an admin may patch on the profile; everything else is a 400.
const UPDATABLE_COLUMNS: &[&str] = &[
    "emp_code",
    "full_name",
    "department",
    "position_title",
    "salary_base",
    "start_date",
    "work_hours_per_day",
];

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Employee updated successfully"),
        (status = 400, description = "Unknown field in payload"),
        (status = 404, description = "Employee not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employee_id = path.into_inner();

    let update = build_update_sql("employees", &body, UPDATABLE_COLUMNS, "id", employee_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee updated successfully"
    })))
}

/// Delete Employee (profile and account together)
#[utoipa::path(
    delete,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Employee has dependent records"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employee_id = path.into_inner();

    let account: Option<(u64, String)> = sqlx::query_as(
        r#"
        SELECT u.id, u.email
        FROM employees e
        JOIN users u ON u.id = e.user_id
        WHERE e.id = ?
        "#,
    )
    .bind(employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to look up employee");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let Some((user_id, email)) = account else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    };

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, "Failed to open transaction");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let deletion = async {
        sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(employee_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
    }
    .await;

    match deletion {
        Ok(_) => {
            tx.commit().await.map_err(|e| {
                error!(error = %e, "Failed to commit employee deletion");
                ErrorInternalServerError("Internal Server Error")
            })?;

            // the address is free again
            email_filter::remove(&email);
            email_cache::clear(&email).await;

            Ok(HttpResponse::Ok().json(json!({
                "message": "Successfully deleted"
            })))
        }
        Err(e) => {
            // FK violations mean attendance/leave/payroll rows reference this
            // employee; deletion is refused rather than cascaded.
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Employee has dependent records (attendance, leave or payroll)"
                    })));
                }
            }
            error!(error = %e, employee_id, "Failed to delete employee");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}
