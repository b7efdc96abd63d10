use crate::api::attendance::{
    AttendanceView, AttendanceWithEmployee, ClockPayload, RangeQuery,
};
use crate::api::employee::{CreateEmployee, EmployeeListResponse, EmployeeQuery, EmployeeView};
use crate::api::leave_request::{CreateLeave, LeaveFilter, LeaveListResponse, LeaveResponse};
use crate::api::payroll::{
    GeneratePayroll, MonthQuery, PayResponse, PayrollLineView, PayrollListResponse, UpdatePayroll,
};
use crate::auth::handlers::{LoginResponse, MeResponse};
use crate::model::employee::Employee;
use crate::model::user_payroll::UserPayroll;
use crate::payroll::store::{MonthStats, PayrollWithEmployee};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StaffPay API",
        version = "1.0.0",
        description = r#"
## Employee management & payroll backend

This API powers a small employee management system with a payroll engine.

### 🔹 Key Features
- **Employee Management**
  - Admin-side CRUD over accounts and profiles
- **Attendance**
  - Clock-in / clock-out work sessions with optional geolocation
- **Leave Management**
  - Employee requests, admin approve/reject
- **Payroll**
  - Month generation, attendance/leave-derived deductions, pay transition
    and an employee-visible payroll inbox

### 🔐 Security
Most endpoints are protected using **JWT Bearer authentication**.
Admin-only operations check the caller's role on top of that.

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::me,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::attendance::clock_in,
        crate::api::attendance::clock_out,
        crate::api::attendance::my_attendance,
        crate::api::attendance::attendance_range,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::my_leave,

        crate::api::payroll::list_month,
        crate::api::payroll::generate,
        crate::api::payroll::stats,
        crate::api::payroll::update,
        crate::api::payroll::pay,
        crate::api::payroll::my_payroll
    ),
    components(
        schemas(
            LoginResponse,
            MeResponse,
            CreateEmployee,
            EmployeeQuery,
            EmployeeView,
            EmployeeListResponse,
            Employee,
            ClockPayload,
            RangeQuery,
            AttendanceView,
            AttendanceWithEmployee,
            CreateLeave,
            LeaveFilter,
            LeaveResponse,
            LeaveListResponse,
            MonthQuery,
            GeneratePayroll,
            UpdatePayroll,
            PayrollLineView,
            PayrollListResponse,
            PayrollWithEmployee,
            PayResponse,
            MonthStats,
            UserPayroll
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Session and profile APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Attendance", description = "Attendance tracking APIs"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Payroll", description = "Payroll APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
