use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "user_id": 10,
        "emp_code": "EMP-001",
        "full_name": "Somchai Jaidee",
        "department": "Engineering",
        "position_title": "Backend Developer",
        "salary_base": 30000.0,
        "start_date": "2024-01-01",
        "work_hours_per_day": 8.0
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 10)]
    pub user_id: u64,

    #[schema(example = "EMP-001")]
    pub emp_code: String,

    #[schema(example = "Somchai Jaidee")]
    pub full_name: String,

    #[schema(example = "Engineering")]
    pub department: String,

    #[schema(example = "Backend Developer", nullable = true)]
    pub position_title: Option<String>,

    #[schema(example = 30000.0)]
    pub salary_base: f64,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,

    #[schema(example = 8.0)]
    pub work_hours_per_day: f64,
}
