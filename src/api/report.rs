use actix_web::{HttpResponse, web};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::core::aggregate::{DayCounts, LedgerRow, aggregate};
use crate::core::payroll::{SalaryBreakdown, SalaryProfile, compute_salary};
use crate::error::ApiError;
use crate::model::identity::{IDENTITY_COLUMNS, Identity};
use crate::model::role::Role;

#[derive(Deserialize, IntoParams)]
pub struct MonthlyReportQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReportRow {
    pub employee_id: u64,
    pub name: String,
    pub emp_code: String,
    pub designation: Option<String>,
    pub department: String,

    pub present_days: u32,
    pub absent_days: u32,
    pub half_days: u32,
    pub late_markings: u32,

    #[serde(flatten)]
    pub salary: SalaryBreakdown,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReportRow {
    pub employee_id: u64,
    pub name: String,
    pub emp_code: String,
    pub designation: Option<String>,
    pub department: String,

    pub present_days: u32,
    pub absent_days: u32,
    pub half_days: u32,
    pub late_markings: u32,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSalary {
    #[schema(example = 1001)]
    pub employee_id: u64,
    pub basic_salary: Option<f64>,
    pub special_allowance: Option<f64>,
    pub conveyance: Option<f64>,
    pub epf: Option<bool>,
    pub esic: Option<bool>,
    pub paid_leaves: Option<u32>,
}

/// Active employees and supervisors: everyone whose attendance is tracked.
async fn tracked_identities(pool: &MySqlPool) -> Result<Vec<Identity>, ApiError> {
    let rows = sqlx::query_as::<_, Identity>(&format!(
        "SELECT {IDENTITY_COLUMNS} FROM identities \
         WHERE is_active = 1 AND role_id IN (?, ?) ORDER BY name"
    ))
    .bind(Role::Supervisor.id())
    .bind(Role::Employee.id())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Bounded range scan over the ledger, already restricted to tracked roles.
async fn ledger_rows(
    pool: &MySqlPool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<LedgerRow>, ApiError> {
    let rows: Vec<(u64, String, bool)> = sqlx::query_as(
        "SELECT a.employee_id, a.status, a.is_late \
         FROM attendance a \
         JOIN identities e ON e.id = a.employee_id \
         WHERE e.is_active = 1 AND e.role_id IN (?, ?) AND a.date BETWEEN ? AND ?",
    )
    .bind(Role::Supervisor.id())
    .bind(Role::Employee.id())
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(employee_id, status, is_late)| LedgerRow {
            employee_id,
            status,
            is_late,
        })
        .collect())
}

fn department_of(identity: &Identity) -> String {
    identity
        .department
        .clone()
        .or_else(|| identity.company.clone())
        .unwrap_or_else(|| "-".to_string())
}

/// Monthly attendance + prorated salary report
#[utoipa::path(
    get,
    path = "/api/reports/attendance-monthly",
    params(MonthlyReportQuery),
    responses(
        (status = 200, description = "One row per active employee/supervisor", body = [MonthlyReportRow]),
        (status = 400, description = "year and month query parameters are required"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn monthly_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<MonthlyReportQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let (Some(year), Some(month)) = (query.year, query.month) else {
        return Err(ApiError::validation(
            "year and month query parameters are required",
        ));
    };

    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ApiError::validation("Invalid year or month parameters"))?;
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| ApiError::validation("Invalid year or month parameters"))?;

    let identities = tracked_identities(pool.get_ref()).await?;
    let counts = aggregate(&ledger_rows(pool.get_ref(), start, end).await?);

    // Identities with no ledger rows still report: all-zero counts.
    let report: Vec<MonthlyReportRow> = identities
        .iter()
        .map(|identity| {
            let c = counts.get(&identity.id).copied().unwrap_or_default();
            MonthlyReportRow {
                employee_id: identity.id,
                name: identity.name.clone(),
                emp_code: identity.emp_code.clone(),
                designation: identity.designation.clone(),
                department: department_of(identity),
                present_days: c.present_days,
                absent_days: c.absent_days,
                half_days: c.half_days,
                late_markings: c.late_markings,
                salary: compute_salary(&SalaryProfile::from(identity), &c),
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(report))
}

/// Attendance counts over an arbitrary date range
#[utoipa::path(
    get,
    path = "/api/reports/attendance-summary",
    params(SummaryReportQuery),
    responses(
        (status = 200, description = "One row per active employee/supervisor", body = [SummaryReportRow]),
        (status = 400, description = "startDate and endDate query parameters are required"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn summary_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<SummaryReportQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let (Some(start), Some(end)) = (query.start_date, query.end_date) else {
        return Err(ApiError::validation(
            "startDate and endDate query parameters are required",
        ));
    };

    let identities = tracked_identities(pool.get_ref()).await?;
    let counts = aggregate(&ledger_rows(pool.get_ref(), start, end).await?);

    let report: Vec<SummaryReportRow> = identities
        .iter()
        .map(|identity| {
            let c: DayCounts = counts.get(&identity.id).copied().unwrap_or_default();
            SummaryReportRow {
                employee_id: identity.id,
                name: identity.name.clone(),
                emp_code: identity.emp_code.clone(),
                designation: identity.designation.clone(),
                department: department_of(identity),
                present_days: c.present_days,
                absent_days: c.absent_days,
                half_days: c.half_days,
                late_markings: c.late_markings,
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(report))
}

/// Update an employee's salary-component configuration
#[utoipa::path(
    put,
    path = "/api/reports/salary",
    request_body = UpdateSalary,
    responses(
        (status = 200, description = "Salary updated"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn update_salary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<UpdateSalary>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let result = sqlx::query(
        "UPDATE identities SET \
             basic_salary = COALESCE(?, basic_salary), \
             special_allowance = COALESCE(?, special_allowance), \
             conveyance = COALESCE(?, conveyance), \
             epf = COALESCE(?, epf), \
             esic = COALESCE(?, esic), \
             paid_leaves = COALESCE(?, paid_leaves) \
         WHERE id = ? AND role_id IN (?, ?)",
    )
    .bind(payload.basic_salary)
    .bind(payload.special_allowance)
    .bind(payload.conveyance)
    .bind(payload.epf)
    .bind(payload.esic)
    .bind(payload.paid_leaves)
    .bind(payload.employee_id)
    .bind(Role::Supervisor.id())
    .bind(Role::Employee.id())
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Employee not found"));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Salary updated successfully" })))
}
