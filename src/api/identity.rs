use actix_web::{HttpResponse, web};
use chrono::{NaiveTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::auth::password::hash_password;
use crate::error::ApiError;
use crate::model::attendance::hhmm_option;
use crate::model::identity::{IDENTITY_COLUMNS, Identity};
use crate::model::role::Role;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterIdentity {
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "employee")]
    pub role: Role,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub designation: Option<String>,
    pub department: Option<String>,

    #[schema(example = "09:00", value_type = Option<String>)]
    #[serde(default, with = "hhmm_option")]
    pub shift_start: Option<NaiveTime>,
    #[schema(example = "18:00", value_type = Option<String>)]
    #[serde(default, with = "hhmm_option")]
    pub shift_end: Option<NaiveTime>,

    pub supervisor_id: Option<u64>,
    pub basic_salary: Option<f64>,
    pub special_allowance: Option<f64>,
    pub conveyance: Option<f64>,
    pub epf: Option<bool>,
    pub esic: Option<bool>,
    pub paid_leaves: Option<u32>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[schema(example = "EMP4821")]
    pub emp_code: String,
    /// Initial password, returned exactly once.
    pub password: String,
    pub message: String,
}

/// Compact identity view for dropdowns and the attendance page.
#[derive(Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySummary {
    pub id: u64,
    pub emp_code: String,
    pub name: String,
    pub company: Option<String>,
    pub designation: Option<String>,
    pub department: Option<String>,

    #[schema(example = "09:00", value_type = Option<String>)]
    #[serde(with = "hhmm_option")]
    pub shift_start: Option<NaiveTime>,

    pub supervisor_id: Option<u64>,
}

const SUMMARY_COLUMNS: &str =
    "id, emp_code, name, company, designation, department, shift_start, supervisor_id";

/// Generate a role-prefixed emp code, retrying on collisions.
async fn generate_emp_code(pool: &MySqlPool, role: Role) -> Result<String, ApiError> {
    let prefix = role.code_prefix();

    for _ in 0..6 {
        let num: u32 = rand::rng().random_range(1000..10000);
        let candidate = format!("{prefix}{num}");

        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM identities WHERE emp_code = ?)")
                .bind(&candidate)
                .fetch_one(pool)
                .await?;

        if !taken {
            return Ok(candidate);
        }
    }

    // Six collisions in a row: fall back to a timestamp-derived code.
    let suffix = Utc::now().timestamp() % 1_000_000;
    Ok(format!("{prefix}{suffix}"))
}

fn generate_password() -> String {
    let num: u32 = rand::rng().random_range(100_000..1_000_000);
    format!("P{num}")
}

/// Create an identity (admin creates HR; HR creates supervisors/employees)
#[utoipa::path(
    post,
    path = "/api/identities",
    request_body = RegisterIdentity,
    responses(
        (status = 201, description = "Identity created; password returned once", body = RegisterResponse),
        (status = 400, description = "Role rules violated or invalid supervisor"),
        (status = 403, description = "Only Admin or HR may create identities")
    ),
    security(("bearer_auth" = [])),
    tag = "Identities"
)]
pub async fn register_identity(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<RegisterIdentity>,
) -> Result<HttpResponse, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("name is required"));
    }

    // Role rules: admins onboard HR, HR onboards the field roles.
    match auth.role {
        Role::Admin if payload.role != Role::Hr => {
            return Err(ApiError::validation("Admin can only create HR"));
        }
        Role::Hr if !matches!(payload.role, Role::Supervisor | Role::Employee) => {
            return Err(ApiError::validation("HR can create supervisor or employee"));
        }
        Role::Admin | Role::Hr => {}
        _ => {
            return Err(ApiError::forbidden("Only Admin or HR may create identities"));
        }
    }

    if let Some(supervisor_id) = payload.supervisor_id {
        let valid: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM identities WHERE id = ? AND role_id = ? AND is_active = 1)",
        )
        .bind(supervisor_id)
        .bind(Role::Supervisor.id())
        .fetch_one(pool.get_ref())
        .await?;

        if !valid {
            return Err(ApiError::validation("Invalid supervisor"));
        }
    }

    let emp_code = generate_emp_code(pool.get_ref(), payload.role).await?;
    let password = generate_password();
    let hash = hash_password(&password).map_err(|e| {
        tracing::error!(error = %e, "password hash failed");
        ApiError::Internal
    })?;

    sqlx::query(
        "INSERT INTO identities \
             (emp_code, name, role_id, mobile, email, company, designation, department, \
              shift_start, shift_end, basic_salary, special_allowance, conveyance, epf, esic, \
              paid_leaves, supervisor_id, password_hash, is_active) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)",
    )
    .bind(&emp_code)
    .bind(payload.name.trim())
    .bind(payload.role.id())
    .bind(&payload.mobile)
    .bind(&payload.email)
    .bind(&payload.company)
    .bind(&payload.designation)
    .bind(&payload.department)
    .bind(payload.shift_start)
    .bind(payload.shift_end)
    .bind(payload.basic_salary.unwrap_or(0.0))
    .bind(payload.special_allowance.unwrap_or(0.0))
    .bind(payload.conveyance.unwrap_or(0.0))
    .bind(payload.epf.unwrap_or(false))
    .bind(payload.esic.unwrap_or(false))
    .bind(payload.paid_leaves.unwrap_or(0))
    .bind(payload.supervisor_id)
    .bind(&hash)
    .execute(pool.get_ref())
    .await?;

    tracing::info!(%emp_code, role = payload.role.as_str(), "identity registered");

    Ok(HttpResponse::Created().json(RegisterResponse {
        emp_code,
        password,
        message: format!("{} registered successfully", payload.role.as_str()),
    }))
}

/// Active employees and supervisors (attendance page)
#[utoipa::path(
    get,
    path = "/api/identities/employees",
    responses((status = 200, body = [IdentitySummary])),
    security(("bearer_auth" = [])),
    tag = "Identities"
)]
pub async fn list_employees(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let rows = sqlx::query_as::<_, IdentitySummary>(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM identities \
         WHERE role_id IN (?, ?) AND is_active = 1 ORDER BY name"
    ))
    .bind(Role::Supervisor.id())
    .bind(Role::Employee.id())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Active supervisors (HR dropdown)
#[utoipa::path(
    get,
    path = "/api/identities/supervisors",
    responses((status = 200, body = [IdentitySummary]), (status = 403)),
    security(("bearer_auth" = [])),
    tag = "Identities"
)]
pub async fn list_supervisors(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let rows = sqlx::query_as::<_, IdentitySummary>(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM identities \
         WHERE role_id = ? AND is_active = 1 ORDER BY name"
    ))
    .bind(Role::Supervisor.id())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Resolve an employee and their supervisor linkage by emp code
#[utoipa::path(
    get,
    path = "/api/identities/employees/{emp_code}",
    params(("emp_code" = String, Path, description = "Employee code")),
    responses(
        (status = 200, description = "Employee with supervisor linkage"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Identities"
)]
pub async fn get_employee_by_code(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let emp_code = path.into_inner();

    let identity = sqlx::query_as::<_, Identity>(&format!(
        "SELECT {IDENTITY_COLUMNS} FROM identities \
         WHERE emp_code = ? AND role_id = ? AND is_active = 1"
    ))
    .bind(&emp_code)
    .bind(Role::Employee.id())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| ApiError::not_found("Employee not found"))?;

    let supervisor: Option<(u64, String)> = match identity.supervisor_id {
        Some(id) => {
            sqlx::query_as("SELECT id, name FROM identities WHERE id = ? AND is_active = 1")
                .bind(id)
                .fetch_optional(pool.get_ref())
                .await?
        }
        None => None,
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "empCode": identity.emp_code,
        "name": identity.name,
        "supervisorId": supervisor.as_ref().map(|(id, _)| id),
        "supervisorName": supervisor.as_ref().map(|(_, name)| name),
    })))
}

/// A supervisor's active assignees
#[utoipa::path(
    get,
    path = "/api/identities/assigned",
    responses((status = 200, body = [IdentitySummary]), (status = 403)),
    security(("bearer_auth" = [])),
    tag = "Identities"
)]
pub async fn assigned_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::Supervisor)?;

    let rows = sqlx::query_as::<_, IdentitySummary>(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM identities \
         WHERE role_id = ? AND supervisor_id = ? AND is_active = 1 ORDER BY name"
    ))
    .bind(Role::Employee.id())
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Soft-deactivate an identity
#[utoipa::path(
    put,
    path = "/api/identities/{id}/disable",
    params(("id" = u64, Path, description = "Identity id")),
    responses(
        (status = 200, description = "Identity disabled"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Identity not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Identities"
)]
pub async fn disable_identity(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let result = sqlx::query("UPDATE identities SET is_active = 0 WHERE id = ?")
        .bind(path.into_inner())
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Identity not found"));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Identity disabled" })))
}
