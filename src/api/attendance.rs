use std::str::FromStr;

use actix_web::{HttpResponse, web};
use chrono::{Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::core::lateness::{late_by, parse_hhmm};
use crate::error::ApiError;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, hhmm_option};
use crate::model::role::Role;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendance {
    #[schema(example = 1001)]
    pub employee_id: u64,

    #[schema(example = "2024-03-01", value_type = String, format = "date")]
    pub date: NaiveDate,

    /// "HH:mm"; defaults to the current wall-clock time for Present marks.
    #[schema(example = "09:02")]
    pub time_in: Option<String>,

    #[schema(example = "18:00")]
    pub time_out: Option<String>,

    #[schema(example = "Present")]
    pub status: String,

    /// Explicit override; computed from the assigned shift start when absent.
    pub is_late: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CorrectAttendance {
    pub status: Option<String>,
    pub time_in: Option<String>,
    pub time_out: Option<String>,
    pub is_late: Option<bool>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceQuery {
    /// Single day; ignored when a range is given.
    pub date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Ledger row hydrated with employee and recorder details for display.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRow {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "John Doe")]
    pub employee_name: String,
    #[schema(example = "EMP4821")]
    pub emp_code: String,
    pub designation: Option<String>,

    #[schema(example = "09:00", value_type = Option<String>)]
    #[serde(with = "hhmm_option")]
    pub shift_start: Option<NaiveTime>,

    #[schema(example = "2024-03-01", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "09:02", value_type = Option<String>)]
    #[serde(with = "hhmm_option")]
    pub time_in: Option<NaiveTime>,

    #[schema(example = "18:00", value_type = Option<String>)]
    #[serde(with = "hhmm_option")]
    pub time_out: Option<NaiveTime>,

    #[schema(example = "Present")]
    pub status: String,
    pub is_late: bool,

    pub recorded_by: Option<u64>,
    pub recorded_by_name: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceResponse {
    pub record: AttendanceRow,
    /// Minutes past the grace window; present only for late markings.
    #[schema(example = 6)]
    pub late_by_minutes: Option<i64>,
}

const ROW_SELECT: &str = "SELECT a.id, a.employee_id, e.name AS employee_name, e.emp_code, \
     e.designation, e.shift_start, a.date, a.time_in, a.time_out, a.status, a.is_late, \
     a.recorded_by, r.name AS recorded_by_name \
     FROM attendance a \
     JOIN identities e ON e.id = a.employee_id \
     LEFT JOIN identities r ON r.id = a.recorded_by";

fn parse_status(raw: &str) -> Result<AttendanceStatus, ApiError> {
    AttendanceStatus::from_str(raw)
        .map_err(|_| ApiError::validation("Invalid status. Must be Present, Absent, or Halfday"))
}

fn parse_opt_time(raw: &Option<String>) -> Result<Option<NaiveTime>, ApiError> {
    match raw.as_deref() {
        Some(s) if !s.is_empty() => Ok(Some(parse_hhmm(s)?)),
        _ => Ok(None),
    }
}

async fn fetch_row(pool: &MySqlPool, id: u64) -> Result<Option<AttendanceRow>, ApiError> {
    let row = sqlx::query_as::<_, AttendanceRow>(&format!("{ROW_SELECT} WHERE a.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Mark (or re-mark) one employee's attendance for a day
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = MarkAttendance,
    responses(
        (status = 200, description = "Attendance upserted", body = MarkAttendanceResponse),
        (status = 400, description = "Invalid status or time"),
        (status = 403, description = "Caller may not record attendance"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<MarkAttendance>,
) -> Result<HttpResponse, ApiError> {
    auth.require_marker()?;

    let status = parse_status(&payload.status)?;

    // The employee must resolve to an active identity.
    let employee: Option<(Option<NaiveTime>,)> = sqlx::query_as(
        "SELECT shift_start FROM identities \
         WHERE id = ? AND is_active = 1 AND role_id IN (?, ?)",
    )
    .bind(payload.employee_id)
    .bind(Role::Supervisor.id())
    .bind(Role::Employee.id())
    .fetch_optional(pool.get_ref())
    .await?;

    let Some((shift_start,)) = employee else {
        return Err(ApiError::not_found("Employee not found"));
    };

    let time_out = parse_opt_time(&payload.time_out)?;

    // Absent/Halfday carry no arrival time and can never be late.
    let (time_in, is_late, late_minutes) = match status {
        AttendanceStatus::Absent | AttendanceStatus::Halfday => (None, false, None),
        AttendanceStatus::Present => {
            let effective = match parse_opt_time(&payload.time_in)? {
                Some(t) => t,
                None => Local::now().time(),
            };
            let computed = shift_start
                .and_then(|assigned| late_by(assigned, effective, config.attendance_grace_minutes));
            let is_late = payload.is_late.unwrap_or(computed.is_some());
            (Some(effective), is_late, computed)
        }
    };

    // Upsert against the (employee_id, date) unique key: the ledger never
    // holds two rows for one day, the last writer wins.
    sqlx::query(
        "INSERT INTO attendance (employee_id, date, time_in, time_out, status, is_late, recorded_by) \
         VALUES (?, ?, ?, ?, ?, ?, ?) \
         ON DUPLICATE KEY UPDATE \
             time_in = VALUES(time_in), time_out = VALUES(time_out), status = VALUES(status), \
             is_late = VALUES(is_late), recorded_by = VALUES(recorded_by)",
    )
    .bind(payload.employee_id)
    .bind(payload.date)
    .bind(time_in)
    .bind(time_out)
    .bind(status.to_string())
    .bind(is_late)
    .bind(auth.user_id)
    .execute(pool.get_ref())
    .await?;

    let row: AttendanceRow = sqlx::query_as(&format!(
        "{ROW_SELECT} WHERE a.employee_id = ? AND a.date = ?"
    ))
    .bind(payload.employee_id)
    .bind(payload.date)
    .fetch_one(pool.get_ref())
    .await?;

    if is_late {
        tracing::info!(
            employee_id = payload.employee_id,
            date = %payload.date,
            late_by = ?late_minutes,
            "late arrival recorded"
        );
    }

    Ok(HttpResponse::Ok().json(MarkAttendanceResponse {
        record: row,
        late_by_minutes: if is_late { late_minutes } else { None },
    }))
}

/// List attendance for a day or range, scoped by role
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Hydrated ledger rows", body = [AttendanceRow]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceQuery>,
) -> Result<HttpResponse, ApiError> {
    let (start, end) = match (query.start_date, query.end_date, query.date) {
        (Some(s), Some(e), _) => (s, e),
        (None, None, Some(d)) => (d, d),
        (None, None, None) => {
            let today = Local::now().date_naive();
            (today, today)
        }
        _ => {
            return Err(ApiError::validation(
                "Provide date, or both startDate and endDate",
            ));
        }
    };

    let mut sql = format!("{ROW_SELECT} WHERE a.date BETWEEN ? AND ?");
    match auth.role {
        // Employees see themselves, supervisors their assignees.
        Role::Employee => sql.push_str(" AND a.employee_id = ?"),
        Role::Supervisor => sql.push_str(" AND e.supervisor_id = ?"),
        Role::Hr | Role::Admin => {}
    }
    sql.push_str(" ORDER BY a.date, a.employee_id");

    let mut q = sqlx::query_as::<_, AttendanceRow>(&sql).bind(start).bind(end);
    if matches!(auth.role, Role::Employee | Role::Supervisor) {
        q = q.bind(auth.user_id);
    }

    let rows = q.fetch_all(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Correct an existing attendance record
#[utoipa::path(
    put,
    path = "/api/attendance/{id}",
    request_body = CorrectAttendance,
    params(("id" = u64, Path, description = "Attendance record id")),
    responses(
        (status = 200, description = "Updated record", body = AttendanceRow),
        (status = 403, description = "Not the assignee's supervisor"),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn correct_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<CorrectAttendance>,
) -> Result<HttpResponse, ApiError> {
    auth.require_marker()?;

    let id = path.into_inner();

    let current = sqlx::query_as::<_, AttendanceRecord>(
        "SELECT id, employee_id, date, time_in, time_out, status, is_late, recorded_by \
         FROM attendance WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| ApiError::not_found("Attendance record not found"))?;

    // Supervisors may only touch their own assignees.
    if auth.role == Role::Supervisor {
        let assigned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM identities WHERE id = ? AND supervisor_id = ?)",
        )
        .bind(current.employee_id)
        .bind(auth.user_id)
        .fetch_one(pool.get_ref())
        .await?;

        if !assigned {
            return Err(ApiError::forbidden(
                "You can only modify attendance for your assigned employees",
            ));
        }
    }

    let status = match &payload.status {
        Some(raw) => parse_status(raw)?,
        None => parse_status(&current.status)?,
    };

    let mut time_in = match &payload.time_in {
        Some(_) => parse_opt_time(&payload.time_in)?,
        None => current.time_in,
    };
    let time_out = match &payload.time_out {
        Some(_) => parse_opt_time(&payload.time_out)?,
        None => current.time_out,
    };
    let mut is_late = payload.is_late.unwrap_or(current.is_late);

    if matches!(status, AttendanceStatus::Absent | AttendanceStatus::Halfday) {
        time_in = None;
        is_late = false;
    }

    sqlx::query(
        "UPDATE attendance SET status = ?, time_in = ?, time_out = ?, is_late = ?, recorded_by = ? \
         WHERE id = ?",
    )
    .bind(status.to_string())
    .bind(time_in)
    .bind(time_out)
    .bind(is_late)
    .bind(auth.user_id)
    .bind(id)
    .execute(pool.get_ref())
    .await?;

    let updated = fetch_row(pool.get_ref(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Attendance record not found"))?;

    Ok(HttpResponse::Ok().json(updated))
}
