use std::str::FromStr;

use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::api::notification::{clear_for_request, notify_role, notify_user};
use crate::auth::auth::AuthUser;
use crate::core::approval::{ApprovalError, ApprovalState, Decision, Stage, decide};
use crate::error::ApiError;
use crate::model::notification::NotificationKind;
use crate::model::request::{LeaveRequest, RequestStatus};
use crate::model::role::Role;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyLeave {
    #[schema(example = "2024-03-01", value_type = String, format = "date")]
    pub from_date: NaiveDate,
    #[schema(example = "2024-03-03", value_type = String, format = "date")]
    pub to_date: NaiveDate,
    #[schema(example = "personal")]
    pub reason: String,
    #[schema(example = 12)]
    pub supervisor_id: u64,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecideLeave {
    /// "Approved" or "Rejected"
    #[schema(example = "Approved")]
    pub status: String,
    pub comments: Option<String>,
}

/// Request row hydrated with employee/supervisor names for the queue views.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRow {
    pub id: u64,
    pub employee_id: u64,
    pub employee_name: String,
    pub employee_code: String,
    pub supervisor_id: u64,
    pub supervisor_name: String,

    #[schema(value_type = String, format = "date")]
    pub from_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to_date: NaiveDate,
    pub reason: String,
    pub status: String,

    pub supervisor_approved: bool,
    pub hr_approved: bool,
    pub admin_approved: bool,
    pub created_at: Option<DateTime<Utc>>,
}

const REQUEST_COLUMNS: &str = "id, employee_id, supervisor_id, from_date, to_date, reason, status, \
     supervisor_approved, hr_approved, admin_approved, \
     supervisor_comments, hr_comments, admin_comments, \
     supervisor_approved_at, hr_approved_at, admin_approved_at, \
     is_seen_by_employee, is_seen_by_supervisor, created_at";

const ROW_SELECT: &str = "SELECT l.id, l.employee_id, e.name AS employee_name, \
     e.emp_code AS employee_code, l.supervisor_id, s.name AS supervisor_name, \
     l.from_date, l.to_date, l.reason, l.status, \
     l.supervisor_approved, l.hr_approved, l.admin_approved, l.created_at \
     FROM leave_requests l \
     JOIN identities e ON e.id = l.employee_id \
     JOIN identities s ON s.id = l.supervisor_id";

async fn fetch_request(pool: &MySqlPool, id: u64) -> Result<LeaveRequest, ApiError> {
    sqlx::query_as::<_, LeaveRequest>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Leave request not found"))
}

async fn employee_name(pool: &MySqlPool, id: u64) -> Result<String, ApiError> {
    let (name,): (String,) = sqlx::query_as("SELECT name FROM identities WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(name)
}

pub fn parse_decision(raw: &str) -> Result<Decision, ApiError> {
    match RequestStatus::from_str(raw) {
        Ok(RequestStatus::Approved) => Ok(Decision::Approve),
        Ok(RequestStatus::Rejected) => Ok(Decision::Reject),
        _ => Err(ApiError::validation("status must be Approved or Rejected")),
    }
}

pub fn map_approval_error(e: ApprovalError) -> ApiError {
    match e {
        ApprovalError::OutOfTurn => ApiError::forbidden("Not your turn to act on this request"),
        ApprovalError::AlreadyProcessed => ApiError::conflict("Request already processed"),
    }
}

/// Employee submits a leave request
#[utoipa::path(
    post,
    path = "/api/leave/apply",
    request_body = ApplyLeave,
    responses(
        (status = 201, description = "Request created, pending supervisor", body = Object,
         example = json!({"message": "Leave request submitted", "status": "Pending"})),
        (status = 400, description = "Missing fields or invalid supervisor"),
        (status = 403, description = "Employees only")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn apply_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ApplyLeave>,
) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::Employee)?;

    if payload.reason.trim().is_empty() {
        return Err(ApiError::validation("reason is required"));
    }
    if payload.from_date > payload.to_date {
        return Err(ApiError::validation("fromDate cannot be after toDate"));
    }

    // The named supervisor must really be one.
    let is_supervisor: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM identities WHERE id = ? AND role_id = ? AND is_active = 1)",
    )
    .bind(payload.supervisor_id)
    .bind(Role::Supervisor.id())
    .fetch_one(pool.get_ref())
    .await?;

    if !is_supervisor {
        return Err(ApiError::validation("Invalid supervisor"));
    }

    let result = sqlx::query(
        "INSERT INTO leave_requests (employee_id, supervisor_id, from_date, to_date, reason) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(auth.user_id)
    .bind(payload.supervisor_id)
    .bind(payload.from_date)
    .bind(payload.to_date)
    .bind(payload.reason.trim())
    .execute(pool.get_ref())
    .await?;

    let request_id = result.last_insert_id();

    let name = employee_name(pool.get_ref(), auth.user_id).await?;
    notify_user(
        pool.get_ref(),
        payload.supervisor_id,
        NotificationKind::Leave,
        &format!(
            "{name} applied for leave ({} to {})",
            payload.from_date, payload.to_date
        ),
        request_id,
    )
    .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Leave request submitted",
        "status": RequestStatus::Pending.to_string(),
        "id": request_id
    })))
}

async fn decide_leave(
    auth: &AuthUser,
    pool: &MySqlPool,
    id: u64,
    stage: Stage,
    body: &DecideLeave,
) -> Result<HttpResponse, ApiError> {
    let decision = parse_decision(&body.status)?;

    let request = fetch_request(pool, id).await?;

    // Supervisors only decide requests routed to them.
    if stage == Stage::Supervisor && request.supervisor_id != auth.user_id {
        return Err(ApiError::forbidden(
            "You can only decide requests of your assigned employees",
        ));
    }

    let state = ApprovalState::parse(
        &request.status,
        request.supervisor_approved,
        request.hr_approved,
        request.admin_approved,
    )
    .ok_or(ApiError::Internal)?;

    let transition = decide(&state, stage, decision).map_err(map_approval_error)?;

    let decided_at: Option<DateTime<Utc>> = transition.approves_stage.then(Utc::now);
    let comments = body.comments.as_deref();

    // Conditional update: succeeds only while the request is still in the
    // state the decision was computed from.
    let sql = match stage {
        Stage::Supervisor => {
            "UPDATE leave_requests SET status = ?, supervisor_approved = ?, \
             supervisor_comments = ?, supervisor_approved_at = ? \
             WHERE id = ? AND status = 'Pending' AND supervisor_approved = 0"
        }
        Stage::Hr => {
            "UPDATE leave_requests SET status = ?, hr_approved = ?, \
             hr_comments = ?, hr_approved_at = ? \
             WHERE id = ? AND status = 'Pending' AND supervisor_approved = 1 AND hr_approved = 0"
        }
        Stage::Admin => {
            "UPDATE leave_requests SET status = ?, admin_approved = ?, \
             admin_comments = ?, admin_approved_at = ? \
             WHERE id = ? AND status = 'Pending' AND hr_approved = 1 AND admin_approved = 0"
        }
    };

    let result = sqlx::query(sql)
        .bind(transition.new_status.to_string())
        .bind(transition.approves_stage)
        .bind(comments)
        .bind(decided_at)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        // Lost a race: someone else decided this stage first.
        return Err(ApiError::conflict("Request already processed"));
    }

    tracing::info!(
        request_id = id,
        stage = ?transition.stage,
        decision = ?transition.decision,
        terminal = transition.is_terminal(),
        "leave request transition applied"
    );

    let name = employee_name(pool, request.employee_id).await?;
    let window = format!("{} to {}", request.from_date, request.to_date);
    let outcome = if decision == Decision::Approve {
        "approved"
    } else {
        "rejected"
    };
    let stage_label = match stage {
        Stage::Supervisor => "your supervisor",
        Stage::Hr => "HR",
        Stage::Admin => "Admin",
    };

    if transition.clear_notifications {
        clear_for_request(pool, NotificationKind::Leave, id).await?;
    }

    notify_user(
        pool,
        request.employee_id,
        NotificationKind::Leave,
        &format!("Your leave request ({window}) was {outcome} by {stage_label}"),
        id,
    )
    .await?;

    if let Some(role) = transition.notify_role {
        let role_label = match role {
            Role::Hr => "Supervisor approved",
            _ => "HR approved",
        };
        notify_role(
            pool,
            role,
            NotificationKind::Leave,
            &format!("{role_label} leave request of {name} ({window})"),
            id,
        )
        .await?;
    }

    let updated = fetch_request(pool, id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Leave request {outcome}"),
        "request": updated
    })))
}

/// Supervisor-stage decision
#[utoipa::path(
    put,
    path = "/api/leave/update/{id}",
    request_body = DecideLeave,
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Decision applied"),
        (status = 403, description = "Out of turn or not your assignee"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn supervisor_decide(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<DecideLeave>,
) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::Supervisor)?;
    decide_leave(&auth, pool.get_ref(), path.into_inner(), Stage::Supervisor, &body).await
}

/// HR-stage decision
#[utoipa::path(
    put,
    path = "/api/leave/hr/update/{id}",
    request_body = DecideLeave,
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Decision applied"),
        (status = 403, description = "Out of turn"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn hr_decide(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<DecideLeave>,
) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::Hr)?;
    decide_leave(&auth, pool.get_ref(), path.into_inner(), Stage::Hr, &body).await
}

/// Admin-stage decision (terminal)
#[utoipa::path(
    put,
    path = "/api/leave/admin/update/{id}",
    request_body = DecideLeave,
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Decision applied"),
        (status = 403, description = "Out of turn"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn admin_decide(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<DecideLeave>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    decide_leave(&auth, pool.get_ref(), path.into_inner(), Stage::Admin, &body).await
}

/// Supervisor queue: own requests awaiting the supervisor stage
#[utoipa::path(
    get,
    path = "/api/leave/supervisor",
    responses((status = 200, body = [LeaveRow])),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn supervisor_queue(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::Supervisor)?;

    let rows = sqlx::query_as::<_, LeaveRow>(&format!(
        "{ROW_SELECT} WHERE l.supervisor_id = ? AND l.status = 'Pending' \
         AND l.supervisor_approved = 0 ORDER BY l.created_at DESC"
    ))
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// HR queue: supervisor-approved, not yet HR-decided
#[utoipa::path(
    get,
    path = "/api/leave/hr",
    responses((status = 200, body = [LeaveRow])),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn hr_queue(auth: AuthUser, pool: web::Data<MySqlPool>) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::Hr)?;

    let rows = sqlx::query_as::<_, LeaveRow>(&format!(
        "{ROW_SELECT} WHERE l.status = 'Pending' AND l.supervisor_approved = 1 \
         AND l.hr_approved = 0 ORDER BY l.created_at DESC"
    ))
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Admin queue: HR-approved, awaiting the final stage
#[utoipa::path(
    get,
    path = "/api/leave/admin",
    responses((status = 200, body = [LeaveRow])),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn admin_queue(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let rows = sqlx::query_as::<_, LeaveRow>(&format!(
        "{ROW_SELECT} WHERE l.status = 'Pending' AND l.hr_approved = 1 \
         AND l.admin_approved = 0 ORDER BY l.created_at DESC"
    ))
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// The caller's own leave history
#[utoipa::path(
    get,
    path = "/api/leave/employee",
    responses((status = 200, body = [LeaveRow])),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn employee_history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let rows = sqlx::query_as::<_, LeaveRow>(&format!(
        "{ROW_SELECT} WHERE l.employee_id = ? ORDER BY l.created_at DESC"
    ))
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Supervisor acknowledges a request appearing in their queue
#[utoipa::path(
    put,
    path = "/api/leave/seen/{id}",
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Marked as seen"),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn mark_seen(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::Supervisor)?;

    let result =
        sqlx::query("UPDATE leave_requests SET is_seen_by_supervisor = 1 WHERE id = ? AND supervisor_id = ?")
            .bind(path.into_inner())
            .bind(auth.user_id)
            .execute(pool.get_ref())
            .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Leave request not found"));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Marked as seen" })))
}
