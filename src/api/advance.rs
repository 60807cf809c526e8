use actix_web::{HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::api::leave::{map_approval_error, parse_decision};
use crate::api::notification::{clear_for_request, notify_role, notify_user};
use crate::auth::auth::AuthUser;
use crate::core::approval::{ApprovalState, Decision, Stage, decide};
use crate::error::ApiError;
use crate::model::notification::NotificationKind;
use crate::model::request::{AdvanceRequest, RequestStatus};
use crate::model::role::Role;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyAdvance {
    #[schema(example = 5000.0)]
    pub amount: f64,
    #[schema(example = "medical expenses")]
    pub reason: String,
    #[schema(example = 12)]
    pub supervisor_id: u64,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecideAdvance {
    /// "Approved" or "Rejected"
    #[schema(example = "Approved")]
    pub status: String,
    pub comments: Option<String>,
    /// HR may sanction a different amount than requested.
    #[schema(example = 4000.0)]
    pub modified_amount: Option<f64>,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceRow {
    pub id: u64,
    pub employee_id: u64,
    pub employee_name: String,
    pub employee_code: String,
    pub supervisor_id: u64,
    pub supervisor_name: String,

    pub amount: f64,
    pub modified_amount: Option<f64>,
    pub reason: String,
    pub status: String,

    pub supervisor_approved: bool,
    pub hr_approved: bool,
    pub admin_approved: bool,
    pub created_at: Option<DateTime<Utc>>,
}

const REQUEST_COLUMNS: &str = "id, employee_id, supervisor_id, amount, modified_amount, reason, \
     status, supervisor_approved, hr_approved, admin_approved, \
     supervisor_comments, hr_comments, admin_comments, \
     supervisor_approved_at, hr_approved_at, admin_approved_at, \
     is_seen_by_employee, is_seen_by_supervisor, created_at";

const ROW_SELECT: &str = "SELECT a.id, a.employee_id, e.name AS employee_name, \
     e.emp_code AS employee_code, a.supervisor_id, s.name AS supervisor_name, \
     a.amount, a.modified_amount, a.reason, a.status, \
     a.supervisor_approved, a.hr_approved, a.admin_approved, a.created_at \
     FROM advance_requests a \
     JOIN identities e ON e.id = a.employee_id \
     JOIN identities s ON s.id = a.supervisor_id";

async fn fetch_request(pool: &MySqlPool, id: u64) -> Result<AdvanceRequest, ApiError> {
    sqlx::query_as::<_, AdvanceRequest>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM advance_requests WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Advance request not found"))
}

async fn employee_name(pool: &MySqlPool, id: u64) -> Result<String, ApiError> {
    let (name,): (String,) = sqlx::query_as("SELECT name FROM identities WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(name)
}

/// Employee requests a salary advance
#[utoipa::path(
    post,
    path = "/api/advance/apply",
    request_body = ApplyAdvance,
    responses(
        (status = 201, description = "Request created, pending supervisor", body = Object,
         example = json!({"message": "Advance request submitted", "status": "Pending"})),
        (status = 400, description = "Missing fields or invalid supervisor"),
        (status = 403, description = "Employees only")
    ),
    security(("bearer_auth" = [])),
    tag = "Advance"
)]
pub async fn apply_advance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ApplyAdvance>,
) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::Employee)?;

    if payload.reason.trim().is_empty() {
        return Err(ApiError::validation("reason is required"));
    }
    if payload.amount <= 0.0 {
        return Err(ApiError::validation("amount must be positive"));
    }

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
        "INSERT INTO advance_requests (employee_id, supervisor_id, amount, reason) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(auth.user_id)
    .bind(payload.supervisor_id)
    .bind(payload.amount)
    .bind(payload.reason.trim())
    .execute(pool.get_ref())
    .await?;

    let request_id = result.last_insert_id();

    let name = employee_name(pool.get_ref(), auth.user_id).await?;
    notify_user(
        pool.get_ref(),
        payload.supervisor_id,
        NotificationKind::Advance,
        &format!("{name} applied for an advance of {:.2}", payload.amount),
        request_id,
    )
    .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Advance request submitted",
        "status": RequestStatus::Pending.to_string(),
        "id": request_id
    })))
}

async fn decide_advance(
    auth: &AuthUser,
    pool: &MySqlPool,
    id: u64,
    stage: Stage,
    body: &DecideAdvance,
) -> Result<HttpResponse, ApiError> {
    let decision = parse_decision(&body.status)?;

    let request = fetch_request(pool, id).await?;

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

    let result = match stage {
        Stage::Supervisor => {
            sqlx::query(
                "UPDATE advance_requests SET status = ?, supervisor_approved = ?, \
                 supervisor_comments = ?, supervisor_approved_at = ? \
                 WHERE id = ? AND status = 'Pending' AND supervisor_approved = 0",
            )
            .bind(transition.new_status.to_string())
            .bind(transition.approves_stage)
            .bind(comments)
            .bind(decided_at)
            .bind(id)
            .execute(pool)
            .await?
        }
        // HR also fixes the sanctioned amount at its stage.
        Stage::Hr => {
            sqlx::query(
                "UPDATE advance_requests SET status = ?, hr_approved = ?, \
                 hr_comments = ?, hr_approved_at = ?, \
                 modified_amount = COALESCE(?, amount) \
                 WHERE id = ? AND status = 'Pending' AND supervisor_approved = 1 AND hr_approved = 0",
            )
            .bind(transition.new_status.to_string())
            .bind(transition.approves_stage)
            .bind(comments)
            .bind(decided_at)
            .bind(body.modified_amount)
            .bind(id)
            .execute(pool)
            .await?
        }
        Stage::Admin => {
            sqlx::query(
                "UPDATE advance_requests SET status = ?, admin_approved = ?, \
                 admin_comments = ?, admin_approved_at = ? \
                 WHERE id = ? AND status = 'Pending' AND hr_approved = 1 AND admin_approved = 0",
            )
            .bind(transition.new_status.to_string())
            .bind(transition.approves_stage)
            .bind(comments)
            .bind(decided_at)
            .bind(id)
            .execute(pool)
            .await?
        }
    };

    if result.rows_affected() == 0 {
        return Err(ApiError::conflict("Request already processed"));
    }

    tracing::info!(
        request_id = id,
        stage = ?transition.stage,
        decision = ?transition.decision,
        terminal = transition.is_terminal(),
        "advance request transition applied"
    );

    let name = employee_name(pool, request.employee_id).await?;
    let sanctioned = body
        .modified_amount
        .or(request.modified_amount)
        .unwrap_or(request.amount);
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
        clear_for_request(pool, NotificationKind::Advance, id).await?;
    }

    notify_user(
        pool,
        request.employee_id,
        NotificationKind::Advance,
        &format!("Your advance request of {sanctioned:.2} was {outcome} by {stage_label}"),
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
            NotificationKind::Advance,
            &format!("{role_label} advance request of {name} for {sanctioned:.2}"),
            id,
        )
        .await?;
    }

    let updated = fetch_request(pool, id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Advance request {outcome}"),
        "request": updated
    })))
}

/// Supervisor-stage decision
#[utoipa::path(
    put,
    path = "/api/advance/update/{id}",
    request_body = DecideAdvance,
    params(("id" = u64, Path, description = "Advance request id")),
    responses(
        (status = 200, description = "Decision applied"),
        (status = 403, description = "Out of turn or not your assignee"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Advance"
)]
pub async fn supervisor_decide(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<DecideAdvance>,
) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::Supervisor)?;
    decide_advance(&auth, pool.get_ref(), path.into_inner(), Stage::Supervisor, &body).await
}

/// HR-stage decision
#[utoipa::path(
    put,
    path = "/api/advance/hr/update/{id}",
    request_body = DecideAdvance,
    params(("id" = u64, Path, description = "Advance request id")),
    responses(
        (status = 200, description = "Decision applied"),
        (status = 403, description = "Out of turn"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Advance"
)]
pub async fn hr_decide(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<DecideAdvance>,
) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::Hr)?;
    decide_advance(&auth, pool.get_ref(), path.into_inner(), Stage::Hr, &body).await
}

/// Admin-stage decision (terminal)
#[utoipa::path(
    put,
    path = "/api/advance/admin/update/{id}",
    request_body = DecideAdvance,
    params(("id" = u64, Path, description = "Advance request id")),
    responses(
        (status = 200, description = "Decision applied"),
        (status = 403, description = "Out of turn"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Advance"
)]
pub async fn admin_decide(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<DecideAdvance>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    decide_advance(&auth, pool.get_ref(), path.into_inner(), Stage::Admin, &body).await
}

/// Supervisor queue: own requests awaiting the supervisor stage
#[utoipa::path(
    get,
    path = "/api/advance/supervisor",
    responses((status = 200, body = [AdvanceRow])),
    security(("bearer_auth" = [])),
    tag = "Advance"
)]
pub async fn supervisor_queue(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::Supervisor)?;

    let rows = sqlx::query_as::<_, AdvanceRow>(&format!(
        "{ROW_SELECT} WHERE a.supervisor_id = ? AND a.status = 'Pending' \
         AND a.supervisor_approved = 0 ORDER BY a.created_at DESC"
    ))
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// HR queue: supervisor-approved, not yet HR-decided
#[utoipa::path(
    get,
    path = "/api/advance/hr",
    responses((status = 200, body = [AdvanceRow])),
    security(("bearer_auth" = [])),
    tag = "Advance"
)]
pub async fn hr_queue(auth: AuthUser, pool: web::Data<MySqlPool>) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::Hr)?;

    let rows = sqlx::query_as::<_, AdvanceRow>(&format!(
        "{ROW_SELECT} WHERE a.status = 'Pending' AND a.supervisor_approved = 1 \
         AND a.hr_approved = 0 ORDER BY a.created_at DESC"
    ))
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Admin queue: HR-approved, awaiting the final stage
#[utoipa::path(
    get,
    path = "/api/advance/admin",
    responses((status = 200, body = [AdvanceRow])),
    security(("bearer_auth" = [])),
    tag = "Advance"
)]
pub async fn admin_queue(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let rows = sqlx::query_as::<_, AdvanceRow>(&format!(
        "{ROW_SELECT} WHERE a.status = 'Pending' AND a.hr_approved = 1 \
         AND a.admin_approved = 0 ORDER BY a.created_at DESC"
    ))
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// The caller's own advance history
#[utoipa::path(
    get,
    path = "/api/advance/employee",
    responses((status = 200, body = [AdvanceRow])),
    security(("bearer_auth" = [])),
    tag = "Advance"
)]
pub async fn employee_history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let rows = sqlx::query_as::<_, AdvanceRow>(&format!(
        "{ROW_SELECT} WHERE a.employee_id = ? ORDER BY a.created_at DESC"
    ))
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Supervisor acknowledges a request appearing in their queue
#[utoipa::path(
    put,
    path = "/api/advance/seen/{id}",
    params(("id" = u64, Path, description = "Advance request id")),
    responses(
        (status = 200, description = "Marked as seen"),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Advance"
)]
pub async fn mark_seen(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::Supervisor)?;

    let result = sqlx::query(
        "UPDATE advance_requests SET is_seen_by_supervisor = 1 WHERE id = ? AND supervisor_id = ?",
    )
    .bind(path.into_inner())
    .bind(auth.user_id)
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Advance request not found"));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Marked as seen" })))
}
