use actix_web::{HttpResponse, web};
use futures::future::join_all;
use sqlx::MySqlPool;

use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::notification::{Notification, NotificationKind};
use crate::model::role::Role;

pub async fn notify_user(
    pool: &MySqlPool,
    recipient_id: u64,
    kind: NotificationKind,
    message: &str,
    request_id: u64,
) -> Result<(), ApiError> {
    sqlx::query(
        "INSERT INTO notifications (recipient_id, kind, message, request_id) VALUES (?, ?, ?, ?)",
    )
    .bind(recipient_id)
    .bind(kind.to_string())
    .bind(message)
    .bind(request_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fan a message out to every active identity holding `role`, so whoever
/// acts next sees the request waiting.
pub async fn notify_role(
    pool: &MySqlPool,
    role: Role,
    kind: NotificationKind,
    message: &str,
    request_id: u64,
) -> Result<(), ApiError> {
    let recipients: Vec<(u64,)> =
        sqlx::query_as("SELECT id FROM identities WHERE role_id = ? AND is_active = 1")
            .bind(role.id())
            .fetch_all(pool)
            .await?;

    let inserts = recipients
        .iter()
        .map(|(id,)| notify_user(pool, *id, kind, message, request_id));

    for result in join_all(inserts).await {
        result?;
    }

    Ok(())
}

/// Retire every notification tied to a request once it reaches a terminal
/// approval.
pub async fn clear_for_request(
    pool: &MySqlPool,
    kind: NotificationKind,
    request_id: u64,
) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM notifications WHERE kind = ? AND request_id = ?")
        .bind(kind.to_string())
        .bind(request_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Unseen notifications for the caller
#[utoipa::path(
    get,
    path = "/api/notifications",
    responses(
        (status = 200, description = "Unseen notifications, newest first", body = [Notification]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn my_notifications(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let rows = sqlx::query_as::<_, Notification>(
        "SELECT id, recipient_id, kind, message, request_id, seen, created_at \
         FROM notifications \
         WHERE recipient_id = ? AND seen = 0 \
         ORDER BY created_at DESC",
    )
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Mark one of the caller's notifications as seen
#[utoipa::path(
    put,
    path = "/api/notifications/seen/{id}",
    params(("id" = u64, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked as seen"),
        (status = 403, description = "Not the recipient"),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_seen(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let recipient: Option<(u64,)> =
        sqlx::query_as("SELECT recipient_id FROM notifications WHERE id = ?")
            .bind(id)
            .fetch_optional(pool.get_ref())
            .await?;

    let Some((recipient_id,)) = recipient else {
        return Err(ApiError::not_found("Notification not found"));
    };

    if recipient_id != auth.user_id {
        return Err(ApiError::forbidden("Not your notification"));
    }

    sqlx::query("UPDATE notifications SET seen = 1 WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Notification marked as seen" })))
}
