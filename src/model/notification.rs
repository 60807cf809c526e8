use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum NotificationKind {
    Leave,
    Advance,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: u64,
    pub recipient_id: u64,

    #[schema(example = "Leave")]
    pub kind: String,

    #[schema(example = "John Doe applied for leave (2024-03-01 to 2024-03-03)")]
    pub message: String,

    /// The leave/advance request this notification belongs to.
    pub request_id: u64,

    pub seen: bool,
    pub created_at: Option<DateTime<Utc>>,
}
