use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Wire status of a leave/advance request. Stays `Pending` through the
/// intermediate approval stages; the per-stage flags carry the progress.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    pub supervisor_id: u64,

    #[schema(example = "2024-03-01", value_type = String, format = "date")]
    pub from_date: NaiveDate,
    #[schema(example = "2024-03-03", value_type = String, format = "date")]
    pub to_date: NaiveDate,
    #[schema(example = "personal")]
    pub reason: String,

    #[schema(example = "Pending")]
    pub status: String,

    pub supervisor_approved: bool,
    pub hr_approved: bool,
    pub admin_approved: bool,

    pub supervisor_comments: Option<String>,
    pub hr_comments: Option<String>,
    pub admin_comments: Option<String>,

    pub supervisor_approved_at: Option<DateTime<Utc>>,
    pub hr_approved_at: Option<DateTime<Utc>>,
    pub admin_approved_at: Option<DateTime<Utc>>,

    pub is_seen_by_employee: bool,
    pub is_seen_by_supervisor: bool,

    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceRequest {
    pub id: u64,
    pub employee_id: u64,
    pub supervisor_id: u64,

    #[schema(example = 5000.0)]
    pub amount: f64,
    /// HR may adjust the sanctioned amount at its stage.
    pub modified_amount: Option<f64>,
    #[schema(example = "medical expenses")]
    pub reason: String,

    #[schema(example = "Pending")]
    pub status: String,

    pub supervisor_approved: bool,
    pub hr_approved: bool,
    pub admin_approved: bool,

    pub supervisor_comments: Option<String>,
    pub hr_comments: Option<String>,
    pub admin_comments: Option<String>,

    pub supervisor_approved_at: Option<DateTime<Utc>>,
    pub hr_approved_at: Option<DateTime<Utc>>,
    pub admin_approved_at: Option<DateTime<Utc>>,

    pub is_seen_by_employee: bool,
    pub is_seen_by_supervisor: bool,

    pub created_at: Option<DateTime<Utc>>,
}
