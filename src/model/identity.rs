use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Column list matching [`Identity`], for runtime `query_as` selects.
pub const IDENTITY_COLUMNS: &str = "id, emp_code, name, role_id, mobile, email, company, \
     designation, department, shift_start, shift_end, basic_salary, special_allowance, \
     conveyance, epf, esic, paid_leaves, supervisor_id, password_hash, is_active";

/// One polymorphic identity row: admins, HR, supervisors and employees all
/// live here, distinguished by `role_id`. Salary and shift fields are only
/// meaningful for employees/supervisors.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP4821")]
    pub emp_code: String,

    #[schema(example = "John Doe")]
    pub name: String,

    /// 1=admin, 2=hr, 3=supervisor, 4=employee
    #[schema(example = 4)]
    pub role_id: u8,

    pub mobile: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub designation: Option<String>,
    pub department: Option<String>,

    /// Assigned shift start ("HH:mm"), the lateness reference point.
    #[schema(example = "09:00", value_type = Option<String>)]
    #[serde(with = "super::attendance::hhmm_option")]
    pub shift_start: Option<NaiveTime>,

    #[schema(example = "18:00", value_type = Option<String>)]
    #[serde(with = "super::attendance::hhmm_option")]
    pub shift_end: Option<NaiveTime>,

    #[schema(example = 30000.0)]
    pub basic_salary: f64,
    #[schema(example = 3000.0)]
    pub special_allowance: f64,
    #[schema(example = 1000.0)]
    pub conveyance: f64,

    pub epf: bool,
    pub esic: bool,

    /// Paid-leave entitlement per month (0-4).
    #[schema(example = 2)]
    pub paid_leaves: u32,

    pub supervisor_id: Option<u64>,

    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    pub is_active: bool,
}
