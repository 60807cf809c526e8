use utoipa::OpenApi;
use utoipa::openapi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::Modify;

use crate::api::advance::{AdvanceRow, ApplyAdvance, DecideAdvance};
use crate::api::attendance::{
    AttendanceRow, CorrectAttendance, MarkAttendance, MarkAttendanceResponse,
};
use crate::api::identity::{IdentitySummary, RegisterIdentity, RegisterResponse};
use crate::api::leave::{ApplyLeave, DecideLeave, LeaveRow};
use crate::api::report::{MonthlyReportRow, SummaryReportRow, UpdateSalary};
use crate::core::payroll::SalaryBreakdown;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::identity::Identity;
use crate::model::notification::{Notification, NotificationKind};
use crate::model::request::{AdvanceRequest, LeaveRequest, RequestStatus};
use crate::model::role::Role;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Back-Office API",
        version = "1.0.0",
        description = r#"
## HR Back-Office Service

Attendance, leave/advance approvals and monthly payroll reporting for a
multi-role HR organisation.

### Key Features
- **Attendance**
  - Daily marking with server-side lateness derivation, role-filtered views
    and HR corrections
- **Leave & Advance Requests**
  - Three-stage supervisor → HR → admin approval chain with notifications
- **Payroll Reports**
  - Monthly per-employee attendance counts and prorated salary breakdowns
- **Identities**
  - Role-ruled onboarding of HR, supervisors and employees

### Security
Protected endpoints use **JWT Bearer authentication**; admins log in with a
one-time code.
"#,
    ),
    paths(
        crate::api::attendance::mark_attendance,
        crate::api::attendance::list_attendance,
        crate::api::attendance::correct_attendance,

        crate::api::leave::apply_leave,
        crate::api::leave::supervisor_decide,
        crate::api::leave::hr_decide,
        crate::api::leave::admin_decide,
        crate::api::leave::supervisor_queue,
        crate::api::leave::hr_queue,
        crate::api::leave::admin_queue,
        crate::api::leave::employee_history,
        crate::api::leave::mark_seen,

        crate::api::advance::apply_advance,
        crate::api::advance::supervisor_decide,
        crate::api::advance::hr_decide,
        crate::api::advance::admin_decide,
        crate::api::advance::supervisor_queue,
        crate::api::advance::hr_queue,
        crate::api::advance::admin_queue,
        crate::api::advance::employee_history,
        crate::api::advance::mark_seen,

        crate::api::notification::my_notifications,
        crate::api::notification::mark_seen,

        crate::api::report::monthly_report,
        crate::api::report::summary_report,
        crate::api::report::update_salary,

        crate::api::identity::register_identity,
        crate::api::identity::list_employees,
        crate::api::identity::list_supervisors,
        crate::api::identity::get_employee_by_code,
        crate::api::identity::assigned_employees,
        crate::api::identity::disable_identity,
    ),
    components(
        schemas(
            Role,
            Identity,
            IdentitySummary,
            RegisterIdentity,
            RegisterResponse,
            AttendanceStatus,
            AttendanceRecord,
            AttendanceRow,
            MarkAttendance,
            MarkAttendanceResponse,
            CorrectAttendance,
            RequestStatus,
            LeaveRequest,
            LeaveRow,
            ApplyLeave,
            DecideLeave,
            AdvanceRequest,
            AdvanceRow,
            ApplyAdvance,
            DecideAdvance,
            NotificationKind,
            Notification,
            SalaryBreakdown,
            MonthlyReportRow,
            SummaryReportRow,
            UpdateSalary
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Attendance marking and correction APIs"),
        (name = "Leave", description = "Leave request workflow APIs"),
        (name = "Advance", description = "Advance request workflow APIs"),
        (name = "Notifications", description = "Notification read APIs"),
        (name = "Reports", description = "Attendance and payroll report APIs"),
        (name = "Identities", description = "Identity management APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
