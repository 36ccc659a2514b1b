use crate::api::attendance::{RecordAttendance, RecordManualAttendance, RecordsQuery};
use crate::api::device::BiometricRecord;
use crate::api::report::{AttendanceReportQuery, PeriodQuery};
use crate::model::attendance::{
    AttendanceEvent, AttendanceState, ClassAttendanceRecord, DailyAttendanceRecord, EventType,
};
use crate::model::role::Role;
use crate::model::schedule::{ScheduleDraft, ScheduleEntry, SchedulePatch, Weekday};
use crate::model::user::UserSummary;
use crate::service::attendance::BiometricOutcome;
use crate::service::report::{
    AttendanceSummary, ClassReport, DailyReport, ReportIssue, StateCounts, TeacherClass,
    TeacherSummary, WeekdayBreakdown,
};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "School Administration API",
        version = "1.0.0",
        description = r#"
## School Administration: Scheduling & Attendance

Timetables, check-in/check-out events and attendance reports for a
secondary school.

### Key Features
- **Schedules**
  - Weekly class slots per course-division, validated against teacher
    authorization and double-booking of teachers and courses
- **Attendance**
  - Checks from fingerprint readers or staff, classified as entry or exit
  - Manual corrections with explicit type and time
  - Full event log for administration, filterable by user, device and type
- **Reports**
  - Daily state per student (present, late, incomplete, absent)
  - Summary percentages, per-class presence and teacher load
  - Spreadsheet (`.xlsx`) export of the daily report

### Security
Every endpoint except the fingerprint reader endpoint requires a
**JWT Bearer** access token. Permissions derive from the roles in the token.

All times are school-local; times of day use `HH:MM:SS`.
"#,
    ),
    paths(
        crate::api::schedule::create_schedule,
        crate::api::schedule::get_schedule,
        crate::api::schedule::update_schedule,
        crate::api::schedule::delete_schedule,
        crate::api::schedule::list_by_course_division,
        crate::api::schedule::list_by_teacher,

        crate::api::attendance::record_attendance,
        crate::api::attendance::record_manual_attendance,
        crate::api::attendance::list_user_records,
        crate::api::attendance::list_records,

        crate::api::device::biometric_record,

        crate::api::report::attendance_report,
        crate::api::report::export_attendance_excel,
        crate::api::report::attendance_summary,
        crate::api::report::subject_report,
        crate::api::report::teacher_report
    ),
    components(
        schemas(
            Role,
            Weekday,
            ScheduleEntry,
            ScheduleDraft,
            SchedulePatch,
            EventType,
            AttendanceEvent,
            AttendanceState,
            UserSummary,
            DailyAttendanceRecord,
            ClassAttendanceRecord,
            RecordAttendance,
            RecordManualAttendance,
            RecordsQuery,
            BiometricRecord,
            BiometricOutcome,
            AttendanceReportQuery,
            PeriodQuery,
            ReportIssue,
            DailyReport,
            ClassReport,
            StateCounts,
            WeekdayBreakdown,
            AttendanceSummary,
            TeacherClass,
            TeacherSummary
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Schedule", description = "Class timetable APIs"),
        (name = "Attendance", description = "Check event APIs"),
        (name = "Device", description = "Fingerprint reader endpoint"),
        (name = "Report", description = "Attendance report APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/schedules",
            "/api/schedules/{id}",
            "/api/schedules/course-division/{id}",
            "/api/schedules/teacher/{id}",
            "/api/attendance/records",
            "/api/attendance/records/manual",
            "/api/attendance/records/user/{id}",
            "/api/device/biometric-record",
            "/api/reports/attendance",
            "/api/reports/attendance/export/excel",
            "/api/reports/attendance/summary",
            "/api/reports/attendance/subject/{id}",
            "/api/reports/teacher/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        assert!(
            doc.components
                .as_ref()
                .is_some_and(|c| c.security_schemes.contains_key("bearer_auth"))
        );
    }
}
