use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
    EnumIter, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Preceptor,
    Student,
    Parent,
}

/// Operations guarded by the role table below.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Permission {
    ManageSchedules,
    ViewSchedules,
    RecordAttendance,
    RecordManualAttendance,
    ViewAttendanceRecords,
    ViewAllAttendanceRecords,
    ViewAttendanceReport,
    ViewAttendanceSummary,
    ViewTeacherReport,
}

impl Role {
    pub fn allows(self, permission: Permission) -> bool {
        use Permission::*;

        match self {
            Role::Admin => true,
            Role::Preceptor => matches!(
                permission,
                ViewSchedules
                    | RecordAttendance
                    | ViewAttendanceRecords
                    | ViewAllAttendanceRecords
                    | ViewAttendanceReport
                    | ViewAttendanceSummary
            ),
            Role::Teacher => matches!(
                permission,
                ViewSchedules | ViewAttendanceRecords | ViewAttendanceReport | ViewTeacherReport
            ),
            Role::Student | Role::Parent => matches!(permission, ViewSchedules),
        }
    }
}
