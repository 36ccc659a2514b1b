use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::user::UserSummary;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventType {
    Entry,
    Exit,
}

/// A check-in or check-out, immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceEvent {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 42)]
    pub user_id: u64,
    pub event_type: EventType,
    #[schema(example = "2026-03-02T07:52:10", format = "date-time", value_type = String)]
    pub timestamp: NaiveDateTime,
    pub device_id: Option<u64>,
    pub manual_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendanceEvent {
    pub user_id: u64,
    pub event_type: EventType,
    pub timestamp: NaiveDateTime,
    pub device_id: Option<u64>,
    pub manual_source: Option<String>,
}

impl NewAttendanceEvent {
    pub fn with_id(self, id: u64) -> AttendanceEvent {
        AttendanceEvent {
            id,
            user_id: self.user_id,
            event_type: self.event_type,
            timestamp: self.timestamp,
            device_id: self.device_id,
            manual_source: self.manual_source,
        }
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceState {
    Absent,
    Present,
    Late,
    Incomplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DailyAttendanceRecord {
    pub user: UserSummary,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub state: AttendanceState,
    #[schema(example = "2026-03-02T08:10:00", format = "date-time", value_type = Option<String>)]
    pub entry_time: Option<NaiveDateTime>,
    #[schema(example = "2026-03-02T16:00:00", format = "date-time", value_type = Option<String>)]
    pub exit_time: Option<NaiveDateTime>,
    #[schema(example = 10, nullable = true)]
    pub late_minutes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClassAttendanceRecord {
    pub user: UserSummary,
    #[schema(example = 7)]
    pub schedule_entry_id: u64,
    #[schema(example = "Matemática")]
    pub subject: String,
    #[schema(example = "3° B")]
    pub course: String,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub class_date: NaiveDate,
    #[schema(example = "08:00:00 - 09:20:00")]
    pub slot: String,
    pub present: bool,
    #[schema(example = "2026-03-02T08:05:00", format = "date-time", value_type = Option<String>)]
    pub arrival: Option<NaiveDateTime>,
    pub late: bool,
    #[schema(example = 5)]
    pub late_minutes: i64,
}

/// Filters for listing raw events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub user_id: Option<u64>,
    pub device_id: Option<u64>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    pub event_type: Option<EventType>,
    pub limit: u32,
    pub offset: u32,
}
