use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// School days a class can be scheduled on.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString, AsRefStr, EnumIter, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub fn to_chrono(self) -> chrono::Weekday {
        match self {
            Weekday::Monday => chrono::Weekday::Mon,
            Weekday::Tuesday => chrono::Weekday::Tue,
            Weekday::Wednesday => chrono::Weekday::Wed,
            Weekday::Thursday => chrono::Weekday::Thu,
            Weekday::Friday => chrono::Weekday::Fri,
        }
    }

}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 7,
        "course_division_id": 3,
        "day": "monday",
        "start_time": "08:00:00",
        "end_time": "09:20:00",
        "subject_assignment_id": 12,
        "teacher_user_id": 21,
        "room": "Aula 4"
    })
)]
pub struct ScheduleEntry {
    pub id: u64,
    pub course_division_id: u64,
    pub day: Weekday,
    #[schema(example = "08:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "09:20:00", value_type = String)]
    pub end_time: NaiveTime,
    pub subject_assignment_id: u64,
    pub teacher_user_id: u64,
    pub room: Option<String>,
}

impl ScheduleEntry {
    pub fn slot_label(&self) -> String {
        format!(
            "{} - {}",
            self.start_time.format("%H:%M:%S"),
            self.end_time.format("%H:%M:%S")
        )
    }
}

/// A proposed entry as submitted by a client, times still unparsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScheduleDraft {
    #[schema(example = 3)]
    pub course_division_id: u64,
    pub day: Weekday,
    #[schema(example = "08:00:00")]
    pub start_time: String,
    #[schema(example = "09:20:00")]
    pub end_time: String,
    #[schema(example = 12)]
    pub subject_assignment_id: u64,
    #[schema(example = 21)]
    pub teacher_user_id: u64,
    #[schema(example = "Aula 4", nullable = true)]
    pub room: Option<String>,
}

/// Partial update; absent fields keep their stored value. `room: null`
/// clears the room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SchedulePatch {
    pub course_division_id: Option<u64>,
    pub day: Option<Weekday>,
    #[schema(example = "10:00:00")]
    pub start_time: Option<String>,
    #[schema(example = "11:20:00")]
    pub end_time: Option<String>,
    pub subject_assignment_id: Option<u64>,
    pub teacher_user_id: Option<u64>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, nullable = true, example = "Lab 2")]
    pub room: Option<Option<String>>,
}

/// Maps a present field to `Some`, keeping an explicit `null` apart from
/// an absent one (which `default` leaves as `None`).
fn present_or_null<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(de).map(Some)
}

impl SchedulePatch {
    /// Whether the patch touches a field that affects validity or conflicts.
    pub fn touches_slot(&self) -> bool {
        self.course_division_id.is_some()
            || self.subject_assignment_id.is_some()
            || self.teacher_user_id.is_some()
            || self.day.is_some()
            || self.start_time.is_some()
            || self.end_time.is_some()
    }

    pub fn room_after(&self, entry: &ScheduleEntry) -> Option<String> {
        match &self.room {
            Some(room) => room.clone(),
            None => entry.room.clone(),
        }
    }

    pub fn apply_to(&self, entry: &ScheduleEntry) -> ScheduleDraft {
        ScheduleDraft {
            course_division_id: self.course_division_id.unwrap_or(entry.course_division_id),
            day: self.day.unwrap_or(entry.day),
            start_time: self
                .start_time
                .clone()
                .unwrap_or_else(|| entry.start_time.format("%H:%M:%S").to_string()),
            end_time: self
                .end_time
                .clone()
                .unwrap_or_else(|| entry.end_time.format("%H:%M:%S").to_string()),
            subject_assignment_id: self
                .subject_assignment_id
                .unwrap_or(entry.subject_assignment_id),
            teacher_user_id: self.teacher_user_id.unwrap_or(entry.teacher_user_id),
            room: self.room_after(entry),
        }
    }
}

/// An entry that passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScheduleEntry {
    pub course_division_id: u64,
    pub day: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject_assignment_id: u64,
    pub teacher_user_id: u64,
    pub room: Option<String>,
}

impl NewScheduleEntry {
    pub fn with_id(self, id: u64) -> ScheduleEntry {
        ScheduleEntry {
            id,
            course_division_id: self.course_division_id,
            day: self.day,
            start_time: self.start_time,
            end_time: self.end_time,
            subject_assignment_id: self.subject_assignment_id,
            teacher_user_id: self.teacher_user_id,
            room: self.room,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleFilter {
    pub course_division_id: Option<u64>,
    pub teacher_user_id: Option<u64>,
    pub subject_assignment_id: Option<u64>,
    pub day: Option<Weekday>,
    pub exclude_id: Option<u64>,
}
