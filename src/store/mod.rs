//! Storage ports consumed by the services.
//!
//! The services only see these traits; `mysql` implements them over a
//! `MySqlPool` and `memory` backs the tests.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

use crate::model::{
    academic::{CourseDivision, SubjectAssignment},
    attendance::{AttendanceEvent, EventFilter, NewAttendanceEvent},
    device::Device,
    role::Role,
    schedule::{NewScheduleEntry, ScheduleEntry, ScheduleFilter},
    user::User,
};

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique index rejected the write.
    #[error("duplicate row: {0}")]
    Duplicate(String),

    /// A stored value could not be mapped onto the domain type.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Users, roles and the academic structure.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn find_user_by_id(&self, id: u64) -> StoreResult<Option<User>>;

    async fn user_has_role(&self, id: u64, role: Role) -> StoreResult<bool>;

    async fn teacher_can_teach(&self, teacher_id: u64, subject_id: u64) -> StoreResult<bool>;

    async fn find_course_division(&self, id: u64) -> StoreResult<Option<CourseDivision>>;

    async fn find_subject_assignment(&self, id: u64) -> StoreResult<Option<SubjectAssignment>>;

    /// Active students enrolled in the course-division.
    async fn find_enrolled_students(&self, course_division_id: u64) -> StoreResult<Vec<User>>;

    async fn find_active_students(&self) -> StoreResult<Vec<User>>;

    async fn find_user_by_fingerprint(&self, template: &str) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Matching entries ordered by day then start time.
    async fn find_schedule_entries(&self, filter: &ScheduleFilter)
    -> StoreResult<Vec<ScheduleEntry>>;

    async fn find_schedule_entry(&self, id: u64) -> StoreResult<Option<ScheduleEntry>>;

    async fn create_schedule_entry(&self, entry: &NewScheduleEntry) -> StoreResult<ScheduleEntry>;

    /// Returns `false` when no row has that id.
    async fn update_schedule_entry(&self, entry: &ScheduleEntry) -> StoreResult<bool>;

    async fn delete_schedule_entry(&self, id: u64) -> StoreResult<bool>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Events with `start <= timestamp < end`, oldest first.
    async fn find_events_for_user_in_range(
        &self,
        user_id: u64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<AttendanceEvent>>;

    /// Events newest first, paged.
    async fn find_events(&self, filter: &EventFilter) -> StoreResult<Vec<AttendanceEvent>>;

    async fn create_event(&self, event: &NewAttendanceEvent) -> StoreResult<AttendanceEvent>;

    async fn find_device_by_id(&self, id: u64) -> StoreResult<Option<Device>>;

    async fn find_device_by_identifier(&self, identifier: &str) -> StoreResult<Option<Device>>;
}
