use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDateTime, NaiveTime};
use sqlx::{FromRow, MySqlPool};
use tracing::debug;

use super::{DirectoryStore, EventStore, ScheduleStore, StoreError, StoreResult};
use crate::model::{
    academic::{CourseDivision, SubjectAssignment},
    attendance::{AttendanceEvent, EventFilter, EventType, NewAttendanceEvent},
    device::Device,
    role::Role,
    schedule::{NewScheduleEntry, ScheduleEntry, ScheduleFilter, Weekday},
    user::User,
};

const USER_COLUMNS: &str = "u.id, u.first_name, u.last_name, u.document_id, u.is_active";

/// All store ports over one MySQL pool.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(String),
    DateTime(NaiveDateTime),
}

#[derive(FromRow)]
struct ScheduleRow {
    id: u64,
    course_division_id: u64,
    day: String,
    start_time: NaiveTime,
    end_time: NaiveTime,
    subject_assignment_id: u64,
    teacher_user_id: u64,
    room: Option<String>,
}

impl TryFrom<ScheduleRow> for ScheduleEntry {
    type Error = StoreError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        let day = Weekday::from_str(&row.day)
            .map_err(|_| StoreError::Corrupt(format!("schedule {}: day '{}'", row.id, row.day)))?;

        Ok(ScheduleEntry {
            id: row.id,
            course_division_id: row.course_division_id,
            day,
            start_time: row.start_time,
            end_time: row.end_time,
            subject_assignment_id: row.subject_assignment_id,
            teacher_user_id: row.teacher_user_id,
            room: row.room,
        })
    }
}

#[derive(FromRow)]
struct EventRow {
    id: u64,
    user_id: u64,
    event_type: String,
    occurred_at: NaiveDateTime,
    device_id: Option<u64>,
    manual_source: Option<String>,
}

impl TryFrom<EventRow> for AttendanceEvent {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let event_type = EventType::from_str(&row.event_type).map_err(|_| {
            StoreError::Corrupt(format!("event {}: type '{}'", row.id, row.event_type))
        })?;

        Ok(AttendanceEvent {
            id: row.id,
            user_id: row.user_id,
            event_type,
            timestamp: row.occurred_at,
            device_id: row.device_id,
            manual_source: row.manual_source,
        })
    }
}

fn map_write_error(e: sqlx::Error) -> StoreError {
    // Duplicate key on one of the unique indexes
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some("23000") {
            return StoreError::Duplicate(db_err.message().to_string());
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl DirectoryStore for MySqlStore {
    async fn find_user_by_id(&self, id: u64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn user_has_role(&self, id: u64, role: Role) -> StoreResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = ? AND r.name = ?
            "#,
        )
        .bind(id)
        .bind(role.as_ref())
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn teacher_can_teach(&self, teacher_id: u64, subject_id: u64) -> StoreResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM teacher_subjects WHERE user_id = ? AND subject_id = ?",
        )
        .bind(teacher_id)
        .bind(subject_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn find_course_division(&self, id: u64) -> StoreResult<Option<CourseDivision>> {
        let course = sqlx::query_as::<_, CourseDivision>(
            "SELECT id, year, division FROM course_divisions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(course)
    }

    async fn find_subject_assignment(&self, id: u64) -> StoreResult<Option<SubjectAssignment>> {
        let assignment = sqlx::query_as::<_, SubjectAssignment>(
            r#"
            SELECT cds.id, cds.course_division_id, cds.subject_id, s.name AS subject_name
            FROM course_division_subjects cds
            JOIN subjects s ON s.id = cds.subject_id
            WHERE cds.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(assignment)
    }

    async fn find_enrolled_students(&self, course_division_id: u64) -> StoreResult<Vec<User>> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users u
            JOIN enrollments e ON e.user_id = u.id
            JOIN user_roles ur ON ur.user_id = u.id
            JOIN roles r ON r.id = ur.role_id
            WHERE e.course_division_id = ? AND r.name = ? AND u.is_active = TRUE
            ORDER BY u.last_name, u.first_name, u.id
            "#
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(course_division_id)
            .bind(Role::Student.as_ref())
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn find_active_students(&self) -> StoreResult<Vec<User>> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users u
            JOIN user_roles ur ON ur.user_id = u.id
            JOIN roles r ON r.id = ur.role_id
            WHERE r.name = ? AND u.is_active = TRUE
            ORDER BY u.last_name, u.first_name, u.id
            "#
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(Role::Student.as_ref())
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn find_user_by_fingerprint(&self, template: &str) -> StoreResult<Option<User>> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users u
            JOIN fingerprints f ON f.user_id = u.id
            WHERE f.template = ?
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(template)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl ScheduleStore for MySqlStore {
    async fn find_schedule_entries(
        &self,
        filter: &ScheduleFilter,
    ) -> StoreResult<Vec<ScheduleEntry>> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(id) = filter.course_division_id {
            where_sql.push_str(" AND course_division_id = ?");
            args.push(FilterValue::U64(id));
        }
        if let Some(id) = filter.teacher_user_id {
            where_sql.push_str(" AND teacher_user_id = ?");
            args.push(FilterValue::U64(id));
        }
        if let Some(id) = filter.subject_assignment_id {
            where_sql.push_str(" AND subject_assignment_id = ?");
            args.push(FilterValue::U64(id));
        }
        if let Some(day) = filter.day {
            where_sql.push_str(" AND day = ?");
            args.push(FilterValue::Str(day.to_string()));
        }
        if let Some(id) = filter.exclude_id {
            where_sql.push_str(" AND id <> ?");
            args.push(FilterValue::U64(id));
        }

        // ENUM columns sort by declaration order, monday first
        let sql = format!(
            r#"
            SELECT id, course_division_id, day, start_time, end_time,
                   subject_assignment_id, teacher_user_id, room
            FROM schedule_entries
            {where_sql}
            ORDER BY day, start_time, id
            "#
        );
        debug!(sql = %sql, ?filter, "Fetching schedule entries");

        let mut query = sqlx::query_as::<_, ScheduleRow>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::U64(v) => query.bind(v),
                FilterValue::Str(s) => query.bind(s),
                FilterValue::DateTime(t) => query.bind(t),
            };
        }

        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(ScheduleEntry::try_from)
            .collect()
    }

    async fn find_schedule_entry(&self, id: u64) -> StoreResult<Option<ScheduleEntry>> {
        let row = sqlx::query_as::<_, ScheduleRow>(
            r#"
            SELECT id, course_division_id, day, start_time, end_time,
                   subject_assignment_id, teacher_user_id, room
            FROM schedule_entries
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ScheduleEntry::try_from).transpose()
    }

    async fn create_schedule_entry(&self, entry: &NewScheduleEntry) -> StoreResult<ScheduleEntry> {
        let result = sqlx::query(
            r#"
            INSERT INTO schedule_entries
                (course_division_id, day, start_time, end_time,
                 subject_assignment_id, teacher_user_id, room)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.course_division_id)
        .bind(entry.day.as_ref())
        .bind(entry.start_time)
        .bind(entry.end_time)
        .bind(entry.subject_assignment_id)
        .bind(entry.teacher_user_id)
        .bind(entry.room.as_deref())
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(entry.clone().with_id(result.last_insert_id()))
    }

    async fn update_schedule_entry(&self, entry: &ScheduleEntry) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE schedule_entries
            SET course_division_id = ?, day = ?, start_time = ?, end_time = ?,
                subject_assignment_id = ?, teacher_user_id = ?, room = ?
            WHERE id = ?
            "#,
        )
        .bind(entry.course_division_id)
        .bind(entry.day.as_ref())
        .bind(entry.start_time)
        .bind(entry.end_time)
        .bind(entry.subject_assignment_id)
        .bind(entry.teacher_user_id)
        .bind(entry.room.as_deref())
        .bind(entry.id)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        // MySQL reports 0 affected rows for an unchanged row, so re-check existence
        if result.rows_affected() == 0 {
            return Ok(self.find_schedule_entry(entry.id).await?.is_some());
        }
        Ok(true)
    }

    async fn delete_schedule_entry(&self, id: u64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM schedule_entries WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl EventStore for MySqlStore {
    async fn find_events_for_user_in_range(
        &self,
        user_id: u64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<AttendanceEvent>> {
        sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, user_id, event_type, occurred_at, device_id, manual_source
            FROM attendance_events
            WHERE user_id = ? AND occurred_at >= ? AND occurred_at < ?
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(AttendanceEvent::try_from)
        .collect()
    }

    async fn find_events(&self, filter: &EventFilter) -> StoreResult<Vec<AttendanceEvent>> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(user_id) = filter.user_id {
            where_sql.push_str(" AND user_id = ?");
            args.push(FilterValue::U64(user_id));
        }
        if let Some(device_id) = filter.device_id {
            where_sql.push_str(" AND device_id = ?");
            args.push(FilterValue::U64(device_id));
        }

        if let Some(event_type) = filter.event_type {
            where_sql.push_str(" AND event_type = ?");
            args.push(FilterValue::Str(event_type.to_string()));
        }
        if let Some(from) = filter.from {
            where_sql.push_str(" AND occurred_at >= ?");
            args.push(FilterValue::DateTime(from));
        }
        if let Some(to) = filter.to {
            where_sql.push_str(" AND occurred_at <= ?");
            args.push(FilterValue::DateTime(to));
        }

        let sql = format!(
            r#"
            SELECT id, user_id, event_type, occurred_at, device_id, manual_source
            FROM attendance_events
            {where_sql}
            ORDER BY occurred_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#
        );
        debug!(sql = %sql, ?filter, "Fetching attendance events");

        let mut query = sqlx::query_as::<_, EventRow>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::U64(v) => query.bind(v),
                FilterValue::Str(s) => query.bind(s),
                FilterValue::DateTime(t) => query.bind(t),
            };
        }

        query
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AttendanceEvent::try_from)
            .collect()
    }

    async fn create_event(&self, event: &NewAttendanceEvent) -> StoreResult<AttendanceEvent> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_events
                (user_id, event_type, occurred_at, device_id, manual_source)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.user_id)
        .bind(event.event_type.as_ref())
        .bind(event.timestamp)
        .bind(event.device_id)
        .bind(event.manual_source.as_deref())
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(event.clone().with_id(result.last_insert_id()))
    }

    async fn find_device_by_id(&self, id: u64) -> StoreResult<Option<Device>> {
        let device = sqlx::query_as::<_, Device>(
            "SELECT id, identifier, description, location, is_active FROM devices WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(device)
    }

    async fn find_device_by_identifier(&self, identifier: &str) -> StoreResult<Option<Device>> {
        let device = sqlx::query_as::<_, Device>(
            r#"
            SELECT id, identifier, description, location, is_active
            FROM devices
            WHERE identifier = ?
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(device)
    }
}
