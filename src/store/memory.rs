//! In-memory implementation of every store port, used by the tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::{DirectoryStore, EventStore, ScheduleStore, StoreError, StoreResult};
use crate::model::{
    academic::{CourseDivision, SubjectAssignment},
    attendance::{AttendanceEvent, EventFilter, NewAttendanceEvent},
    device::Device,
    role::Role,
    schedule::{NewScheduleEntry, ScheduleEntry, ScheduleFilter},
    user::User,
};

#[derive(Default)]
struct State {
    users: Vec<User>,
    roles: HashSet<(u64, Role)>,
    teacher_subjects: HashSet<(u64, u64)>,
    course_divisions: Vec<CourseDivision>,
    assignments: Vec<SubjectAssignment>,
    enrollments: Vec<(u64, u64)>,
    fingerprints: HashMap<String, u64>,
    devices: Vec<Device>,
    schedules: Vec<ScheduleEntry>,
    events: Vec<AttendanceEvent>,
    next_id: u64,
    failing_event_users: HashSet<u64>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, id: u64, first_name: &str, last_name: &str, roles: &[Role]) {
        let mut state = self.state.lock().unwrap();
        state.users.push(User {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            document_id: format!("DNI-{id}"),
            is_active: true,
        });
        for role in roles {
            state.roles.insert((id, *role));
        }
    }

    pub fn deactivate_user(&self, id: u64) {
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state.users.iter_mut().find(|u| u.id == id) {
            user.is_active = false;
        }
    }

    pub fn add_course_division(&self, id: u64, year: u8, division: &str) {
        self.state.lock().unwrap().course_divisions.push(CourseDivision {
            id,
            year,
            division: division.into(),
        });
    }

    pub fn add_assignment(&self, id: u64, course_division_id: u64, subject_id: u64, name: &str) {
        self.state.lock().unwrap().assignments.push(SubjectAssignment {
            id,
            course_division_id,
            subject_id,
            subject_name: name.into(),
        });
    }

    pub fn allow_teaching(&self, teacher_id: u64, subject_id: u64) {
        self.state
            .lock()
            .unwrap()
            .teacher_subjects
            .insert((teacher_id, subject_id));
    }

    pub fn enroll(&self, user_id: u64, course_division_id: u64) {
        self.state
            .lock()
            .unwrap()
            .enrollments
            .push((user_id, course_division_id));
    }

    pub fn add_fingerprint(&self, user_id: u64, template: &str) {
        self.state
            .lock()
            .unwrap()
            .fingerprints
            .insert(template.into(), user_id);
    }

    pub fn add_device(&self, id: u64, identifier: &str, is_active: bool) {
        self.state.lock().unwrap().devices.push(Device {
            id,
            identifier: identifier.into(),
            description: None,
            location: None,
            is_active,
        });
    }

    pub fn push_event(&self, event: NewAttendanceEvent) -> AttendanceEvent {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let stored = event.with_id(id);
        state.events.push(stored.clone());
        stored
    }

    pub fn push_schedule(&self, entry: NewScheduleEntry) -> ScheduleEntry {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let stored = entry.with_id(id);
        state.schedules.push(stored.clone());
        stored
    }

    /// Make every event lookup for the user fail.
    pub fn fail_events_for(&self, user_id: u64) {
        self.state
            .lock()
            .unwrap()
            .failing_event_users
            .insert(user_id);
    }

    pub fn events(&self) -> Vec<AttendanceEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn schedules(&self) -> Vec<ScheduleEntry> {
        self.state.lock().unwrap().schedules.clone()
    }

    fn check_events_available(state: &State, user_id: u64) -> StoreResult<()> {
        if state.failing_event_users.contains(&user_id) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

fn sorted_users(mut users: Vec<User>) -> Vec<User> {
    users.sort_by(|a, b| {
        (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
    });
    users
}

fn schedule_matches(filter: &ScheduleFilter, entry: &ScheduleEntry) -> bool {
    filter
        .course_division_id
        .is_none_or(|id| entry.course_division_id == id)
        && filter.teacher_user_id.is_none_or(|id| entry.teacher_user_id == id)
        && filter
            .subject_assignment_id
            .is_none_or(|id| entry.subject_assignment_id == id)
        && filter.day.is_none_or(|day| entry.day == day)
        && filter.exclude_id.is_none_or(|id| entry.id != id)
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn find_user_by_id(&self, id: u64) -> StoreResult<Option<User>> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_has_role(&self, id: u64, role: Role) -> StoreResult<bool> {
        Ok(self.state.lock().unwrap().roles.contains(&(id, role)))
    }

    async fn teacher_can_teach(&self, teacher_id: u64, subject_id: u64) -> StoreResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.teacher_subjects.contains(&(teacher_id, subject_id)))
    }

    async fn find_course_division(&self, id: u64) -> StoreResult<Option<CourseDivision>> {
        let state = self.state.lock().unwrap();
        Ok(state.course_divisions.iter().find(|c| c.id == id).cloned())
    }

    async fn find_subject_assignment(&self, id: u64) -> StoreResult<Option<SubjectAssignment>> {
        let state = self.state.lock().unwrap();
        Ok(state.assignments.iter().find(|a| a.id == id).cloned())
    }

    async fn find_enrolled_students(&self, course_division_id: u64) -> StoreResult<Vec<User>> {
        let state = self.state.lock().unwrap();
        let users = state
            .users
            .iter()
            .filter(|u| u.is_active && state.roles.contains(&(u.id, Role::Student)))
            .filter(|u| state.enrollments.contains(&(u.id, course_division_id)))
            .cloned()
            .collect();
        Ok(sorted_users(users))
    }

    async fn find_active_students(&self) -> StoreResult<Vec<User>> {
        let state = self.state.lock().unwrap();
        let users = state
            .users
            .iter()
            .filter(|u| u.is_active && state.roles.contains(&(u.id, Role::Student)))
            .cloned()
            .collect();
        Ok(sorted_users(users))
    }

    async fn find_user_by_fingerprint(&self, template: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .fingerprints
            .get(template)
            .and_then(|id| state.users.iter().find(|u| u.id == *id))
            .cloned())
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn find_schedule_entries(
        &self,
        filter: &ScheduleFilter,
    ) -> StoreResult<Vec<ScheduleEntry>> {
        let state = self.state.lock().unwrap();
        let mut entries: Vec<ScheduleEntry> = state
            .schedules
            .iter()
            .filter(|e| schedule_matches(filter, e))
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.day, e.start_time, e.id));
        Ok(entries)
    }

    async fn find_schedule_entry(&self, id: u64) -> StoreResult<Option<ScheduleEntry>> {
        let state = self.state.lock().unwrap();
        Ok(state.schedules.iter().find(|e| e.id == id).cloned())
    }

    async fn create_schedule_entry(&self, entry: &NewScheduleEntry) -> StoreResult<ScheduleEntry> {
        let mut state = self.state.lock().unwrap();
        // Mirrors the unique indexes of the real schema
        let clash = state.schedules.iter().any(|e| {
            e.day == entry.day
                && e.start_time == entry.start_time
                && (e.teacher_user_id == entry.teacher_user_id
                    || (e.course_division_id == entry.course_division_id
                        && e.subject_assignment_id == entry.subject_assignment_id))
        });
        if clash {
            return Err(StoreError::Duplicate("schedule_entries unique index".into()));
        }
        let id = state.next_id();
        let stored = entry.clone().with_id(id);
        state.schedules.push(stored.clone());
        Ok(stored)
    }

    async fn update_schedule_entry(&self, entry: &ScheduleEntry) -> StoreResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state.schedules.iter_mut().find(|e| e.id == entry.id) {
            Some(stored) => {
                *stored = entry.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_schedule_entry(&self, id: u64) -> StoreResult<bool> {
        let mut state = self.state.lock().unwrap();
        let before = state.schedules.len();
        state.schedules.retain(|e| e.id != id);
        Ok(state.schedules.len() != before)
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn find_events_for_user_in_range(
        &self,
        user_id: u64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<AttendanceEvent>> {
        let state = self.state.lock().unwrap();
        Self::check_events_available(&state, user_id)?;
        let mut events: Vec<AttendanceEvent> = state
            .events
            .iter()
            .filter(|e| e.user_id == user_id && e.timestamp >= start && e.timestamp < end)
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.timestamp, e.id));
        Ok(events)
    }

    async fn find_events(&self, filter: &EventFilter) -> StoreResult<Vec<AttendanceEvent>> {
        let state = self.state.lock().unwrap();
        if let Some(user_id) = filter.user_id {
            Self::check_events_available(&state, user_id)?;
        }
        let mut events: Vec<AttendanceEvent> = state
            .events
            .iter()
            .filter(|e| filter.user_id.is_none_or(|id| e.user_id == id))
            .filter(|e| filter.device_id.is_none_or(|id| e.device_id == Some(id)))
            .filter(|e| filter.event_type.is_none_or(|t| e.event_type == t))
            .filter(|e| filter.from.is_none_or(|from| e.timestamp >= from))
            .filter(|e| filter.to.is_none_or(|to| e.timestamp <= to))
            .cloned()
            .collect();
        events.sort_by_key(|e| std::cmp::Reverse((e.timestamp, e.id)));
        Ok(events
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn create_event(&self, event: &NewAttendanceEvent) -> StoreResult<AttendanceEvent> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let stored = event.clone().with_id(id);
        state.events.push(stored.clone());
        Ok(stored)
    }

    async fn find_device_by_id(&self, id: u64) -> StoreResult<Option<Device>> {
        let state = self.state.lock().unwrap();
        Ok(state.devices.iter().find(|d| d.id == id).cloned())
    }

    async fn find_device_by_identifier(&self, identifier: &str) -> StoreResult<Option<Device>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .devices
            .iter()
            .find(|d| d.identifier == identifier)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schedule::Weekday;
    use chrono::NaiveTime;

    #[test]
    fn schedule_filter_skips_excluded_entry() {
        let entry = ScheduleEntry {
            id: 1,
            course_division_id: 3,
            day: Weekday::Monday,
            start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 20, 0).unwrap(),
            subject_assignment_id: 12,
            teacher_user_id: 21,
            room: None,
        };
        let filter = ScheduleFilter {
            teacher_user_id: Some(21),
            day: Some(Weekday::Monday),
            exclude_id: Some(1),
            ..Default::default()
        };
        assert!(!schedule_matches(&filter, &entry));
        assert!(schedule_matches(&ScheduleFilter::default(), &entry));
    }

    #[actix_web::test]
    async fn enrolled_students_exclude_staff_and_inactive_users() {
        let store = MemoryStore::new();
        store.add_user(2, "Pablo", "Preceptor", &[Role::Preceptor]);
        store.add_user(41, "Ana", "Acosta", &[Role::Student]);
        store.add_user(50, "Eva", "Ortiz", &[Role::Student]);
        store.deactivate_user(50);
        for id in [2, 41, 50] {
            store.enroll(id, 3);
        }
        let ids: Vec<u64> = store
            .find_enrolled_students(3)
            .await
            .unwrap()
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![41]);
    }
}
