//! Class schedule management.
//!
//! Every write goes through [`ScheduleService::validate_and_check_conflicts`]
//! first. The conflict check is a pre-check only: two concurrent requests can
//! both pass it, and the unique indexes on `(teacher, day, start)` and
//! `(course-division, day, start, assignment)` decide the race. Their
//! violation comes back from the store as `Duplicate` and is reported as a
//! conflict.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::AppError;
use crate::model::role::Role;
use crate::model::schedule::{
    NewScheduleEntry, ScheduleDraft, ScheduleEntry, ScheduleFilter, SchedulePatch,
};
use crate::service::overlap::overlaps;
use crate::store::{DirectoryStore, ScheduleStore, StoreError};
use crate::utils::time_utils::parse_clock;

#[derive(Clone)]
pub struct ScheduleService {
    directory: Arc<dyn DirectoryStore>,
    schedules: Arc<dyn ScheduleStore>,
}

fn map_write_error(e: StoreError) -> AppError {
    match e {
        StoreError::Duplicate(detail) => {
            warn!(detail = %detail, "Schedule write rejected by unique index");
            AppError::Conflict("schedule slot already taken".into())
        }
        other => AppError::Store(other),
    }
}

impl ScheduleService {
    pub fn new(directory: Arc<dyn DirectoryStore>, schedules: Arc<dyn ScheduleStore>) -> Self {
        Self {
            directory,
            schedules,
        }
    }

    /// Run the referential, format, range and conflict checks, in that order.
    ///
    /// `exclude_id` is the entry being updated, so it does not conflict with
    /// itself. Nothing is written.
    pub async fn validate_and_check_conflicts(
        &self,
        draft: &ScheduleDraft,
        exclude_id: Option<u64>,
    ) -> Result<NewScheduleEntry, AppError> {
        if self
            .directory
            .find_course_division(draft.course_division_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound("course-division"));
        }

        let assignment = self
            .directory
            .find_subject_assignment(draft.subject_assignment_id)
            .await?
            .filter(|a| a.course_division_id == draft.course_division_id)
            .ok_or_else(|| {
                AppError::InvalidReference(
                    "subject is not assigned to this course-division".into(),
                )
            })?;

        let teacher_exists = self
            .directory
            .find_user_by_id(draft.teacher_user_id)
            .await?
            .is_some();
        if !teacher_exists
            || !self
                .directory
                .user_has_role(draft.teacher_user_id, Role::Teacher)
                .await?
        {
            return Err(AppError::InvalidReference(
                "user is not a valid teacher".into(),
            ));
        }

        if !self
            .directory
            .teacher_can_teach(draft.teacher_user_id, assignment.subject_id)
            .await?
        {
            return Err(AppError::Unauthorized(
                "teacher is not authorized to teach this subject".into(),
            ));
        }

        let (start_time, end_time) = match (parse_clock(&draft.start_time), parse_clock(&draft.end_time)) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(AppError::InvalidFormat(
                    "invalid time format, use HH:MM:SS".into(),
                ));
            }
        };

        if end_time <= start_time {
            return Err(AppError::InvalidRange(
                "end time must be after start time".into(),
            ));
        }

        let same_teacher = ScheduleFilter {
            teacher_user_id: Some(draft.teacher_user_id),
            day: Some(draft.day),
            exclude_id,
            ..Default::default()
        };
        let teacher_busy = self
            .schedules
            .find_schedule_entries(&same_teacher)
            .await?
            .iter()
            .any(|e| overlaps(start_time, end_time, e.start_time, e.end_time));
        if teacher_busy {
            return Err(AppError::Conflict("teacher double-booked".into()));
        }

        let same_course = ScheduleFilter {
            course_division_id: Some(draft.course_division_id),
            day: Some(draft.day),
            exclude_id,
            ..Default::default()
        };
        let course_busy = self
            .schedules
            .find_schedule_entries(&same_course)
            .await?
            .iter()
            .any(|e| overlaps(start_time, end_time, e.start_time, e.end_time));
        if course_busy {
            return Err(AppError::Conflict("course double-booked".into()));
        }

        Ok(NewScheduleEntry {
            course_division_id: draft.course_division_id,
            day: draft.day,
            start_time,
            end_time,
            subject_assignment_id: draft.subject_assignment_id,
            teacher_user_id: draft.teacher_user_id,
            room: draft.room.clone(),
        })
    }

    pub async fn create(&self, draft: &ScheduleDraft) -> Result<ScheduleEntry, AppError> {
        let entry = self.validate_and_check_conflicts(draft, None).await?;
        let stored = self
            .schedules
            .create_schedule_entry(&entry)
            .await
            .map_err(map_write_error)?;

        info!(
            schedule_id = stored.id,
            teacher_id = stored.teacher_user_id,
            day = %stored.day,
            slot = %stored.slot_label(),
            "Schedule entry created"
        );
        Ok(stored)
    }

    pub async fn update(&self, id: u64, patch: &SchedulePatch) -> Result<ScheduleEntry, AppError> {
        let current = self.get(id).await?;

        let updated = if patch.touches_slot() {
            let draft = patch.apply_to(&current);
            self.validate_and_check_conflicts(&draft, Some(id))
                .await?
                .with_id(id)
        } else {
            ScheduleEntry {
                room: patch.room_after(&current),
                ..current
            }
        };

        let found = self
            .schedules
            .update_schedule_entry(&updated)
            .await
            .map_err(map_write_error)?;
        if !found {
            return Err(AppError::NotFound("schedule entry"));
        }

        info!(schedule_id = id, "Schedule entry updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: u64) -> Result<(), AppError> {
        if !self.schedules.delete_schedule_entry(id).await? {
            return Err(AppError::NotFound("schedule entry"));
        }
        info!(schedule_id = id, "Schedule entry deleted");
        Ok(())
    }

    pub async fn get(&self, id: u64) -> Result<ScheduleEntry, AppError> {
        self.schedules
            .find_schedule_entry(id)
            .await?
            .ok_or(AppError::NotFound("schedule entry"))
    }

    pub async fn list_by_course_division(
        &self,
        course_division_id: u64,
    ) -> Result<Vec<ScheduleEntry>, AppError> {
        let filter = ScheduleFilter {
            course_division_id: Some(course_division_id),
            ..Default::default()
        };
        Ok(self.schedules.find_schedule_entries(&filter).await?)
    }

    pub async fn list_by_teacher(&self, teacher_id: u64) -> Result<Vec<ScheduleEntry>, AppError> {
        let filter = ScheduleFilter {
            teacher_user_id: Some(teacher_id),
            ..Default::default()
        };
        Ok(self.schedules.find_schedule_entries(&filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schedule::Weekday;
    use crate::store::memory::MemoryStore;

    const COURSE: u64 = 3;
    const OTHER_COURSE: u64 = 4;
    const MATH: u64 = 12;
    const HISTORY: u64 = 13;
    const OTHER_COURSE_MATH: u64 = 14;
    const TEACHER: u64 = 21;
    const SECOND_TEACHER: u64 = 22;

    fn seeded() -> (Arc<MemoryStore>, ScheduleService) {
        let store = Arc::new(MemoryStore::new());
        store.add_course_division(COURSE, 3, "B");
        store.add_course_division(OTHER_COURSE, 4, "A");
        store.add_assignment(MATH, COURSE, 100, "Matemática");
        store.add_assignment(HISTORY, COURSE, 101, "Historia");
        store.add_assignment(OTHER_COURSE_MATH, OTHER_COURSE, 100, "Matemática");
        store.add_user(TEACHER, "Laura", "Gómez", &[Role::Teacher]);
        store.add_user(SECOND_TEACHER, "Pablo", "Ruiz", &[Role::Teacher]);
        store.add_user(30, "Ana", "Pérez", &[Role::Student]);
        store.allow_teaching(TEACHER, 100);
        store.allow_teaching(SECOND_TEACHER, 101);
        store.allow_teaching(SECOND_TEACHER, 100);

        let service = ScheduleService::new(store.clone(), store.clone());
        (store, service)
    }

    fn draft(start: &str, end: &str) -> ScheduleDraft {
        ScheduleDraft {
            course_division_id: COURSE,
            day: Weekday::Monday,
            start_time: start.into(),
            end_time: end.into(),
            subject_assignment_id: MATH,
            teacher_user_id: TEACHER,
            room: None,
        }
    }

    #[actix_web::test]
    async fn creates_a_valid_entry() {
        let (store, service) = seeded();
        let entry = service.create(&draft("08:00:00", "09:20:00")).await.unwrap();
        assert_eq!(entry.slot_label(), "08:00:00 - 09:20:00");
        assert_eq!(store.schedules(), vec![entry]);
    }

    #[actix_web::test]
    async fn unknown_course_division_is_not_found() {
        let (_, service) = seeded();
        let mut d = draft("08:00:00", "09:00:00");
        d.course_division_id = 99;
        let err = service.validate_and_check_conflicts(&d, None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("course-division")));
    }

    #[actix_web::test]
    async fn assignment_of_another_course_is_an_invalid_reference() {
        let (_, service) = seeded();
        let mut d = draft("08:00:00", "09:00:00");
        d.subject_assignment_id = OTHER_COURSE_MATH;
        let err = service.validate_and_check_conflicts(&d, None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidReference(_)));
    }

    #[actix_web::test]
    async fn non_teacher_is_an_invalid_reference() {
        let (_, service) = seeded();
        let mut d = draft("08:00:00", "09:00:00");
        d.teacher_user_id = 30;
        let err = service.validate_and_check_conflicts(&d, None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidReference(_)));
    }

    #[actix_web::test]
    async fn teacher_without_the_subject_is_unauthorized() {
        let (_, service) = seeded();
        let mut d = draft("08:00:00", "09:00:00");
        d.subject_assignment_id = HISTORY;
        let err = service.validate_and_check_conflicts(&d, None).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[actix_web::test]
    async fn referential_checks_run_before_format_checks() {
        let (_, service) = seeded();
        let mut d = draft("8am", "9am");
        d.teacher_user_id = 30;
        let err = service.validate_and_check_conflicts(&d, None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidReference(_)));
    }

    #[actix_web::test]
    async fn malformed_times_are_rejected() {
        let (_, service) = seeded();
        let err = service
            .validate_and_check_conflicts(&draft("08:00", "09:00:00"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidFormat(_)));
    }

    #[actix_web::test]
    async fn end_not_after_start_is_an_invalid_range() {
        let (_, service) = seeded();
        for (start, end) in [("09:00:00", "09:00:00"), ("10:00:00", "09:00:00")] {
            let err = service
                .validate_and_check_conflicts(&draft(start, end), None)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidRange(_)), "{start}-{end}");
        }
    }

    #[actix_web::test]
    async fn overlapping_entry_for_same_teacher_conflicts() {
        let (_, service) = seeded();
        service.create(&draft("09:00:00", "10:30:00")).await.unwrap();

        let mut second = draft("10:00:00", "11:00:00");
        second.course_division_id = OTHER_COURSE;
        second.subject_assignment_id = OTHER_COURSE_MATH;
        let err = service.create(&second).await.unwrap_err();
        match err {
            AppError::Conflict(msg) => assert_eq!(msg, "teacher double-booked"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[actix_web::test]
    async fn overlapping_entry_for_same_course_conflicts() {
        let (_, service) = seeded();
        service.create(&draft("09:00:00", "10:30:00")).await.unwrap();

        let mut second = draft("10:00:00", "11:00:00");
        second.subject_assignment_id = HISTORY;
        second.teacher_user_id = SECOND_TEACHER;
        let err = service.create(&second).await.unwrap_err();
        match err {
            AppError::Conflict(msg) => assert_eq!(msg, "course double-booked"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[actix_web::test]
    async fn back_to_back_entries_and_other_days_are_fine() {
        let (store, service) = seeded();
        service.create(&draft("09:00:00", "10:00:00")).await.unwrap();
        service.create(&draft("10:00:00", "11:00:00")).await.unwrap();
        let mut tuesday = draft("09:30:00", "10:30:00");
        tuesday.day = Weekday::Tuesday;
        service.create(&tuesday).await.unwrap();
        assert_eq!(store.schedules().len(), 3);
    }

    #[actix_web::test]
    async fn update_does_not_conflict_with_itself() {
        let (_, service) = seeded();
        let entry = service.create(&draft("09:00:00", "10:00:00")).await.unwrap();
        let patch = SchedulePatch {
            end_time: Some("10:30:00".into()),
            ..Default::default()
        };
        let updated = service.update(entry.id, &patch).await.unwrap();
        assert_eq!(updated.slot_label(), "09:00:00 - 10:30:00");
    }

    #[actix_web::test]
    async fn update_into_another_entry_conflicts() {
        let (_, service) = seeded();
        service.create(&draft("09:00:00", "10:00:00")).await.unwrap();
        let second = service.create(&draft("11:00:00", "12:00:00")).await.unwrap();
        let patch = SchedulePatch {
            start_time: Some("09:30:00".into()),
            ..Default::default()
        };
        let err = service.update(second.id, &patch).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[actix_web::test]
    async fn room_only_update_skips_validation() {
        let (_, service) = seeded();
        let entry = service.create(&draft("09:00:00", "10:00:00")).await.unwrap();
        let patch = SchedulePatch {
            room: Some(Some("Lab 2".into())),
            ..Default::default()
        };
        let updated = service.update(entry.id, &patch).await.unwrap();
        assert_eq!(updated.room.as_deref(), Some("Lab 2"));
        assert_eq!(updated.start_time, entry.start_time);
    }

    #[actix_web::test]
    async fn update_can_clear_the_room() {
        let (store, service) = seeded();
        let mut with_room = draft("09:00:00", "10:00:00");
        with_room.room = Some("Aula 4".into());
        let entry = service.create(&with_room).await.unwrap();

        let patch = SchedulePatch {
            room: Some(None),
            ..Default::default()
        };
        let updated = service.update(entry.id, &patch).await.unwrap();
        assert_eq!(updated.room, None);
        assert_eq!(store.schedules()[0].room, None);
    }

    #[actix_web::test]
    async fn unique_index_violation_surfaces_as_conflict() {
        let (store, service) = seeded();
        // Simulates a concurrent writer that slipped in after the pre-check
        let validated = service
            .validate_and_check_conflicts(&draft("09:00:00", "10:00:00"), None)
            .await
            .unwrap();
        store.push_schedule(validated.clone());
        let err = service
            .schedules
            .create_schedule_entry(&validated)
            .await
            .map_err(map_write_error)
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[actix_web::test]
    async fn delete_and_get_report_missing_entries() {
        let (_, service) = seeded();
        let entry = service.create(&draft("09:00:00", "10:00:00")).await.unwrap();
        service.delete(entry.id).await.unwrap();
        assert!(matches!(service.get(entry.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.delete(entry.id).await, Err(AppError::NotFound(_))));
    }

    #[actix_web::test]
    async fn lists_are_ordered_by_day_then_start() {
        let (_, service) = seeded();
        let mut tuesday = draft("08:00:00", "09:00:00");
        tuesday.day = Weekday::Tuesday;
        service.create(&tuesday).await.unwrap();
        service.create(&draft("11:00:00", "12:00:00")).await.unwrap();
        service.create(&draft("08:00:00", "09:00:00")).await.unwrap();

        let slots: Vec<(Weekday, String)> = service
            .list_by_teacher(TEACHER)
            .await
            .unwrap()
            .iter()
            .map(|e| (e.day, e.slot_label()))
            .collect();
        assert_eq!(
            slots,
            vec![
                (Weekday::Monday, "08:00:00 - 09:00:00".to_string()),
                (Weekday::Monday, "11:00:00 - 12:00:00".to_string()),
                (Weekday::Tuesday, "08:00:00 - 09:00:00".to_string()),
            ]
        );
        assert_eq!(service.list_by_course_division(COURSE).await.unwrap().len(), 3);
    }
}
