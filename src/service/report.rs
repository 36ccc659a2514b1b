//! Attendance reports assembled from stored check events.
//!
//! A failure reading one user's events for one day does not abort a report:
//! it is logged, recorded as a [`ReportIssue`] and the remaining users and
//! days are still produced.

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::Serialize;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::attendance::{
    AttendanceEvent, AttendanceState, ClassAttendanceRecord, DailyAttendanceRecord, EventType,
};
use crate::model::role::Role;
use crate::model::schedule::{ScheduleEntry, ScheduleFilter, Weekday};
use crate::model::user::{User, UserSummary};
use crate::service::attendance::derive_daily_state;
use crate::service::export::attendance_workbook;
use crate::store::{DirectoryStore, EventStore, ScheduleStore};
use crate::utils::time_utils::{dates_inclusive, day_bounds, minutes_after};

const UNKNOWN_SUBJECT: &str = "unknown subject";
const UNKNOWN_COURSE: &str = "?° ?";

const WEEK: [chrono::Weekday; 7] = [
    chrono::Weekday::Mon,
    chrono::Weekday::Tue,
    chrono::Weekday::Wed,
    chrono::Weekday::Thu,
    chrono::Weekday::Fri,
    chrono::Weekday::Sat,
    chrono::Weekday::Sun,
];

#[derive(Debug, Clone)]
pub struct ReportSettings {
    /// Entries after this time of day count as late.
    pub late_cutoff: NaiveTime,
    /// Longest accepted period, both ends included.
    pub max_days: u32,
    /// When set, an entry only counts for a class if it happened no earlier
    /// than this long before the class started.
    pub presence_lookback: Option<Duration>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            late_cutoff: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            max_days: 366,
            presence_lookback: None,
        }
    }
}

/// Which users a range report covers. Every scope is limited to active
/// students.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    AllStudents,
    CourseDivision(u64),
    User(u64),
}

impl ReportScope {
    /// A course-division takes precedence over a user when both are given.
    pub fn from_query(course_division_id: Option<u64>, user_id: Option<u64>) -> Self {
        match (course_division_id, user_id) {
            (Some(id), _) => ReportScope::CourseDivision(id),
            (None, Some(id)) => ReportScope::User(id),
            (None, None) => ReportScope::AllStudents,
        }
    }
}

/// A user/day the report could not compute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReportIssue {
    #[schema(example = 42)]
    pub user_id: u64,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "events unavailable")]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[aliases(DailyReport = Report<DailyAttendanceRecord>, ClassReport = Report<ClassAttendanceRecord>)]
pub struct Report<T> {
    pub records: Vec<T>,
    pub issues: Vec<ReportIssue>,
}

impl<T> Default for Report<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            issues: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct StateCounts {
    pub total: u32,
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub incomplete: u32,
}

impl StateCounts {
    fn add(&mut self, state: AttendanceState) {
        self.total += 1;
        match state {
            AttendanceState::Present => self.present += 1,
            AttendanceState::Absent => self.absent += 1,
            AttendanceState::Late => self.late += 1,
            AttendanceState::Incomplete => self.incomplete += 1,
        }
    }

    fn attended(&self) -> u32 {
        self.present + self.late + self.incomplete
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct WeekdayBreakdown {
    #[schema(example = "monday")]
    pub weekday: String,
    pub counts: StateCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AttendanceSummary {
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub from: NaiveDate,
    #[schema(example = "2026-03-06", format = "date", value_type = String)]
    pub to: NaiveDate,
    pub counts: StateCounts,
    #[schema(example = 90)]
    pub attendance_percentage: u32,
    #[schema(example = 10)]
    pub absence_percentage: u32,
    #[schema(example = 20)]
    pub tardiness_percentage: u32,
    /// Monday first; only weekdays that occur in the period.
    pub by_weekday: Vec<WeekdayBreakdown>,
    pub issues: Vec<ReportIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TeacherClass {
    pub schedule_entry_id: u64,
    #[schema(example = "Matemática")]
    pub subject: String,
    #[schema(example = "3° B")]
    pub course: String,
    pub day: Weekday,
    #[schema(example = "08:00:00 - 09:20:00")]
    pub slot: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TeacherSummary {
    #[schema(example = 21)]
    pub teacher_id: u64,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub from: NaiveDate,
    #[schema(example = "2026-03-06", format = "date", value_type = String)]
    pub to: NaiveDate,
    pub assigned_slots: usize,
    pub classes: Vec<TeacherClass>,
}

/// Percentage of `part` in `total`, rounded half up; 0 for an empty total.
pub fn percentage(part: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let (part, total) = (u64::from(part), u64::from(total));
    ((200 * part + total) / (2 * total)) as u32
}

/// First date in `[from, to]` falling on `day`.
pub fn next_matching_weekday(day: Weekday, from: NaiveDate, to: NaiveDate) -> Option<NaiveDate> {
    let target = day.to_chrono();
    dates_inclusive(from, to).find(|d| d.weekday() == target)
}

fn weekday_name(day: chrono::Weekday) -> String {
    match day {
        chrono::Weekday::Mon => "monday",
        chrono::Weekday::Tue => "tuesday",
        chrono::Weekday::Wed => "wednesday",
        chrono::Weekday::Thu => "thursday",
        chrono::Weekday::Fri => "friday",
        chrono::Weekday::Sat => "saturday",
        chrono::Weekday::Sun => "sunday",
    }
    .to_string()
}

#[derive(Clone)]
pub struct ReportService {
    directory: Arc<dyn DirectoryStore>,
    schedules: Arc<dyn ScheduleStore>,
    events: Arc<dyn EventStore>,
    settings: ReportSettings,
}

impl ReportService {
    pub fn new(
        directory: Arc<dyn DirectoryStore>,
        schedules: Arc<dyn ScheduleStore>,
        events: Arc<dyn EventStore>,
        settings: ReportSettings,
    ) -> Self {
        Self {
            directory,
            schedules,
            events,
            settings,
        }
    }

    fn check_period(&self, from: NaiveDate, to: NaiveDate) -> Result<(), AppError> {
        if from > to {
            return Err(AppError::InvalidRange(
                "date_from must not be after date_to".into(),
            ));
        }
        let days = (to - from).num_days() + 1;
        if days > i64::from(self.settings.max_days) {
            return Err(AppError::InvalidRange(format!(
                "period of {days} days exceeds the limit of {} days",
                self.settings.max_days
            )));
        }
        Ok(())
    }

    async fn users_in_scope(&self, scope: ReportScope) -> Result<Vec<User>, AppError> {
        let users = match scope {
            ReportScope::AllStudents => self.directory.find_active_students().await?,
            ReportScope::CourseDivision(id) => {
                self.directory
                    .find_course_division(id)
                    .await?
                    .ok_or(AppError::NotFound("course-division"))?;
                self.directory.find_enrolled_students(id).await?
            }
            ReportScope::User(id) => {
                let user = self
                    .directory
                    .find_user_by_id(id)
                    .await?
                    .ok_or(AppError::NotFound("user"))?;
                if user.is_active && self.directory.user_has_role(id, Role::Student).await? {
                    vec![user]
                } else {
                    Vec::new()
                }
            }
        };
        Ok(users)
    }

    /// One user's events for one day, or the issue describing why not.
    async fn day_events(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceEvent>, ReportIssue> {
        let (start, end) = day_bounds(date);
        self.events
            .find_events_for_user_in_range(user_id, start, end)
            .await
            .map_err(|e| {
                error!(error = %e, user_id, %date, "Failed to load attendance events for report");
                ReportIssue {
                    user_id,
                    date,
                    message: "attendance events unavailable".into(),
                }
            })
    }

    /// Daily state of every user in scope for every date, dates outermost.
    pub async fn generate_range_report(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        scope: ReportScope,
    ) -> Result<Report<DailyAttendanceRecord>, AppError> {
        self.check_period(from, to)?;
        let users = self.users_in_scope(scope).await?;

        let mut report = Report::default();
        for date in dates_inclusive(from, to) {
            for user in &users {
                match self.day_events(user.id, date).await {
                    Ok(events) => report.records.push(derive_daily_state(
                        UserSummary::from(user),
                        date,
                        &events,
                        self.settings.late_cutoff,
                    )),
                    Err(issue) => report.issues.push(issue),
                }
            }
        }

        info!(
            ?scope,
            %from,
            %to,
            records = report.records.len(),
            issues = report.issues.len(),
            "Attendance range report generated"
        );
        Ok(report)
    }

    /// The range report rendered as an `.xlsx` workbook.
    pub async fn export_range_report(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        scope: ReportScope,
    ) -> Result<Vec<u8>, AppError> {
        let report = self.generate_range_report(from, to, scope).await?;
        if !report.issues.is_empty() {
            warn!(
                issues = report.issues.len(),
                "Exporting attendance report with missing user/days"
            );
        }
        Ok(attendance_workbook(&report.records)?)
    }

    pub async fn generate_summary(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        scope: ReportScope,
    ) -> Result<AttendanceSummary, AppError> {
        let report = self.generate_range_report(from, to, scope).await?;

        let mut counts = StateCounts::default();
        let mut by_day: [StateCounts; 7] = Default::default();
        for record in &report.records {
            counts.add(record.state);
            by_day[record.date.weekday().num_days_from_monday() as usize].add(record.state);
        }

        let mut seen = [false; 7];
        for date in dates_inclusive(from, to).take(7) {
            seen[date.weekday().num_days_from_monday() as usize] = true;
        }
        let by_weekday = by_day
            .into_iter()
            .enumerate()
            .filter(|(i, _)| seen[*i])
            .filter_map(|(i, counts)| {
                Some(WeekdayBreakdown {
                    weekday: weekday_name(*WEEK.get(i)?),
                    counts,
                })
            })
            .collect();

        Ok(AttendanceSummary {
            from,
            to,
            attendance_percentage: percentage(counts.attended(), counts.total),
            absence_percentage: percentage(counts.absent, counts.total),
            tardiness_percentage: percentage(counts.late, counts.total),
            counts,
            by_weekday,
            issues: report.issues,
        })
    }

    /// Per-class presence of the enrolled students for one subject
    /// assignment, taking each scheduled class on its first date in range.
    pub async fn generate_subject_report(
        &self,
        subject_assignment_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Report<ClassAttendanceRecord>, AppError> {
        self.check_period(from, to)?;
        let assignment = self
            .directory
            .find_subject_assignment(subject_assignment_id)
            .await?
            .ok_or(AppError::NotFound("subject assignment"))?;
        let course = self
            .directory
            .find_course_division(assignment.course_division_id)
            .await?
            .map(|c| c.label())
            .unwrap_or_else(|| UNKNOWN_COURSE.to_string());
        let entries = self
            .schedules
            .find_schedule_entries(&ScheduleFilter {
                subject_assignment_id: Some(subject_assignment_id),
                ..Default::default()
            })
            .await?;
        let students = self
            .directory
            .find_enrolled_students(assignment.course_division_id)
            .await?;

        let mut report = Report::default();
        for entry in &entries {
            let Some(class_date) = next_matching_weekday(entry.day, from, to) else {
                continue;
            };
            for student in &students {
                match self.day_events(student.id, class_date).await {
                    Ok(events) => {
                        let mut record = self.class_attendance(student, entry, class_date, &events);
                        record.subject.clone_from(&assignment.subject_name);
                        record.course.clone_from(&course);
                        report.records.push(record);
                    }
                    Err(issue) => report.issues.push(issue),
                }
            }
        }

        info!(
            subject_assignment_id,
            %from,
            %to,
            records = report.records.len(),
            issues = report.issues.len(),
            "Subject attendance report generated"
        );
        Ok(report)
    }

    fn class_attendance(
        &self,
        student: &User,
        entry: &ScheduleEntry,
        class_date: NaiveDate,
        events: &[AttendanceEvent],
    ) -> ClassAttendanceRecord {
        let class_start = class_date.and_time(entry.start_time);
        let class_end = class_date.and_time(entry.end_time);
        let earliest = self
            .settings
            .presence_lookback
            .map(|lookback| class_start - lookback);

        let arrival = events
            .iter()
            .filter(|e| e.event_type == EventType::Entry && e.timestamp <= class_end)
            .filter(|e| earliest.is_none_or(|bound| e.timestamp >= bound))
            .map(|e| e.timestamp)
            .min();
        let late = arrival.is_some_and(|t| t > class_start);

        ClassAttendanceRecord {
            user: UserSummary::from(student),
            schedule_entry_id: entry.id,
            subject: String::new(),
            course: String::new(),
            class_date,
            slot: entry.slot_label(),
            present: arrival.is_some(),
            arrival,
            late,
            late_minutes: arrival
                .filter(|_| late)
                .map_or(0, |t| minutes_after(class_start, t)),
        }
    }

    /// Teaching load of a teacher; the period is echoed, not used to filter.
    pub async fn generate_teacher_report(
        &self,
        teacher_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<TeacherSummary, AppError> {
        self.check_period(from, to)?;
        let entries = self
            .schedules
            .find_schedule_entries(&ScheduleFilter {
                teacher_user_id: Some(teacher_id),
                ..Default::default()
            })
            .await?;

        let mut classes = Vec::with_capacity(entries.len());
        for entry in &entries {
            let assignment = self
                .directory
                .find_subject_assignment(entry.subject_assignment_id)
                .await?;
            let course = self
                .directory
                .find_course_division(entry.course_division_id)
                .await?;
            classes.push(TeacherClass {
                schedule_entry_id: entry.id,
                subject: assignment
                    .map(|a| a.subject_name)
                    .unwrap_or_else(|| UNKNOWN_SUBJECT.to_string()),
                course: course
                    .map(|c| c.label())
                    .unwrap_or_else(|| UNKNOWN_COURSE.to_string()),
                day: entry.day,
                slot: entry.slot_label(),
            });
        }

        Ok(TeacherSummary {
            teacher_id,
            from,
            to,
            assigned_slots: classes.len(),
            classes,
        })
    }
}
