//! Check event classification and daily attendance derivation.

use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::attendance::{
    AttendanceEvent, AttendanceState, DailyAttendanceRecord, EventFilter, EventType,
    NewAttendanceEvent,
};
use crate::model::user::{User, UserSummary};
use crate::store::{DirectoryStore, EventStore};
use crate::utils::time_utils::{day_bounds, minutes_after};

/// Default number of events returned by a listing.
pub const DEFAULT_EVENT_LIMIT: u32 = 100;

/// Outcome reported back to a fingerprint reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BiometricOutcome {
    pub success: bool,
    #[schema(example = "entry recorded")]
    pub message: String,
    pub user: Option<UserSummary>,
    pub event_type: Option<EventType>,
}

impl BiometricOutcome {
    pub fn rejected(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            user: None,
            event_type: None,
        }
    }
}

/// Derive a user's attendance for one day from that day's events.
///
/// Events need not be sorted; equal timestamps keep their given order.
/// An entry after `cutoff` makes the day `Late`, and a day with an entry but
/// no exit is `Incomplete` while still carrying the late minutes.
pub fn derive_daily_state(
    user: UserSummary,
    date: NaiveDate,
    events: &[AttendanceEvent],
    cutoff: NaiveTime,
) -> DailyAttendanceRecord {
    let mut ordered: Vec<&AttendanceEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.timestamp);

    let first_entry = ordered
        .iter()
        .find(|e| e.event_type == EventType::Entry)
        .map(|e| e.timestamp);
    let last_exit = ordered
        .iter()
        .rev()
        .find(|e| e.event_type == EventType::Exit)
        .map(|e| e.timestamp);

    let mut record = DailyAttendanceRecord {
        user,
        date,
        state: AttendanceState::Absent,
        entry_time: first_entry,
        exit_time: last_exit,
        late_minutes: None,
    };

    let Some(entry) = first_entry else {
        return record;
    };

    record.state = AttendanceState::Present;
    let limit = date.and_time(cutoff);
    if entry > limit {
        record.state = AttendanceState::Late;
        record.late_minutes = Some(minutes_after(limit, entry));
    }
    if last_exit.is_none() {
        record.state = AttendanceState::Incomplete;
    }
    record
}

#[derive(Clone)]
pub struct AttendanceService {
    directory: Arc<dyn DirectoryStore>,
    events: Arc<dyn EventStore>,
}

impl AttendanceService {
    pub fn new(directory: Arc<dyn DirectoryStore>, events: Arc<dyn EventStore>) -> Self {
        Self { directory, events }
    }

    /// Decide whether a check at `timestamp` is an entry or an exit.
    ///
    /// The type alternates per user and day, starting with an entry after
    /// midnight. If the previous events cannot be read the check is taken as
    /// an entry; this fail-open default is logged, never silent.
    pub async fn classify_next_event(&self, user_id: u64, timestamp: NaiveDateTime) -> EventType {
        let (start, end) = day_bounds(timestamp.date());

        match self
            .events
            .find_events_for_user_in_range(user_id, start, end)
            .await
        {
            Ok(events) => match events.iter().max_by_key(|e| e.timestamp) {
                Some(last) if last.event_type == EventType::Entry => EventType::Exit,
                _ => EventType::Entry,
            },
            Err(e) => {
                warn!(
                    error = %e,
                    user_id,
                    "Could not read today's events, defaulting check to entry"
                );
                EventType::Entry
            }
        }
    }

    async fn require_user(&self, user_id: u64) -> Result<User, AppError> {
        self.directory
            .find_user_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("user"))
    }

    /// Record a check happening now, from a reader or a staff member.
    pub async fn record(
        &self,
        user_id: u64,
        device_id: Option<u64>,
        manual_source: Option<String>,
    ) -> Result<AttendanceEvent, AppError> {
        self.record_at(user_id, device_id, manual_source, Local::now().naive_local())
            .await
    }

    pub async fn record_at(
        &self,
        user_id: u64,
        device_id: Option<u64>,
        manual_source: Option<String>,
        timestamp: NaiveDateTime,
    ) -> Result<AttendanceEvent, AppError> {
        self.require_user(user_id).await?;

        if let Some(device_id) = device_id {
            let active = self
                .events
                .find_device_by_id(device_id)
                .await?
                .is_some_and(|d| d.is_active);
            if !active {
                return Err(AppError::InvalidReference(
                    "device not found or inactive".into(),
                ));
            }
        }

        let event_type = self.classify_next_event(user_id, timestamp).await;
        let event = self
            .events
            .create_event(&NewAttendanceEvent {
                user_id,
                event_type,
                timestamp,
                device_id,
                manual_source,
            })
            .await?;

        info!(
            event_id = event.id,
            user_id,
            event_type = %event.event_type,
            source = if device_id.is_some() { "device" } else { "manual" },
            "Attendance event recorded"
        );
        Ok(event)
    }

    /// Record an event with an explicit type and time, e.g. a correction.
    pub async fn record_manual(
        &self,
        user_id: u64,
        event_type: EventType,
        timestamp: NaiveDateTime,
        source: String,
    ) -> Result<AttendanceEvent, AppError> {
        self.require_user(user_id).await?;

        let event = self
            .events
            .create_event(&NewAttendanceEvent {
                user_id,
                event_type,
                timestamp,
                device_id: None,
                manual_source: Some(source),
            })
            .await?;

        info!(
            event_id = event.id,
            user_id,
            event_type = %event_type,
            %timestamp,
            "Manual attendance event recorded"
        );
        Ok(event)
    }

    /// Handle a fingerprint read from a device.
    ///
    /// Unknown fingerprints and unknown or inactive devices are answered with
    /// an unsuccessful outcome rather than an error.
    pub async fn record_biometric(
        &self,
        template: &str,
        device_identifier: &str,
    ) -> Result<BiometricOutcome, AppError> {
        let Some(user) = self.directory.find_user_by_fingerprint(template).await? else {
            warn!(device = %device_identifier, "Unregistered fingerprint presented");
            return Ok(BiometricOutcome::rejected("fingerprint not registered"));
        };

        let device = match self
            .events
            .find_device_by_identifier(device_identifier)
            .await?
        {
            Some(d) if d.is_active => d,
            _ => {
                warn!(device = %device_identifier, "Check from unknown or inactive device");
                return Ok(BiometricOutcome::rejected("device not authorized"));
            }
        };

        let event = self.record(user.id, Some(device.id), None).await?;
        Ok(BiometricOutcome {
            success: true,
            message: format!("{} recorded", event.event_type),
            user: Some(UserSummary::from(&user)),
            event_type: Some(event.event_type),
        })
    }

    pub async fn list_for_user(
        &self,
        user_id: u64,
        filter: &EventFilter,
    ) -> Result<Vec<AttendanceEvent>, AppError> {
        let filter = EventFilter {
            user_id: Some(user_id),
            ..filter.clone()
        };
        Ok(self.events.find_events(&filter).await?)
    }

    /// Events of every user, newest first.
    pub async fn list_all(&self, filter: &EventFilter) -> Result<Vec<AttendanceEvent>, AppError> {
        Ok(self.events.find_events(filter).await?)
    }
}
