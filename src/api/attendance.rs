use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDateTime;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::model::attendance::{EventFilter, EventType};
use crate::model::role::Permission;
use crate::service::attendance::{AttendanceService, DEFAULT_EVENT_LIMIT};

#[derive(Deserialize, ToSchema)]
pub struct RecordAttendance {
    #[schema(example = 42)]
    pub user_id: u64,
    /// Reader the check came from, if any
    #[schema(example = 1)]
    pub device_id: Option<u64>,
    /// Who or what recorded the check when no reader was used
    #[schema(example = "preceptoría")]
    pub manual_source: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RecordManualAttendance {
    #[schema(example = 42)]
    pub user_id: u64,
    pub event_type: EventType,
    #[schema(example = "2026-03-02T07:55:00", format = "date-time", value_type = String)]
    pub timestamp: NaiveDateTime,
    #[schema(example = "secretaría")]
    pub source: String,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct RecordsQuery {
    /// Only events at or after this instant
    #[schema(example = "2026-03-01T00:00:00", format = "date-time", value_type = Option<String>)]
    pub from: Option<NaiveDateTime>,
    /// Only events at or before this instant
    #[schema(example = "2026-03-31T23:59:59", format = "date-time", value_type = Option<String>)]
    pub to: Option<NaiveDateTime>,
    pub event_type: Option<EventType>,
    /// Only events of this user; the per-user listing takes it from the path
    #[schema(example = 42)]
    pub user_id: Option<u64>,
    /// Only events read by this device
    #[schema(example = 1)]
    pub device_id: Option<u64>,
    #[schema(example = 100)]
    pub limit: Option<u32>,
    #[schema(example = 0)]
    pub offset: Option<u32>,
}

impl From<RecordsQuery> for EventFilter {
    fn from(q: RecordsQuery) -> Self {
        EventFilter {
            user_id: q.user_id,
            device_id: q.device_id,
            from: q.from,
            to: q.to,
            event_type: q.event_type,
            limit: q.limit.unwrap_or(DEFAULT_EVENT_LIMIT),
            offset: q.offset.unwrap_or(0),
        }
    }
}

/// Record a check happening now; entry or exit is decided from the user's
/// previous events today.
#[utoipa::path(
    post,
    path = "/api/attendance/records",
    request_body(
        content = RecordAttendance,
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Event recorded", body = crate::model::attendance::AttendanceEvent),
        (status = 400, description = "Device unknown or inactive"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn record_attendance(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    payload: web::Json<RecordAttendance>,
) -> actix_web::Result<impl Responder> {
    auth.require(Permission::RecordAttendance)?;
    let payload = payload.into_inner();
    let event = service
        .record(payload.user_id, payload.device_id, payload.manual_source)
        .await?;
    Ok(HttpResponse::Created().json(event))
}

/// Record an event with an explicit type and time.
#[utoipa::path(
    post,
    path = "/api/attendance/records/manual",
    request_body(
        content = RecordManualAttendance,
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Event recorded", body = crate::model::attendance::AttendanceEvent),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn record_manual_attendance(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    payload: web::Json<RecordManualAttendance>,
) -> actix_web::Result<impl Responder> {
    auth.require(Permission::RecordManualAttendance)?;
    let payload = payload.into_inner();
    let event = service
        .record_manual(
            payload.user_id,
            payload.event_type,
            payload.timestamp,
            payload.source,
        )
        .await?;
    Ok(HttpResponse::Created().json(event))
}

#[utoipa::path(
    get,
    path = "/api/attendance/records/user/{id}",
    params(
        ("id" = u64, Path, description = "User id"),
        RecordsQuery
    ),
    responses(
        (status = 200, description = "Events, newest first", body = [crate::model::attendance::AttendanceEvent]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_user_records(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    path: web::Path<u64>,
    query: web::Query<RecordsQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require(Permission::ViewAttendanceRecords)?;
    let filter = EventFilter::from(query.into_inner());
    let events = service.list_for_user(path.into_inner(), &filter).await?;
    Ok(HttpResponse::Ok().json(events))
}

#[utoipa::path(
    get,
    path = "/api/attendance/records",
    params(RecordsQuery),
    responses(
        (status = 200, description = "Events of every user, newest first", body = [crate::model::attendance::AttendanceEvent]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_records(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    query: web::Query<RecordsQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require(Permission::ViewAllAttendanceRecords)?;
    let filter = EventFilter::from(query.into_inner());
    let events = service.list_all(&filter).await?;
    Ok(HttpResponse::Ok().json(events))
}
