use actix_web::{HttpResponse, Responder, web};

use crate::auth::auth::AuthUser;
use crate::model::role::Permission;
use crate::model::schedule::{ScheduleDraft, SchedulePatch};
use crate::service::schedule::ScheduleService;

/* =========================
Create schedule entry
========================= */
#[utoipa::path(
    post,
    path = "/api/schedules",
    request_body(
        content = ScheduleDraft,
        description = "Class slot to add to a course-division's timetable",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Schedule entry created", body = crate::model::schedule::ScheduleEntry),
        (status = 400, description = "Invalid reference, time format or range", body = Object,
         example = json!({ "message": "end_time must be after start_time" })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden or teacher not authorized for the subject"),
        (status = 404, description = "Course-division not found"),
        (status = 409, description = "Teacher or course double-booked", body = Object,
         example = json!({ "message": "teacher double-booked" }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Schedule"
)]
pub async fn create_schedule(
    auth: AuthUser,
    service: web::Data<ScheduleService>,
    payload: web::Json<ScheduleDraft>,
) -> actix_web::Result<impl Responder> {
    auth.require(Permission::ManageSchedules)?;
    let entry = service.create(&payload).await?;
    Ok(HttpResponse::Created().json(entry))
}

#[utoipa::path(
    get,
    path = "/api/schedules/{id}",
    params(
        ("id" = u64, Path, description = "Schedule entry id")
    ),
    responses(
        (status = 200, description = "Schedule entry", body = crate::model::schedule::ScheduleEntry),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Schedule entry not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Schedule"
)]
pub async fn get_schedule(
    auth: AuthUser,
    service: web::Data<ScheduleService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require(Permission::ViewSchedules)?;
    let entry = service.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(entry))
}

/// Partial update; the slot is re-validated when any timing or assignment
/// field changes.
#[utoipa::path(
    put,
    path = "/api/schedules/{id}",
    params(
        ("id" = u64, Path, description = "Schedule entry id")
    ),
    request_body(
        content = SchedulePatch,
        description = "Fields to change",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Schedule entry updated", body = crate::model::schedule::ScheduleEntry),
        (status = 400, description = "Invalid reference, time format or range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Schedule entry not found"),
        (status = 409, description = "Teacher or course double-booked")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Schedule"
)]
pub async fn update_schedule(
    auth: AuthUser,
    service: web::Data<ScheduleService>,
    path: web::Path<u64>,
    payload: web::Json<SchedulePatch>,
) -> actix_web::Result<impl Responder> {
    auth.require(Permission::ManageSchedules)?;
    let entry = service.update(path.into_inner(), &payload).await?;
    Ok(HttpResponse::Ok().json(entry))
}

#[utoipa::path(
    delete,
    path = "/api/schedules/{id}",
    params(
        ("id" = u64, Path, description = "Schedule entry id")
    ),
    responses(
        (status = 200, description = "Schedule entry deleted", body = Object,
         example = json!({ "message": "Schedule entry deleted" })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Schedule entry not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Schedule"
)]
pub async fn delete_schedule(
    auth: AuthUser,
    service: web::Data<ScheduleService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require(Permission::ManageSchedules)?;
    service.delete(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Schedule entry deleted"
    })))
}

#[utoipa::path(
    get,
    path = "/api/schedules/course-division/{id}",
    params(
        ("id" = u64, Path, description = "Course-division id")
    ),
    responses(
        (status = 200, description = "Entries ordered by day and start time", body = [crate::model::schedule::ScheduleEntry]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Schedule"
)]
pub async fn list_by_course_division(
    auth: AuthUser,
    service: web::Data<ScheduleService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require(Permission::ViewSchedules)?;
    let entries = service.list_by_course_division(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(entries))
}

#[utoipa::path(
    get,
    path = "/api/schedules/teacher/{id}",
    params(
        ("id" = u64, Path, description = "Teacher user id")
    ),
    responses(
        (status = 200, description = "Entries ordered by day and start time", body = [crate::model::schedule::ScheduleEntry]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Schedule"
)]
pub async fn list_by_teacher(
    auth: AuthUser,
    service: web::Data<ScheduleService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require(Permission::ViewSchedules)?;
    let entries = service.list_by_teacher(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(entries))
}
