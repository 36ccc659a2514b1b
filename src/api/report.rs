use actix_web::{HttpResponse, Responder, http::header, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::model::role::Permission;
use crate::service::export::XLSX_CONTENT_TYPE;
use crate::service::report::{ReportScope, ReportService};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AttendanceReportQuery {
    /// First day of the period
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub date_from: NaiveDate,
    /// Last day of the period, included
    #[schema(example = "2026-03-06", format = "date", value_type = String)]
    pub date_to: NaiveDate,
    /// Restrict to the students of a course-division; wins over `user_id`
    #[schema(example = 3)]
    pub course_division_id: Option<u64>,
    /// Restrict to one user
    #[schema(example = 42)]
    pub user_id: Option<u64>,
}

impl AttendanceReportQuery {
    fn scope(&self) -> ReportScope {
        ReportScope::from_query(self.course_division_id, self.user_id)
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PeriodQuery {
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub date_from: NaiveDate,
    #[schema(example = "2026-03-06", format = "date", value_type = String)]
    pub date_to: NaiveDate,
}

/// Daily attendance state per user and date.
#[utoipa::path(
    get,
    path = "/api/reports/attendance",
    params(AttendanceReportQuery),
    responses(
        (status = 200, description = "Daily records and any user/day that could not be computed", body = crate::service::report::DailyReport),
        (status = 400, description = "Invalid period"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Course-division or user not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Report"
)]
pub async fn attendance_report(
    auth: AuthUser,
    service: web::Data<ReportService>,
    query: web::Query<AttendanceReportQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require(Permission::ViewAttendanceReport)?;
    let report = service
        .generate_range_report(query.date_from, query.date_to, query.scope())
        .await?;
    Ok(HttpResponse::Ok().json(report))
}

/// The daily report as a spreadsheet download.
#[utoipa::path(
    get,
    path = "/api/reports/attendance/export/excel",
    params(AttendanceReportQuery),
    responses(
        (status = 200, description = "Workbook with one row per user and day", body = String,
         content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 400, description = "Invalid period"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Course-division or user not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Report"
)]
pub async fn export_attendance_excel(
    auth: AuthUser,
    service: web::Data<ReportService>,
    query: web::Query<AttendanceReportQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require(Permission::ViewAttendanceReport)?;
    let workbook = service
        .export_range_report(query.date_from, query.date_to, query.scope())
        .await?;
    let filename = format!("attendance_{}_{}.xlsx", query.date_from, query.date_to);
    Ok(HttpResponse::Ok()
        .content_type(XLSX_CONTENT_TYPE)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(workbook))
}

#[utoipa::path(
    get,
    path = "/api/reports/attendance/summary",
    params(AttendanceReportQuery),
    responses(
        (status = 200, description = "Counts and percentages per state", body = crate::service::report::AttendanceSummary),
        (status = 400, description = "Invalid period"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Report"
)]
pub async fn attendance_summary(
    auth: AuthUser,
    service: web::Data<ReportService>,
    query: web::Query<AttendanceReportQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require(Permission::ViewAttendanceSummary)?;
    let summary = service
        .generate_summary(query.date_from, query.date_to, query.scope())
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[utoipa::path(
    get,
    path = "/api/reports/attendance/subject/{id}",
    params(
        ("id" = u64, Path, description = "Subject assignment (course-division subject) id"),
        PeriodQuery
    ),
    responses(
        (status = 200, description = "Per-class presence of enrolled students", body = crate::service::report::ClassReport),
        (status = 400, description = "Invalid period"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Subject assignment not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Report"
)]
pub async fn subject_report(
    auth: AuthUser,
    service: web::Data<ReportService>,
    path: web::Path<u64>,
    query: web::Query<PeriodQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require(Permission::ViewAttendanceReport)?;
    let report = service
        .generate_subject_report(path.into_inner(), query.date_from, query.date_to)
        .await?;
    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    get,
    path = "/api/reports/teacher/{id}",
    params(
        ("id" = u64, Path, description = "Teacher user id"),
        PeriodQuery
    ),
    responses(
        (status = 200, description = "Teaching load", body = crate::service::report::TeacherSummary),
        (status = 400, description = "Invalid period"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Report"
)]
pub async fn teacher_report(
    auth: AuthUser,
    service: web::Data<ReportService>,
    path: web::Path<u64>,
    query: web::Query<PeriodQuery>,
) -> actix_web::Result<impl Responder> {
    let teacher_id = path.into_inner();
    auth.require_teacher_report_access(teacher_id)?;
    let summary = service
        .generate_teacher_report(teacher_id, query.date_from, query.date_to)
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}
