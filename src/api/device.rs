use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::service::attendance::{AttendanceService, BiometricOutcome};

#[derive(Deserialize, ToSchema)]
pub struct BiometricRecord {
    /// Fingerprint template as read by the sensor
    #[schema(example = "a1b2c3d4")]
    pub template: String,
    #[schema(example = "ESP32_MAIN_DOOR")]
    pub device_identifier: String,
}

/// Check endpoint for fingerprint readers. No bearer token; readers are
/// identified by their registered identifier.
#[utoipa::path(
    post,
    path = "/api/device/biometric-record",
    request_body(
        content = BiometricRecord,
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Check recorded", body = BiometricOutcome),
        (status = 400, description = "Missing template or device identifier", body = BiometricOutcome),
        (status = 401, description = "Fingerprint not registered or device not authorized", body = BiometricOutcome),
        (status = 500, description = "Internal server error")
    ),
    tag = "Device"
)]
pub async fn biometric_record(
    service: web::Data<AttendanceService>,
    payload: web::Json<BiometricRecord>,
) -> actix_web::Result<impl Responder> {
    let template = payload.template.trim();
    let device = payload.device_identifier.trim();
    if template.is_empty() || device.is_empty() {
        return Ok(HttpResponse::BadRequest().json(BiometricOutcome::rejected(
            "template and device_identifier are required",
        )));
    }

    let outcome = service.record_biometric(template, device).await?;
    if outcome.success {
        Ok(HttpResponse::Ok().json(outcome))
    } else {
        Ok(HttpResponse::Unauthorized().json(outcome))
    }
}
