use crate::{
    api::{attendance, device, report, schedule},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap_or_default();
        Governor::new(&cfg)
    }

    let device_limiter = Arc::new(build_limiter(config.rate_device_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Fingerprint readers carry no bearer token; registered before the
    // protected scope so it matches first.
    cfg.service(
        web::resource(format!("{}/device/biometric-record", config.api_prefix))
            .wrap(device_limiter)
            .route(web::post().to(device::biometric_record)),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/schedules")
                    // /schedules
                    .service(web::resource("").route(web::post().to(schedule::create_schedule)))
                    // /schedules/course-division/{id}
                    .service(
                        web::resource("/course-division/{id}")
                            .route(web::get().to(schedule::list_by_course_division)),
                    )
                    // /schedules/teacher/{id}
                    .service(
                        web::resource("/teacher/{id}")
                            .route(web::get().to(schedule::list_by_teacher)),
                    )
                    // /schedules/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(schedule::get_schedule))
                            .route(web::put().to(schedule::update_schedule))
                            .route(web::delete().to(schedule::delete_schedule)),
                    ),
            )
            .service(
                web::scope("/attendance/records")
                    .service(
                        web::resource("")
                            .route(web::post().to(attendance::record_attendance))
                            .route(web::get().to(attendance::list_records)),
                    )
                    .service(
                        web::resource("/manual")
                            .route(web::post().to(attendance::record_manual_attendance)),
                    )
                    .service(
                        web::resource("/user/{id}")
                            .route(web::get().to(attendance::list_user_records)),
                    ),
            )
            .service(
                web::scope("/reports")
                    .service(
                        web::resource("/attendance").route(web::get().to(report::attendance_report)),
                    )
                    .service(
                        web::resource("/attendance/export/excel")
                            .route(web::get().to(report::export_attendance_excel)),
                    )
                    .service(
                        web::resource("/attendance/summary")
                            .route(web::get().to(report::attendance_summary)),
                    )
                    .service(
                        web::resource("/attendance/subject/{id}")
                            .route(web::get().to(report::subject_report)),
                    )
                    .service(
                        web::resource("/teacher/{id}").route(web::get().to(report::teacher_report)),
                    ),
            ),
    );
}
