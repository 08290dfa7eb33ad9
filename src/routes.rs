use crate::{
    api::{self, attendance, classes, statistics, students},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::Condition, web};

// Per peer IP limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let burst = requests_per_min.max(1);
    let per_ms = (60_000 / burst as u64).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(burst)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    cfg.app_data(api::json_config())
        .app_data(api::query_config())
        .app_data(api::path_config());

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(Condition::new(
                config.rate_limit_per_min > 0,
                build_limiter(config.rate_limit_per_min),
            ))
            .service(
                web::scope("/classes")
                    // /classes
                    .service(
                        web::resource("")
                            .route(web::get().to(classes::list_classes))
                            .route(web::post().to(classes::create_class)),
                    )
                    // /classes/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(classes::get_class))
                            .route(web::put().to(classes::update_class))
                            .route(web::delete().to(classes::delete_class)),
                    ),
            )
            .service(
                web::scope("/students")
                    // /students
                    .service(
                        web::resource("")
                            .route(web::get().to(students::list_students))
                            .route(web::post().to(students::create_student)),
                    )
                    // /students/bulk
                    .service(
                        web::resource("/bulk")
                            .route(web::post().to(students::bulk_create_students)),
                    )
                    // /students/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(students::update_student))
                            .route(web::delete().to(students::delete_student)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("")
                            .route(web::get().to(attendance::list_attendance))
                            .route(web::post().to(attendance::save_attendance)),
                    )
                    // /attendance/daily
                    .service(web::resource("/daily").route(web::get().to(attendance::daily_log)))
                    // /attendance/bulk
                    .service(
                        web::resource("/bulk")
                            .route(web::post().to(attendance::bulk_save_attendance)),
                    )
                    // /attendance/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(attendance::update_attendance))
                            .route(web::delete().to(attendance::delete_attendance)),
                    ),
            )
            .service(
                web::scope("/statistics")
                    // /statistics
                    .service(
                        web::resource("").route(web::get().to(statistics::class_statistics)),
                    )
                    // /statistics/weekly
                    .service(
                        web::resource("/weekly")
                            .route(web::get().to(statistics::weekly_statistics)),
                    ),
            ),
    );
}
