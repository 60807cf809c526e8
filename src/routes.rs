use std::sync::Arc;

use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

use crate::{
    api::{advance, attendance, identity, leave, notification, report},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let otp_limiter = Arc::new(build_limiter(config.rate_otp_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/send-otp")
                    .wrap(otp_limiter.clone())
                    .route(web::post().to(handlers::send_otp)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/identities")
                    .service(
                        web::resource("").route(web::post().to(identity::register_identity)),
                    )
                    .service(
                        web::resource("/employees")
                            .route(web::get().to(identity::list_employees)),
                    )
                    .service(
                        web::resource("/employees/{emp_code}")
                            .route(web::get().to(identity::get_employee_by_code)),
                    )
                    .service(
                        web::resource("/supervisors")
                            .route(web::get().to(identity::list_supervisors)),
                    )
                    .service(
                        web::resource("/assigned")
                            .route(web::get().to(identity::assigned_employees)),
                    )
                    .service(
                        web::resource("/{id}/disable")
                            .route(web::put().to(identity::disable_identity)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("")
                            .route(web::post().to(attendance::mark_attendance))
                            .route(web::get().to(attendance::list_attendance)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(attendance::correct_attendance)),
                    ),
            )
            .service(
                web::scope("/leave")
                    .service(web::resource("/apply").route(web::post().to(leave::apply_leave)))
                    .service(
                        web::resource("/update/{id}")
                            .route(web::put().to(leave::supervisor_decide)),
                    )
                    .service(
                        web::resource("/hr/update/{id}").route(web::put().to(leave::hr_decide)),
                    )
                    .service(
                        web::resource("/admin/update/{id}")
                            .route(web::put().to(leave::admin_decide)),
                    )
                    .service(
                        web::resource("/supervisor")
                            .route(web::get().to(leave::supervisor_queue)),
                    )
                    .service(web::resource("/hr").route(web::get().to(leave::hr_queue)))
                    .service(web::resource("/admin").route(web::get().to(leave::admin_queue)))
                    .service(
                        web::resource("/employee").route(web::get().to(leave::employee_history)),
                    )
                    .service(web::resource("/seen/{id}").route(web::put().to(leave::mark_seen))),
            )
            .service(
                web::scope("/advance")
                    .service(web::resource("/apply").route(web::post().to(advance::apply_advance)))
                    .service(
                        web::resource("/update/{id}")
                            .route(web::put().to(advance::supervisor_decide)),
                    )
                    .service(
                        web::resource("/hr/update/{id}").route(web::put().to(advance::hr_decide)),
                    )
                    .service(
                        web::resource("/admin/update/{id}")
                            .route(web::put().to(advance::admin_decide)),
                    )
                    .service(
                        web::resource("/supervisor")
                            .route(web::get().to(advance::supervisor_queue)),
                    )
                    .service(web::resource("/hr").route(web::get().to(advance::hr_queue)))
                    .service(web::resource("/admin").route(web::get().to(advance::admin_queue)))
                    .service(
                        web::resource("/employee")
                            .route(web::get().to(advance::employee_history)),
                    )
                    .service(web::resource("/seen/{id}").route(web::put().to(advance::mark_seen))),
            )
            .service(
                web::scope("/notifications")
                    .service(
                        web::resource("").route(web::get().to(notification::my_notifications)),
                    )
                    .service(
                        web::resource("/seen/{id}").route(web::put().to(notification::mark_seen)),
                    ),
            )
            .service(
                web::scope("/reports")
                    .service(
                        web::resource("/attendance-monthly")
                            .route(web::get().to(report::monthly_report)),
                    )
                    .service(
                        web::resource("/attendance-summary")
                            .route(web::get().to(report::summary_report)),
                    )
                    .service(web::resource("/salary").route(web::put().to(report::update_salary))),
            ),
    );
}
