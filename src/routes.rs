use crate::{
    api::{dashboard, import},
    auth::{handlers, middleware::session_middleware},
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
        let per_ms = (60_000 / requests_per_min as u64).max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .expect("non-zero period and burst size");
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Sign-in routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::get().to(handlers::login)),
            )
            .service(
                web::resource("/callback")
                    .wrap(login_limiter.clone())
                    .route(web::get().to(handlers::callback)),
            )
            .service(
                web::resource("/roster")
                    .wrap(login_limiter.clone())
                    .route(web::get().to(handlers::roster_candidates))
                    .route(web::post().to(handlers::roster_login)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Session-protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(session_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/v1")
                    .service(web::resource("/me").route(web::get().to(dashboard::me)))
                    .service(
                        web::resource("/attendance")
                            .route(web::get().to(dashboard::attendance_view)),
                    )
                    .service(
                        web::resource("/import").route(web::post().to(import::import_timesheet)),
                    ),
            ),
    );
}
