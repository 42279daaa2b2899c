// auth-server/src/api/mod.rs
pub mod appcheck;
pub mod auth;

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(
        actix_web::web::scope("/api")
            .service(auth::api_index)
            .service(auth::generate_auth_message)
            .service(auth::verify_signature_and_login)
            .service(
                actix_web::web::resource("/app-check/mint")
                    .route(actix_web::web::post().to(appcheck::mint_app_check))
                    .route(actix_web::web::route().to(appcheck::method_not_allowed)),
            ),
    );
}
