// auth-server/src/main.rs
use std::sync::Arc;

use actix::Actor;
use actix_web::{web, App, HttpServer};

use auth_server::api;
use auth_server::middleware::rate_limiter::RateLimiter;
use auth_server::protocol::AuthProtocolHandler;
use auth_server::store::AuthStoreActor;
use auth_server::verify::safe::JsonRpcSafeGateway;
use auth_server::verify::SignatureVerifier;
use common::{setup_tracing, Config};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Setup tracing
    setup_tracing();

    // Load configuration
    let config = Arc::new(Config::from_env());
    let server_addr = config.auth_server_addr.clone();

    tracing::info!("Starting authentication server on {}", server_addr);

    // Start the store actor with periodic nonce cleanup
    let store = AuthStoreActor::new()
        .with_cleanup_interval(config.nonce.cleanup_interval_secs)
        .start();

    // Safe verification talks to the configured JSON-RPC providers
    let gateway = Arc::new(JsonRpcSafeGateway::new(config.chains.clone()));
    let handler =
        AuthProtocolHandler::new(store.clone(), SignatureVerifier::new(gateway), config.clone());

    let store_data = web::Data::new(store);
    let handler_data = web::Data::new(handler);
    let config_data = web::Data::new(config.as_ref().clone());

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(store_data.clone())
            .app_data(handler_data.clone())
            .app_data(config_data.clone())
            .wrap(RateLimiter::new(vec![
                "/api/auth/message".to_string(),
                "/api/app-check/mint".to_string(),
            ]))
            .configure(api::configure)
    })
    .bind(&server_addr)?
    .run()
    .await
}
