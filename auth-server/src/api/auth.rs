// auth-server/src/api/auth.rs
use actix_web::{get, post, web, HttpResponse, Responder};
use common::{AuthMessageRequest, VerifyLoginRequest};
use serde_json::json;

use crate::error::AuthApiError;
use crate::protocol::AuthProtocolHandler;

#[get("/")]
pub async fn api_index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "SuperPool Authentication API",
        "version": "0.1.0"
    }))
}

// Issue a signing challenge for a wallet
#[post("/auth/message")]
pub async fn generate_auth_message(
    handler: web::Data<AuthProtocolHandler>,
    body: web::Json<AuthMessageRequest>,
) -> Result<HttpResponse, AuthApiError> {
    let response = handler.generate_message(&body.wallet_address).await?;
    Ok(HttpResponse::Ok().json(response))
}

// Verify a signed challenge and establish a session
#[post("/auth/verify")]
pub async fn verify_signature_and_login(
    handler: web::Data<AuthProtocolHandler>,
    body: web::Json<VerifyLoginRequest>,
) -> Result<HttpResponse, AuthApiError> {
    let response = handler.verify_and_login(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}
