// auth-server/src/api/appcheck.rs
use actix::Addr;
use actix_web::{web, HttpResponse, Responder};
use common::{mint_app_check_token, AppCheckMintRequest, AppCheckMintResponse, Config};
use serde_json::json;

use crate::store::{AuthStoreActor, GetDevice, TouchDevice};

// Mint a device-attestation token for an approved device (POST only)
pub async fn mint_app_check(
    store: web::Data<Addr<AuthStoreActor>>,
    config: web::Data<Config>,
    body: web::Json<AppCheckMintRequest>,
) -> impl Responder {
    let device_id = body.device_id.trim();
    if device_id.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Missing device id",
            "code": "invalid-argument"
        }));
    }

    // The device must have been approved during a prior login
    let device = match store.send(GetDevice { device_id: device_id.to_string() }).await {
        Ok(Some(device)) => device,
        Ok(None) => {
            tracing::warn!("App-check mint refused for unapproved device: {}", device_id);
            return HttpResponse::Forbidden().json(json!({
                "error": "Device not approved",
                "code": "permission-denied"
            }));
        }
        Err(e) => {
            tracing::error!("Device lookup failed for {}: {}", device_id, e);
            return HttpResponse::Forbidden().json(json!({
                "error": "Device verification failed",
                "code": "permission-denied"
            }));
        }
    };

    if config.app_check.secret.is_empty() {
        tracing::error!("App-check secret is not configured");
        return HttpResponse::InternalServerError().json(json!({
            "error": "Missing server configuration",
            "code": "internal"
        }));
    }

    match mint_app_check_token(
        &device.device_id,
        config.app_check.secret.as_bytes(),
        config.app_check.token_ttl_secs,
    ) {
        Ok((app_check_token, expire_time_millis)) => {
            // Refresh last_used, best effort
            if store
                .send(TouchDevice { device_id: device.device_id.clone() })
                .await
                .is_err()
            {
                tracing::warn!("Failed to refresh last_used for device {}", device.device_id);
            }

            tracing::info!("Minted app-check token for device {}", device.device_id);
            HttpResponse::Ok().json(AppCheckMintResponse {
                app_check_token,
                expire_time_millis,
            })
        }
        Err(e) => {
            tracing::error!("Failed to mint app-check token for {}: {}", device.device_id, e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Token minting failed",
                "code": "internal"
            }))
        }
    }
}

// Everything except POST gets a 405
pub async fn method_not_allowed() -> impl Responder {
    HttpResponse::MethodNotAllowed().json(json!({
        "error": "Method not allowed",
        "code": "method-not-allowed"
    }))
}
