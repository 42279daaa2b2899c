// auth-server/src/protocol.rs
use actix::Addr;
use common::models::nonce::AuthNonce;
use common::{
    auth_message, generate_auth_nonce, generate_session_token, hash_string, normalize_wallet_address,
    now_millis, parse_wallet_address, AuthMessageResponse, Config, LoginResponse, SignatureKind,
    VerifyLoginRequest,
};
use std::sync::Arc;

use crate::error::AuthApiError;
use crate::store::{
    ApproveDevice, AuthStoreActor, GetNonce, PutNonce, RemoveNonce, UpsertUser,
};
use crate::verify::{SignatureVerifier, VerificationInput, VerifyError};

/// Server-side authentication protocol handler.
///
/// Owns the two callable operations of the handshake: issuing a signing
/// challenge and verifying the signed result into a session. All durable
/// state lives behind the store actor; this type holds no mutable state of
/// its own and is safe to share across requests.
pub struct AuthProtocolHandler {
    store: Addr<AuthStoreActor>,
    verifier: SignatureVerifier,
    config: Arc<Config>,
}

impl AuthProtocolHandler {
    pub fn new(store: Addr<AuthStoreActor>, verifier: SignatureVerifier, config: Arc<Config>) -> Self {
        Self {
            store,
            verifier,
            config,
        }
    }

    /// Issue a fresh signing challenge for a wallet.
    ///
    /// Overwrites any prior pending nonce: a new message invalidates every
    /// earlier in-flight attempt for this wallet, which is the cross-device
    /// safety net.
    pub async fn generate_message(
        &self,
        wallet_address: &str,
    ) -> Result<AuthMessageResponse, AuthApiError> {
        let address = parse_wallet_address(wallet_address)
            .map_err(|e| AuthApiError::InvalidArgument(e.to_string()))?;
        let key = normalize_wallet_address(&address);

        let nonce = generate_auth_nonce();
        let issued_at = now_millis();
        let record = AuthNonce::issue(nonce.clone(), issued_at, self.config.nonce.ttl_secs);

        self.store
            .send(PutNonce {
                wallet_address: key.clone(),
                record,
            })
            .await
            .map_err(|e| AuthApiError::Internal(format!("nonce store unavailable: {}", e)))?;

        tracing::info!("Issued authentication nonce for wallet {}", key);

        let message = auth_message(&address.to_checksum(None), &nonce, issued_at);
        Ok(AuthMessageResponse {
            message,
            nonce,
            timestamp: issued_at,
        })
    }

    /// Verify a signed challenge and establish a session.
    pub async fn verify_and_login(
        &self,
        request: VerifyLoginRequest,
    ) -> Result<LoginResponse, AuthApiError> {
        // Validate inputs, one specific message per violation
        let address = parse_wallet_address(&request.wallet_address)
            .map_err(|e| AuthApiError::InvalidArgument(e.to_string()))?;
        let key = normalize_wallet_address(&address);

        if request.signature.is_empty() {
            return Err(AuthApiError::InvalidArgument(
                "signature must not be empty".to_string(),
            ));
        }
        if request.signature_type != SignatureKind::SafeWallet {
            let Some(raw) = request.signature.strip_prefix("0x") else {
                return Err(AuthApiError::InvalidArgument(
                    "signature must be a 0x-prefixed hex string".to_string(),
                ));
            };
            if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(AuthApiError::InvalidArgument(
                    "signature contains non-hexadecimal characters".to_string(),
                ));
            }
        }

        // Load the pending nonce
        let record = self
            .store
            .send(GetNonce {
                wallet_address: key.clone(),
            })
            .await
            .map_err(|e| AuthApiError::Internal(format!("nonce store unavailable: {}", e)))?
            .ok_or(AuthApiError::NonceNotFound)?;

        // Expiry: the only path that consumes a nonce without full
        // authentication, so stale records never linger
        let now = now_millis();
        if record.is_expired(now) {
            let removed = self
                .store
                .send(RemoveNonce {
                    wallet_address: key.clone(),
                    expected_nonce: Some(record.nonce.clone()),
                })
                .await
                .unwrap_or(false);
            if !removed {
                tracing::warn!("Expired nonce for {} was already gone", key);
            }
            return Err(AuthApiError::NonceExpired);
        }

        // Rebuild the exact message that was signed
        let message = auth_message(&address.to_checksum(None), &record.nonce, record.issued_at);

        // Verify the signature for the declared kind
        let chain_id = request
            .chain_id
            .unwrap_or(self.config.chains.default_chain_id);
        let verification = self
            .verifier
            .verify(
                request.signature_type,
                VerificationInput {
                    wallet: address,
                    message: &message,
                    nonce: &record.nonce,
                    timestamp: record.issued_at,
                    chain_id,
                    signature: &request.signature,
                },
            )
            .await;

        if let Err(e) = verification {
            match &e {
                VerifyError::AddressMismatch { .. } => {
                    tracing::warn!("Address mismatch during login for {}: {}", key, e)
                }
                _ => tracing::info!("Signature verification failed for {}: {}", key, e),
            }
            return Err(AuthApiError::Unauthenticated(e.to_string()));
        }

        // Upsert the profile; failure here is fatal since downstream systems
        // depend on the profile existing
        let user = self
            .store
            .send(UpsertUser {
                wallet_address: key.clone(),
            })
            .await
            .map_err(|e| AuthApiError::Internal(format!("profile store unavailable: {}", e)))?;

        // Best-effort device approval; never blocks authentication
        self.approve_device(&request, &key).await;

        // Best-effort nonce deletion (anti-replay). Conditional on the value
        // we verified, so a freshly re-issued nonce is never consumed here.
        match self
            .store
            .send(RemoveNonce {
                wallet_address: key.clone(),
                expected_nonce: Some(record.nonce.clone()),
            })
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::warn!("Nonce for {} was already replaced or consumed", key),
            Err(e) => tracing::warn!("Failed to delete nonce for {}: {}", key, e),
        }

        // Issue the session token with the wallet as the stable subject
        let session_token = generate_session_token(
            &key,
            self.config.session.jwt_secret.as_bytes(),
            self.config.session.token_ttl_secs,
        )
        .map_err(|e| {
            tracing::error!("Session token issuance failed for {}: {}", key, e);
            AuthApiError::Unauthenticated("failed to generate a valid session token".to_string())
        })?;

        tracing::info!("Wallet {} authenticated", key);

        Ok(LoginResponse {
            session_token,
            user,
        })
    }

    async fn approve_device(&self, request: &VerifyLoginRequest, wallet_key: &str) {
        let (device_id, platform) = match (&request.device_id, &request.platform) {
            (Some(device_id), Some(platform)) => (device_id.clone(), platform.clone()),
            _ => return,
        };

        // Safe wallets have no single originating device; derive a stable id
        // from the wallet instead of trusting the client-supplied one
        let device_id = if request.signature_type == SignatureKind::SafeWallet {
            format!("safe-{}", &hash_string(wallet_key)[..16])
        } else {
            device_id
        };

        if let Err(e) = self
            .store
            .send(ApproveDevice {
                device_id: device_id.clone(),
                wallet_address: wallet_key.to_string(),
                platform,
            })
            .await
        {
            tracing::warn!("Device approval failed for {}: {}", device_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GetDevice;
    use crate::verify::safe::testing::StaticSafeGateway;
    use crate::verify::typed;
    use actix::Actor;
    use alloy_primitives::B256;
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;

    fn test_signer() -> PrivateKeySigner {
        PrivateKeySigner::from_bytes(&B256::from([0x42u8; 32])).expect("valid secret")
    }

    fn handler_with_gateway(gateway: StaticSafeGateway) -> AuthProtocolHandler {
        let store = AuthStoreActor::new().start();
        let config = Arc::new(Config::default());
        AuthProtocolHandler::new(store, SignatureVerifier::new(Arc::new(gateway)), config)
    }

    fn handler() -> AuthProtocolHandler {
        handler_with_gateway(StaticSafeGateway::accepting())
    }

    fn hex_signature(signature: &alloy_primitives::Signature) -> String {
        format!("0x{}", hex::encode(signature.as_bytes()))
    }

    fn verify_request(wallet: &str, signature: String) -> VerifyLoginRequest {
        VerifyLoginRequest {
            wallet_address: wallet.to_string(),
            signature,
            signature_type: SignatureKind::PersonalSign,
            chain_id: None,
            device_id: None,
            platform: None,
        }
    }

    #[actix_web::test]
    async fn test_happy_path_personal_sign() {
        let handler = handler();
        let signer = test_signer();
        let wallet = signer.address().to_checksum(None);

        let challenge = handler.generate_message(&wallet).await.unwrap();
        assert!(challenge.message.contains(&wallet));
        assert!(challenge.message.contains(&challenge.nonce));

        let signature = signer.sign_message_sync(challenge.message.as_bytes()).unwrap();
        let login = handler
            .verify_and_login(verify_request(&wallet, hex_signature(&signature)))
            .await
            .unwrap();

        assert!(!login.session_token.is_empty());
        assert_eq!(login.user.wallet_address, wallet.to_lowercase());
        assert_eq!(login.user.created_at, login.user.updated_at);
    }

    #[actix_web::test]
    async fn test_replay_is_rejected() {
        let handler = handler();
        let signer = test_signer();
        let wallet = signer.address().to_checksum(None);

        let challenge = handler.generate_message(&wallet).await.unwrap();
        let signature = signer.sign_message_sync(challenge.message.as_bytes()).unwrap();
        let request = verify_request(&wallet, hex_signature(&signature));

        handler.verify_and_login(request.clone()).await.unwrap();

        // The nonce was consumed; replaying the identical request fails
        let err = handler.verify_and_login(request).await.unwrap_err();
        assert!(matches!(err, AuthApiError::NonceNotFound));
    }

    #[actix_web::test]
    async fn test_expired_nonce_is_consumed_and_rejected() {
        let handler = handler();
        let signer = test_signer();
        let wallet = signer.address().to_checksum(None);
        let key = wallet.to_lowercase();

        let now = now_millis();
        handler
            .store
            .send(PutNonce {
                wallet_address: key.clone(),
                record: AuthNonce {
                    nonce: "expired".to_string(),
                    issued_at: now - 700_000,
                    expires_at: now - 1,
                },
            })
            .await
            .unwrap();

        let dummy = format!("0x{}", hex::encode([0x11u8; 65]));
        let err = handler
            .verify_and_login(verify_request(&wallet, dummy))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthApiError::NonceExpired));

        // The record must be gone afterwards
        let remaining = handler
            .store
            .send(GetNonce { wallet_address: key })
            .await
            .unwrap();
        assert!(remaining.is_none());
    }

    #[actix_web::test]
    async fn test_address_mismatch_is_distinct_from_invalid_signature() {
        let handler = handler();
        let claimed = test_signer();
        let other = PrivateKeySigner::from_bytes(&B256::from([0x43u8; 32])).unwrap();
        let wallet = claimed.address().to_checksum(None);

        let challenge = handler.generate_message(&wallet).await.unwrap();
        let signature = other.sign_message_sync(challenge.message.as_bytes()).unwrap();

        let err = handler
            .verify_and_login(verify_request(&wallet, hex_signature(&signature)))
            .await
            .unwrap_err();

        match err {
            AuthApiError::Unauthenticated(message) => {
                assert!(message.contains("not the claimed wallet"));
            }
            other => panic!("expected Unauthenticated, got {:?}", other),
        }
    }

    #[actix_web::test]
    async fn test_input_validation_messages_are_specific() {
        let handler = handler();
        let wallet = test_signer().address().to_checksum(None);

        let err = handler
            .verify_and_login(verify_request("", "0x11".to_string()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("wallet address"));

        let err = handler
            .verify_and_login(verify_request(&wallet, String::new()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("must not be empty"));

        let err = handler
            .verify_and_login(verify_request(&wallet, "deadbeef".to_string()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("0x-prefixed"));

        let err = handler
            .verify_and_login(verify_request(&wallet, "0xnot-hex".to_string()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("non-hexadecimal"));
    }

    #[actix_web::test]
    async fn test_typed_data_login() {
        let handler = handler();
        let signer = test_signer();
        let wallet = signer.address().to_checksum(None);

        let challenge = handler.generate_message(&wallet).await.unwrap();
        let hash = typed::typed_data_hash(signer.address(), &challenge.nonce, challenge.timestamp, 1);
        let signature = signer.sign_hash_sync(&hash).unwrap();

        let mut request = verify_request(&wallet, hex_signature(&signature));
        request.signature_type = SignatureKind::TypedData;
        request.chain_id = Some(1);

        let login = handler.verify_and_login(request).await.unwrap();
        assert!(!login.session_token.is_empty());
    }

    #[actix_web::test]
    async fn test_safe_wallet_login_and_derived_device_id() {
        let handler = handler();
        let wallet = test_signer().address().to_checksum(None);
        let key = wallet.to_lowercase();

        handler.generate_message(&wallet).await.unwrap();

        let mut request = verify_request(&wallet, format!("0x{}", hex::encode([0x22u8; 130])));
        request.signature_type = SignatureKind::SafeWallet;
        request.device_id = Some("client-supplied".to_string());
        request.platform = Some("ios".to_string());

        handler.verify_and_login(request).await.unwrap();

        // The approval must use the wallet-derived id, not the raw client one
        let derived = format!("safe-{}", &hash_string(&key)[..16]);
        let device = handler
            .store
            .send(GetDevice { device_id: derived })
            .await
            .unwrap();
        assert!(device.is_some());

        let raw = handler
            .store
            .send(GetDevice { device_id: "client-supplied".to_string() })
            .await
            .unwrap();
        assert!(raw.is_none());
    }

    #[actix_web::test]
    async fn test_safe_wallet_rejection_embeds_reason() {
        let handler = handler_with_gateway(StaticSafeGateway::rejecting());
        let wallet = test_signer().address().to_checksum(None);

        handler.generate_message(&wallet).await.unwrap();

        let mut request = verify_request(&wallet, format!("0x{}", hex::encode([0x22u8; 130])));
        request.signature_type = SignatureKind::SafeWallet;

        let err = handler.verify_and_login(request).await.unwrap_err();
        match err {
            AuthApiError::Unauthenticated(message) => {
                assert!(message.contains("Safe wallet verification failed"));
            }
            other => panic!("expected Unauthenticated, got {:?}", other),
        }
    }

    #[actix_web::test]
    async fn test_updated_at_advances_on_second_login() {
        let handler = handler();
        let signer = test_signer();
        let wallet = signer.address().to_checksum(None);

        let challenge = handler.generate_message(&wallet).await.unwrap();
        let signature = signer.sign_message_sync(challenge.message.as_bytes()).unwrap();
        let first = handler
            .verify_and_login(verify_request(&wallet, hex_signature(&signature)))
            .await
            .unwrap();

        let challenge = handler.generate_message(&wallet).await.unwrap();
        let signature = signer.sign_message_sync(challenge.message.as_bytes()).unwrap();
        let second = handler
            .verify_and_login(verify_request(&wallet, hex_signature(&signature)))
            .await
            .unwrap();

        assert_eq!(second.user.created_at, first.user.created_at);
        assert!(second.user.updated_at >= first.user.updated_at);
    }
}
