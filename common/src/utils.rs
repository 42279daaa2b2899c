// common/src/utils.rs
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::Address;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Setup tracing for consistent logging across services
pub fn setup_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Current time as milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a fresh authentication nonce: 16 random bytes, hex encoded.
/// 128 bits of CSPRNG output is enough for global uniqueness with
/// overwhelming probability.
pub fn generate_auth_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a string using SHA-256
pub fn hash_string(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)
}

#[derive(Debug, Error)]
#[error("missing or malformed wallet address: {0}")]
pub struct AddressParseError(pub String);

/// Parse a wallet address, accepting any hex casing.
pub fn parse_wallet_address(raw: &str) -> Result<Address, AddressParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AddressParseError("(empty)".to_string()));
    }
    Address::from_str(trimmed).map_err(|_| AddressParseError(trimmed.to_string()))
}

/// Canonical store key for a wallet address
pub fn normalize_wallet_address(address: &Address) -> String {
    format!("{:#x}", address)
}

// Session token claims, wallet address as the stable subject
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,    // wallet address (lower-cased)
    pub wallet: String, // duplicated for older consumers that read `wallet`
    pub iat: usize,     // issued at time
    pub exp: usize,     // expiration time
}

fn unix_now_secs() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as usize
}

/// Generate a session JWT for an authenticated wallet
pub fn generate_session_token(
    wallet_address: &str,
    secret: &[u8],
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = unix_now_secs();
    let wallet = wallet_address.to_lowercase();

    let claims = SessionClaims {
        sub: wallet.clone(),
        wallet,
        iat: now,
        exp: now + ttl_secs as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

/// Validate a session JWT and extract the wallet address
pub fn validate_session_token(
    token: &str,
    secret: &[u8],
) -> Result<String, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<SessionClaims>(token, &DecodingKey::from_secret(secret), &validation)?;

    Ok(token_data.claims.sub)
}

// App-check attestation token claims, device id as the subject
#[derive(Debug, Serialize, Deserialize)]
pub struct AppCheckClaims {
    pub sub: String, // device id
    pub iat: usize,
    pub exp: usize,
}

/// Mint an app-check attestation token for an approved device.
/// Returns the token together with its expiry in epoch milliseconds.
pub fn mint_app_check_token(
    device_id: &str,
    secret: &[u8],
    ttl_secs: u64,
) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let now = unix_now_secs();
    let claims = AppCheckClaims {
        sub: device_id.to_string(),
        iat: now,
        exp: now + ttl_secs as usize,
    };

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))?;
    let expire_time_millis = (now as i64 + ttl_secs as i64) * 1000;

    Ok((token, expire_time_millis))
}
