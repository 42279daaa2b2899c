// common/src/types.rs
use serde::{Deserialize, Serialize};

use crate::models::user::UserProfile;

/// How the client produced the signature.
///
/// An explicit tag chosen by the caller, never sniffed from the payload.
/// Defaults to personal-sign so older clients that omit the field keep
/// working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignatureKind {
    #[default]
    #[serde(rename = "personal-sign")]
    PersonalSign,
    #[serde(rename = "typed-data")]
    TypedData,
    #[serde(rename = "safe-wallet")]
    SafeWallet,
}

/// Request body for `POST /api/auth/message`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthMessageRequest {
    pub wallet_address: String,
}

/// Response for `POST /api/auth/message`
///
/// The nonce and timestamp are returned alongside the formatted message so
/// typed-data clients can populate the EIP-712 payload with the same values
/// the server will verify against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthMessageResponse {
    pub message: String,
    pub nonce: String,
    pub timestamp: i64,
}

/// Request body for `POST /api/auth/verify`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyLoginRequest {
    pub wallet_address: String,
    pub signature: String,
    #[serde(default)]
    pub signature_type: SignatureKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

/// Response for `POST /api/auth/verify`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub session_token: String,
    pub user: UserProfile,
}

/// Request body for `POST /api/app-check/mint`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppCheckMintRequest {
    pub device_id: String,
}

/// Response for `POST /api/app-check/mint`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppCheckMintResponse {
    pub app_check_token: String,
    pub expire_time_millis: i64,
}

/// Error body returned by every failing endpoint.
///
/// `code` carries the machine-readable kind so clients can pick a remedy
/// without parsing the message text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}
