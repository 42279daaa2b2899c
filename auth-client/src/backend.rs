// auth-client/src/backend.rs
use async_trait::async_trait;
use common::{
    AuthMessageRequest, AuthMessageResponse, ErrorBody, LoginResponse, VerifyLoginRequest,
};
use thiserror::Error;

/// Backend failure taxonomy, mirrored from the server's wire codes so the
/// caller can pick its remedy: restart the flow, retry after backoff, or
/// give up.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid request: {0}")]
    InvalidArgument(String),

    #[error("no pending authentication message: {0}")]
    NotFound(String),

    #[error("authentication message expired: {0}")]
    DeadlineExceeded(String),

    #[error("authentication rejected: {0}")]
    Unauthenticated(String),

    #[error("backend failure: {0}")]
    Internal(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// The two callable operations of the authentication protocol
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn generate_auth_message(
        &self,
        wallet_address: &str,
    ) -> Result<AuthMessageResponse, BackendError>;

    async fn verify_and_login(
        &self,
        request: VerifyLoginRequest,
    ) -> Result<LoginResponse, BackendError>;
}

/// HTTP client for the auth-server API
pub struct HttpAuthBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn decode_error(response: reqwest::Response) -> BackendError {
        let status = response.status();
        let body: ErrorBody = match response.json().await {
            Ok(body) => body,
            Err(e) => return BackendError::Transport(format!("unreadable error body: {}", e)),
        };

        match body.code.as_str() {
            "invalid-argument" => BackendError::InvalidArgument(body.error),
            "not-found" => BackendError::NotFound(body.error),
            "deadline-exceeded" => BackendError::DeadlineExceeded(body.error),
            "unauthenticated" => BackendError::Unauthenticated(body.error),
            _ if status.is_server_error() => BackendError::Internal(body.error),
            _ => BackendError::Internal(format!("{} ({})", body.error, body.code)),
        }
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn generate_auth_message(
        &self,
        wallet_address: &str,
    ) -> Result<AuthMessageResponse, BackendError> {
        let url = format!("{}/api/auth/message", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&AuthMessageRequest {
                wallet_address: wallet_address.to_string(),
            })
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))
    }

    async fn verify_and_login(
        &self,
        request: VerifyLoginRequest,
    ) -> Result<LoginResponse, BackendError> {
        let url = format!("{}/api/auth/verify", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))
    }
}
