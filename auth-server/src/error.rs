// auth-server/src/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use common::ErrorBody;
use thiserror::Error;

/// Typed failure taxonomy for the authentication protocol.
///
/// Each variant maps to a wire code the client uses to pick its remedy:
/// restart the flow, retry after backoff, or surface the failure.
#[derive(Debug, Error)]
pub enum AuthApiError {
    /// Malformed or missing request fields; never retried automatically
    #[error("{0}")]
    InvalidArgument(String),

    /// No pending nonce for this wallet; the client must request a new message
    #[error("no authentication message found for this wallet, generate a new one")]
    NonceNotFound,

    /// The pending nonce expired; same remedy as NonceNotFound
    #[error("authentication message expired, generate a new one")]
    NonceExpired,

    /// Signature invalid, address mismatch, or token issuance failed
    #[error("{0}")]
    Unauthenticated(String),

    /// Store or service failure; safe to retry after backoff
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthApiError {
    /// Machine-readable error code carried in the response body
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid-argument",
            Self::NonceNotFound => "not-found",
            Self::NonceExpired => "deadline-exceeded",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Internal(_) => "internal",
        }
    }
}

impl ResponseError for AuthApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::NonceNotFound => StatusCode::NOT_FOUND,
            Self::NonceExpired => StatusCode::GONE,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
            code: self.code().to_string(),
        })
    }
}
