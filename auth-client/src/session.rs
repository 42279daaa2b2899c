// auth-client/src/session.rs
use async_trait::async_trait;
use common::models::user::UserProfile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store failure: {0}")]
    Store(String),
}

/// Where an established session lands client-side, and how it is torn down
/// again when a late consistency check invalidates it.
#[async_trait]
pub trait SessionSink: Send + Sync {
    async fn establish(&self, session_token: &str, user: &UserProfile) -> Result<(), SessionError>;

    async fn invalidate(&self) -> Result<(), SessionError>;
}
