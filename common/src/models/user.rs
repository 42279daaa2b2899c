// common/src/models/user.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User profile created on first successful authentication.
///
/// Keyed by lower-cased wallet address. `created_at` is immutable after the
/// first write; `updated_at` advances on every successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub wallet_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Create a new profile; `created_at == updated_at` on first write.
    pub fn new(wallet_address: String) -> Self {
        let now = Utc::now();
        Self {
            wallet_address,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a successful login
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
