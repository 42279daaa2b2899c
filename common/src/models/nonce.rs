// common/src/models/nonce.rs
use serde::{Deserialize, Serialize};

/// A pending authentication nonce, keyed by wallet address in the store.
///
/// One outstanding record per wallet: issuing a new message replaces any
/// prior record wholesale. A record past its expiry must be treated as
/// absent and removed on next access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthNonce {
    /// Opaque single-use random token
    pub nonce: String,
    /// Milliseconds since the Unix epoch
    pub issued_at: i64,
    /// Milliseconds since the Unix epoch; always greater than `issued_at`
    pub expires_at: i64,
}

impl AuthNonce {
    /// Create a fresh record expiring `ttl_secs` after `issued_at`.
    pub fn issue(nonce: String, issued_at: i64, ttl_secs: u64) -> Self {
        Self {
            nonce,
            issued_at,
            expires_at: issued_at + (ttl_secs as i64) * 1000,
        }
    }

    pub fn is_expired(&self, now_millis: i64) -> bool {
        now_millis > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_sets_expiry_after_issuance() {
        let record = AuthNonce::issue("abc".to_string(), 1_000, 600);
        assert_eq!(record.issued_at, 1_000);
        assert_eq!(record.expires_at, 601_000);
        assert!(record.expires_at > record.issued_at);
    }

    #[test]
    fn test_expiry_boundary() {
        let record = AuthNonce::issue("abc".to_string(), 0, 600);
        assert!(!record.is_expired(record.expires_at));
        assert!(record.is_expired(record.expires_at + 1));
    }
}
