// auth-server/src/store.rs
use actix::{Actor, AsyncContext, Context, Handler, Message, MessageResult};
use common::models::device::ApprovedDevice;
use common::models::nonce::AuthNonce;
use common::models::user::UserProfile;
use common::now_millis;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

// Default interval for sweeping expired nonces (seconds)
const DEFAULT_CLEANUP_INTERVAL: u64 = 600;

/// Actor message: store (or overwrite) the pending nonce for a wallet
#[derive(Message)]
#[rtype(result = "()")]
pub struct PutNonce {
    pub wallet_address: String,
    pub record: AuthNonce,
}

/// Actor message: read the pending nonce for a wallet
#[derive(Message)]
#[rtype(result = "Option<AuthNonce>")]
pub struct GetNonce {
    pub wallet_address: String,
}

/// Actor message: remove the pending nonce for a wallet (idempotent)
#[derive(Message)]
#[rtype(result = "bool")]
pub struct RemoveNonce {
    pub wallet_address: String,
    /// When set, only remove if the stored nonce still matches this value.
    /// A stale consumer can then never delete a freshly re-issued nonce.
    pub expected_nonce: Option<String>,
}

/// Actor message: create or update the user profile for a wallet
#[derive(Message)]
#[rtype(result = "UserProfile")]
pub struct UpsertUser {
    pub wallet_address: String,
}

/// Actor message: read a user profile
#[derive(Message)]
#[rtype(result = "Option<UserProfile>")]
pub struct GetUser {
    pub wallet_address: String,
}

/// Actor message: mark a device approved for a wallet
#[derive(Message)]
#[rtype(result = "()")]
pub struct ApproveDevice {
    pub device_id: String,
    pub wallet_address: String,
    pub platform: String,
}

/// Actor message: read an approved-device record
#[derive(Message)]
#[rtype(result = "Option<ApprovedDevice>")]
pub struct GetDevice {
    pub device_id: String,
}

/// Actor message: refresh a device's last-used timestamp
#[derive(Message)]
#[rtype(result = "bool")]
pub struct TouchDevice {
    pub device_id: String,
}

/// Actor message: sweep expired nonce records
#[derive(Message)]
#[rtype(result = "usize")]
pub struct CleanupExpiredNonces;

/// In-memory stand-in for the durable document store backing the protocol:
/// one map per collection (pending nonces, users, approved devices), all
/// keyed the way the backing store keys them.
pub struct AuthStoreActor {
    // Pending authentication nonces keyed by lower-cased wallet address
    nonces: Arc<DashMap<String, AuthNonce>>,
    // User profiles keyed by lower-cased wallet address
    users: Arc<DashMap<String, UserProfile>>,
    // Approved devices keyed by device id
    devices: Arc<DashMap<String, ApprovedDevice>>,
    // Cleanup interval in seconds
    cleanup_interval: u64,
}

impl Default for AuthStoreActor {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthStoreActor {
    pub fn new() -> Self {
        Self {
            nonces: Arc::new(DashMap::new()),
            users: Arc::new(DashMap::new()),
            devices: Arc::new(DashMap::new()),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }

    pub fn with_cleanup_interval(mut self, interval_seconds: u64) -> Self {
        self.cleanup_interval = interval_seconds;
        self
    }

    /// Remove nonce records past their expiry
    fn cleanup_nonces(&self) -> usize {
        let now = now_millis();

        // Collect expired wallet keys
        let expired: Vec<String> = self
            .nonces
            .iter()
            .filter_map(|entry| {
                if entry.value().is_expired(now) {
                    Some(entry.key().clone())
                } else {
                    None
                }
            })
            .collect();

        let mut removed = 0;
        for wallet in expired {
            // Re-check under the entry lock so a just-reissued nonce survives
            if self
                .nonces
                .remove_if(&wallet, |_, record| record.is_expired(now))
                .is_some()
            {
                removed += 1;
            }
        }

        removed
    }
}

impl Actor for AuthStoreActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            "AuthStoreActor started with nonce cleanup every {}s",
            self.cleanup_interval
        );

        // Schedule periodic nonce cleanup
        ctx.run_interval(Duration::from_secs(self.cleanup_interval), |act, _ctx| {
            let removed = act.cleanup_nonces();
            if removed > 0 {
                tracing::info!("Cleaned up {} expired nonces", removed);
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(
            "AuthStoreActor stopped with {} users and {} approved devices",
            self.users.len(),
            self.devices.len()
        );
    }
}

// Overwrite any prior nonce for this wallet; last write wins
impl Handler<PutNonce> for AuthStoreActor {
    type Result = ();

    fn handle(&mut self, msg: PutNonce, _ctx: &mut Self::Context) -> Self::Result {
        self.nonces.insert(msg.wallet_address, msg.record);
    }
}

impl Handler<GetNonce> for AuthStoreActor {
    type Result = MessageResult<GetNonce>;

    fn handle(&mut self, msg: GetNonce, _ctx: &mut Self::Context) -> Self::Result {
        let record = self
            .nonces
            .get(&msg.wallet_address)
            .map(|entry| entry.value().clone());
        MessageResult(record)
    }
}

impl Handler<RemoveNonce> for AuthStoreActor {
    type Result = MessageResult<RemoveNonce>;

    fn handle(&mut self, msg: RemoveNonce, _ctx: &mut Self::Context) -> Self::Result {
        let removed = match msg.expected_nonce {
            Some(expected) => self
                .nonces
                .remove_if(&msg.wallet_address, |_, record| record.nonce == expected)
                .is_some(),
            None => self.nonces.remove(&msg.wallet_address).is_some(),
        };
        MessageResult(removed)
    }
}

// Create on first login, advance updated_at on every later one
impl Handler<UpsertUser> for AuthStoreActor {
    type Result = MessageResult<UpsertUser>;

    fn handle(&mut self, msg: UpsertUser, _ctx: &mut Self::Context) -> Self::Result {
        let profile = if let Some(mut entry) = self.users.get_mut(&msg.wallet_address) {
            let profile = entry.value_mut();
            profile.touch();

            tracing::debug!("Updated profile for wallet: {}", msg.wallet_address);
            profile.clone()
        } else {
            let profile = UserProfile::new(msg.wallet_address.clone());
            self.users.insert(msg.wallet_address.clone(), profile.clone());

            tracing::info!("Created profile for wallet: {}", msg.wallet_address);
            profile
        };

        MessageResult(profile)
    }
}

impl Handler<GetUser> for AuthStoreActor {
    type Result = MessageResult<GetUser>;

    fn handle(&mut self, msg: GetUser, _ctx: &mut Self::Context) -> Self::Result {
        let profile = self
            .users
            .get(&msg.wallet_address)
            .map(|entry| entry.value().clone());
        MessageResult(profile)
    }
}

impl Handler<ApproveDevice> for AuthStoreActor {
    type Result = ();

    fn handle(&mut self, msg: ApproveDevice, _ctx: &mut Self::Context) -> Self::Result {
        if let Some(mut entry) = self.devices.get_mut(&msg.device_id) {
            let device = entry.value_mut();
            if device.wallet_address == msg.wallet_address {
                device.touch();
                tracing::debug!("Refreshed device approval: {}", msg.device_id);
                return;
            }
            // Device changed hands; replace the record wholesale
        }

        let device = ApprovedDevice::new(msg.device_id.clone(), msg.wallet_address, msg.platform);
        self.devices.insert(msg.device_id.clone(), device);
        tracing::info!("Approved device: {}", msg.device_id);
    }
}

impl Handler<GetDevice> for AuthStoreActor {
    type Result = MessageResult<GetDevice>;

    fn handle(&mut self, msg: GetDevice, _ctx: &mut Self::Context) -> Self::Result {
        let device = self
            .devices
            .get(&msg.device_id)
            .map(|entry| entry.value().clone());
        MessageResult(device)
    }
}

impl Handler<TouchDevice> for AuthStoreActor {
    type Result = MessageResult<TouchDevice>;

    fn handle(&mut self, msg: TouchDevice, _ctx: &mut Self::Context) -> Self::Result {
        let touched = if let Some(mut entry) = self.devices.get_mut(&msg.device_id) {
            entry.value_mut().touch();
            true
        } else {
            false
        };
        MessageResult(touched)
    }
}

impl Handler<CleanupExpiredNonces> for AuthStoreActor {
    type Result = MessageResult<CleanupExpiredNonces>;

    fn handle(&mut self, _msg: CleanupExpiredNonces, _ctx: &mut Self::Context) -> Self::Result {
        let removed = self.cleanup_nonces();
        tracing::info!("Cleaned up {} expired nonces", removed);
        MessageResult(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix::Actor;

    const WALLET: &str = "0x71c7656ec7ab88b098defb751b7401b5f6d8976f";

    #[actix_web::test]
    async fn test_put_overwrites_prior_nonce() {
        let store = AuthStoreActor::new().start();

        let first = AuthNonce::issue("first".to_string(), now_millis(), 600);
        let second = AuthNonce::issue("second".to_string(), now_millis(), 600);

        store
            .send(PutNonce { wallet_address: WALLET.to_string(), record: first })
            .await
            .unwrap();
        store
            .send(PutNonce { wallet_address: WALLET.to_string(), record: second })
            .await
            .unwrap();

        let stored = store
            .send(GetNonce { wallet_address: WALLET.to_string() })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.nonce, "second");
    }

    #[actix_web::test]
    async fn test_conditional_remove_skips_reissued_nonce() {
        let store = AuthStoreActor::new().start();

        let current = AuthNonce::issue("current".to_string(), now_millis(), 600);
        store
            .send(PutNonce { wallet_address: WALLET.to_string(), record: current })
            .await
            .unwrap();

        // A consumer holding a stale nonce value must not delete the record
        let removed = store
            .send(RemoveNonce {
                wallet_address: WALLET.to_string(),
                expected_nonce: Some("stale".to_string()),
            })
            .await
            .unwrap();
        assert!(!removed);

        let removed = store
            .send(RemoveNonce {
                wallet_address: WALLET.to_string(),
                expected_nonce: Some("current".to_string()),
            })
            .await
            .unwrap();
        assert!(removed);

        // Idempotent: a second delete reports nothing removed
        let removed = store
            .send(RemoveNonce { wallet_address: WALLET.to_string(), expected_nonce: None })
            .await
            .unwrap();
        assert!(!removed);
    }

    #[actix_web::test]
    async fn test_upsert_user_preserves_created_at() {
        let store = AuthStoreActor::new().start();

        let first = store
            .send(UpsertUser { wallet_address: WALLET.to_string() })
            .await
            .unwrap();
        assert_eq!(first.created_at, first.updated_at);

        let second = store
            .send(UpsertUser { wallet_address: WALLET.to_string() })
            .await
            .unwrap();
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);

        let fetched = store
            .send(GetUser { wallet_address: WALLET.to_string() })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.created_at, first.created_at);

        let missing = store
            .send(GetUser {
                wallet_address: "0x0000000000000000000000000000000000000001".to_string(),
            })
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[actix_web::test]
    async fn test_cleanup_removes_only_expired_nonces() {
        let store = AuthStoreActor::new().start();
        let now = now_millis();

        store
            .send(PutNonce {
                wallet_address: "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
                record: AuthNonce {
                    nonce: "old".to_string(),
                    issued_at: now - 700_000,
                    expires_at: now - 100_000,
                },
            })
            .await
            .unwrap();
        store
            .send(PutNonce {
                wallet_address: "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".to_string(),
                record: AuthNonce::issue("fresh".to_string(), now, 600),
            })
            .await
            .unwrap();

        let removed = store.send(CleanupExpiredNonces).await.unwrap();
        assert_eq!(removed, 1);

        let fresh = store
            .send(GetNonce {
                wallet_address: "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".to_string(),
            })
            .await
            .unwrap();
        assert!(fresh.is_some());
    }

    #[actix_web::test]
    async fn test_device_approval_round_trip() {
        let store = AuthStoreActor::new().start();

        store
            .send(ApproveDevice {
                device_id: "device-1".to_string(),
                wallet_address: WALLET.to_string(),
                platform: "ios".to_string(),
            })
            .await
            .unwrap();

        let device = store
            .send(GetDevice { device_id: "device-1".to_string() })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(device.wallet_address, WALLET);
        assert_eq!(device.platform, "ios");

        assert!(store
            .send(TouchDevice { device_id: "device-1".to_string() })
            .await
            .unwrap());
        assert!(!store
            .send(TouchDevice { device_id: "missing".to_string() })
            .await
            .unwrap());
    }
}
