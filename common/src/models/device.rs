// common/src/models/device.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An approved device record, keyed by device id.
///
/// Written best-effort during login and consulted by the app-check minter
/// before issuing an attestation token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedDevice {
    pub device_id: String,
    pub wallet_address: String,
    pub approved_at: DateTime<Utc>,
    pub platform: String,
    pub last_used: DateTime<Utc>,
}

impl ApprovedDevice {
    pub fn new(device_id: String, wallet_address: String, platform: String) -> Self {
        let now = Utc::now();
        Self {
            device_id,
            wallet_address,
            approved_at: now,
            platform,
            last_used: now,
        }
    }

    /// Update the last-used timestamp
    pub fn touch(&mut self) {
        self.last_used = Utc::now();
    }
}
