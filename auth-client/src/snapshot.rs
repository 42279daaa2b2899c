// auth-client/src/snapshot.rs
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Wallet-connection facts as reported by the wallet transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub is_connected: bool,
    pub address: Option<String>,
    pub chain_id: Option<u64>,
}

/// Source of the current connection facts (the wallet transport adapter)
pub trait ConnectionStateSource: Send + Sync {
    fn current(&self) -> ConnectionInfo;
}

/// Immutable, sequence-numbered capture of the connection facts at one
/// point in time. Comparing two captures tells the orchestrator whether the
/// wallet connection changed while it was suspended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub is_connected: bool,
    pub address: Option<String>,
    pub chain_id: Option<u64>,
    pub captured_at: DateTime<Utc>,
    pub sequence: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotValidationError {
    #[error("no wallet is connected")]
    NotConnected,

    #[error("connected wallet has no address")]
    MissingAddress,

    #[error("connected wallet {connected} does not match the claimed address {claimed}")]
    AddressMismatch { connected: String, claimed: String },

    #[error("connected wallet has no chain id")]
    MissingChainId,
}

/// Owns the monotone sequence counter behind snapshots.
///
/// Explicitly constructed and held by one orchestrator instance, never a
/// process-global, so tests and parallel sessions cannot couple through it.
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    sequence: AtomicU64,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self {
            sequence: AtomicU64::new(0),
        }
    }

    /// Capture a snapshot. Sequence numbers start at 1 and increase by
    /// exactly 1 per call.
    pub fn capture(&self, info: &ConnectionInfo) -> ConnectionSnapshot {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        ConnectionSnapshot {
            is_connected: info.is_connected,
            address: info.address.clone(),
            chain_id: info.chain_id,
            captured_at: Utc::now(),
            sequence,
        }
    }

    /// Lifecycle/testing hook; the next capture gets sequence 1 again
    pub fn reset_sequence(&self) {
        self.sequence.store(0, Ordering::SeqCst);
    }
}

/// Two snapshots agree iff the connection facts are pairwise equal and the
/// candidate is not older than the reference. The sequence guard rejects
/// out-of-order delivery of connection-change notifications.
pub fn is_consistent(reference: &ConnectionSnapshot, candidate: &ConnectionSnapshot) -> bool {
    reference.is_connected == candidate.is_connected
        && addresses_equal(&reference.address, &candidate.address)
        && reference.chain_id == candidate.chain_id
        && candidate.sequence >= reference.sequence
}

fn addresses_equal(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    }
}

/// Entry gate before any authentication attempt begins
pub fn validate_for_auth_start(
    snapshot: &ConnectionSnapshot,
    claimed_wallet: &str,
) -> Result<(), SnapshotValidationError> {
    if !snapshot.is_connected {
        return Err(SnapshotValidationError::NotConnected);
    }

    let Some(address) = &snapshot.address else {
        return Err(SnapshotValidationError::MissingAddress);
    };
    if !address.eq_ignore_ascii_case(claimed_wallet) {
        return Err(SnapshotValidationError::AddressMismatch {
            connected: address.clone(),
            claimed: claimed_wallet.to_string(),
        });
    }

    if snapshot.chain_id.is_none() {
        return Err(SnapshotValidationError::MissingChainId);
    }

    Ok(())
}
