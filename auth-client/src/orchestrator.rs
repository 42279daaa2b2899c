// auth-client/src/orchestrator.rs
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use common::VerifyLoginRequest;

use crate::backend::{AuthBackend, BackendError};
use crate::events::{AuthStage, SkipReason, StageReporter};
use crate::lock::{AuthAttemptLock, CancellationSignal};
use crate::session::{SessionError, SessionSink};
use crate::signer::{SignerError, SigningRequest, WalletSigner};
use crate::snapshot::{
    is_consistent, validate_for_auth_start, ConnectionSnapshot, ConnectionStateSource,
    ConnectionTracker, SnapshotValidationError,
};

// Wallet-app switching on mobile briefly reports stale connection state;
// give the transport a moment to settle before trusting the next capture
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// A real failure of the handshake. Silent outcomes (drift, contention,
/// cancellation) are not errors; see [`AuthOutcome::Skipped`].
#[derive(Debug, Error)]
pub enum AuthFlowError {
    #[error("connection state rejected: {0}")]
    Snapshot(#[from] SnapshotValidationError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// How an authentication attempt ended without failing
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// Session established and still consistent at the final checkpoint
    Established {
        session_token: String,
        user: common::models::user::UserProfile,
    },
    /// Nothing happened on purpose; not an error and not surfaced to the user
    Skipped(SkipReason),
}

/// Optional device identity sent along with the login for device approval
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    pub device_id: String,
    pub platform: String,
}

/// Drives the client side of the handshake (lock, snapshot, challenge,
/// signature, verification, session) with a consistency checkpoint after
/// every suspension point.
///
/// Owns its tracker and lock; nothing else may mutate them.
pub struct AuthOrchestrator {
    backend: Arc<dyn AuthBackend>,
    signer: Arc<dyn WalletSigner>,
    session: Arc<dyn SessionSink>,
    source: Arc<dyn ConnectionStateSource>,
    tracker: ConnectionTracker,
    lock: Arc<AuthAttemptLock>,
    reporter: StageReporter,
    settle_delay: Duration,
}

impl AuthOrchestrator {
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        signer: Arc<dyn WalletSigner>,
        session: Arc<dyn SessionSink>,
        source: Arc<dyn ConnectionStateSource>,
    ) -> Self {
        Self {
            backend,
            signer,
            session,
            source,
            tracker: ConnectionTracker::new(),
            lock: Arc::new(AuthAttemptLock::new()),
            reporter: StageReporter::disabled(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn with_reporter(mut self, reporter: StageReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Shared handle for disconnect handlers that need to cancel an
    /// in-flight attempt
    pub fn lock(&self) -> Arc<AuthAttemptLock> {
        Arc::clone(&self.lock)
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Run the full handshake for `wallet_address`.
    ///
    /// The lock guard is held across the whole attempt and released on every
    /// exit path. Lock contention and mid-flow drift come back as
    /// [`AuthOutcome::Skipped`], never as errors.
    pub async fn authenticate(
        &self,
        wallet_address: &str,
        device: Option<DeviceIdentity>,
    ) -> Result<AuthOutcome, AuthFlowError> {
        // Single flight: a second attempt while one is running is a no-op
        let Some(guard) = self.lock.acquire(wallet_address) else {
            tracing::debug!(
                "Authentication already in flight, skipping attempt for {}",
                wallet_address
            );
            return Ok(AuthOutcome::Skipped(SkipReason::AttemptInFlight));
        };
        let signal = guard.signal();

        let result = self.run_locked(wallet_address, device, signal).await;
        if result.is_err() {
            self.reporter.emit(AuthStage::Failed);
        }
        result
        // `guard` drops here: the lock is released and its signal fired
    }

    async fn run_locked(
        &self,
        wallet_address: &str,
        device: Option<DeviceIdentity>,
        signal: CancellationSignal,
    ) -> Result<AuthOutcome, AuthFlowError> {
        self.reporter.emit(AuthStage::LockAcquired);

        // Entry gate: the connected wallet must be the one we claim
        let reference = self.tracker.capture(&self.source.current());
        validate_for_auth_start(&reference, wallet_address)?;
        self.reporter.emit(AuthStage::SnapshotValidated);

        let chain_id = match reference.chain_id {
            Some(chain_id) => chain_id,
            None => return Err(SnapshotValidationError::MissingChainId.into()),
        };

        // Round-trip: request the signing challenge
        self.reporter.emit(AuthStage::MessageRequested);
        let challenge = self.backend.generate_auth_message(wallet_address).await?;
        self.reporter.emit(AuthStage::MessageReceived);

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        if let Some(reason) = self.checkpoint(&reference, &signal) {
            return Ok(self.abort(reason));
        }

        // Round-trip: ask the wallet to sign
        self.reporter.emit(AuthStage::AwaitingSignature);
        let signature = self
            .signer
            .sign(&SigningRequest {
                wallet_address: wallet_address.to_string(),
                message: challenge.message.clone(),
                nonce: challenge.nonce.clone(),
                timestamp: challenge.timestamp,
                chain_id,
            })
            .await?;
        self.reporter.emit(AuthStage::SignatureObtained);

        if let Some(reason) = self.checkpoint(&reference, &signal) {
            return Ok(self.abort(reason));
        }

        // Round-trip: verify with the backend
        self.reporter.emit(AuthStage::Verifying);
        let login = self
            .backend
            .verify_and_login(VerifyLoginRequest {
                wallet_address: wallet_address.to_string(),
                signature,
                signature_type: self.signer.signature_kind(),
                chain_id: Some(chain_id),
                device_id: device.as_ref().map(|d| d.device_id.clone()),
                platform: device.as_ref().map(|d| d.platform.clone()),
            })
            .await?;

        if let Some(reason) = self.checkpoint(&reference, &signal) {
            return Ok(self.abort(reason));
        }

        self.session.establish(&login.session_token, &login.user).await?;
        self.reporter.emit(AuthStage::SessionEstablished);

        // Final checkpoint: a session established for a connection that no
        // longer matches reality must not stay live
        if let Some(reason) = self.checkpoint(&reference, &signal) {
            if let Err(e) = self.session.invalidate().await {
                tracing::error!("Failed to tear down drifted session: {}", e);
            }
            return Ok(self.abort(reason));
        }

        Ok(AuthOutcome::Established {
            session_token: login.session_token,
            user: login.user,
        })
    }

    /// Poll the cancellation signal, then re-capture and compare against the
    /// reference snapshot. Returns the skip reason when the attempt must
    /// stop.
    fn checkpoint(
        &self,
        reference: &ConnectionSnapshot,
        signal: &CancellationSignal,
    ) -> Option<SkipReason> {
        if signal.is_cancelled() {
            tracing::debug!("Authentication attempt cancelled at checkpoint");
            return Some(SkipReason::Cancelled);
        }

        let candidate = self.tracker.capture(&self.source.current());
        if !is_consistent(reference, &candidate) {
            tracing::info!(
                "Connection state drifted (seq {} -> {}), aborting authentication",
                reference.sequence,
                candidate.sequence
            );
            return Some(SkipReason::ConnectionDrift);
        }

        None
    }

    fn abort(&self, reason: SkipReason) -> AuthOutcome {
        self.reporter.emit(AuthStage::Aborted(reason));
        AuthOutcome::Skipped(reason)
    }
}
