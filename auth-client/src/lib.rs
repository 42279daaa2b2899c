pub mod backend;
pub mod events;
pub mod lock;
pub mod orchestrator;
pub mod session;
pub mod signer;
pub mod snapshot;

pub use backend::{AuthBackend, BackendError, HttpAuthBackend};
pub use events::{AuthStage, SkipReason, StageReporter};
pub use lock::{AuthAttemptLock, AuthLockGuard, CancellationSignal};
pub use orchestrator::{AuthFlowError, AuthOrchestrator, AuthOutcome, DeviceIdentity};
pub use session::{SessionError, SessionSink};
pub use signer::{SignerError, SigningRequest, WalletSigner};
pub use snapshot::{
    is_consistent, validate_for_auth_start, ConnectionInfo, ConnectionSnapshot,
    ConnectionStateSource, ConnectionTracker, SnapshotValidationError,
};
