// auth-client/src/events.rs
use tokio::sync::mpsc;

/// Why an attempt ended without either success or failure. These are
/// invisible to the user on purpose: drift reflects an intentional
/// environment change, contention means another attempt is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another attempt holds the lock; the new one is a silent no-op
    AttemptInFlight,
    /// The wallet connection changed mid-flow
    ConnectionDrift,
    /// The in-flight attempt was told to stop
    Cancelled,
}

/// Discrete state transitions of the client-side handshake, emitted for
/// progress UI instead of threading callbacks through the protocol logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    LockAcquired,
    SnapshotValidated,
    MessageRequested,
    MessageReceived,
    AwaitingSignature,
    SignatureObtained,
    Verifying,
    SessionEstablished,
    Aborted(SkipReason),
    Failed,
}

/// Sends stage events; a dropped receiver is ignored
#[derive(Debug, Clone, Default)]
pub struct StageReporter {
    sender: Option<mpsc::UnboundedSender<AuthStage>>,
}

impl StageReporter {
    /// Reporter that drops every event
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Reporter paired with a receiver for the UI to consume
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AuthStage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    pub fn emit(&self, stage: AuthStage) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(stage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_reporter_delivers_in_order() {
        let (reporter, mut receiver) = StageReporter::channel();

        reporter.emit(AuthStage::LockAcquired);
        reporter.emit(AuthStage::SnapshotValidated);

        assert_eq!(receiver.try_recv().unwrap(), AuthStage::LockAcquired);
        assert_eq!(receiver.try_recv().unwrap(), AuthStage::SnapshotValidated);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_disabled_and_dropped_receivers_are_ignored() {
        StageReporter::disabled().emit(AuthStage::Failed);

        let (reporter, receiver) = StageReporter::channel();
        drop(receiver);
        reporter.emit(AuthStage::Failed); // must not panic
    }
}
