// auth-client/src/lock.rs
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Cloneable polling handle signalling that the attempt holding the lock
/// has finished or was told to stop. Checkpoints poll it between suspension
/// points; in-flight network calls are left to complete and their results
/// discarded.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    fired: Arc<AtomicBool>,
}

impl CancellationSignal {
    fn new() -> Self {
        Self {
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    fn fire(&self) {
        self.fired.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct HeldLock {
    wallet_address: String,
    acquired_at: DateTime<Utc>,
    signal: CancellationSignal,
}

/// Single-flight mutual exclusion for authentication attempts within one
/// client process.
///
/// Explicitly constructed and shared by `Arc`, owned by one orchestrator
/// instance. Acquiring while held fails immediately; there is no queueing
/// and no overwrite.
#[derive(Debug, Default)]
pub struct AuthAttemptLock {
    state: Mutex<Option<HeldLock>>,
}

impl AuthAttemptLock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }

    /// Try to take the lock for `wallet_address`. Returns `None` immediately
    /// when an attempt is already in flight.
    pub fn acquire(self: &Arc<Self>, wallet_address: &str) -> Option<AuthLockGuard> {
        let mut state = self.state.lock().unwrap();
        if state.is_some() {
            return None;
        }

        let signal = CancellationSignal::new();
        *state = Some(HeldLock {
            wallet_address: wallet_address.to_string(),
            acquired_at: Utc::now(),
            signal: signal.clone(),
        });

        Some(AuthLockGuard {
            lock: Arc::clone(self),
            signal,
        })
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().unwrap().is_some()
    }

    /// Wallet of the in-flight attempt, if any
    pub fn holder(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .as_ref()
            .map(|held| held.wallet_address.clone())
    }

    /// When the in-flight attempt started, if any
    pub fn held_since(&self) -> Option<DateTime<Utc>> {
        self.state.lock().unwrap().as_ref().map(|held| held.acquired_at)
    }

    /// Tell the in-flight attempt to stop at its next checkpoint (used by
    /// disconnect handlers). The lock itself is still released by the guard.
    pub fn cancel_active(&self) -> bool {
        match self.state.lock().unwrap().as_ref() {
            Some(held) => {
                held.signal.fire();
                true
            }
            None => false,
        }
    }

    fn release(&self) {
        let mut state = self.state.lock().unwrap();
        if let Some(held) = state.take() {
            held.signal.fire();
            tracing::debug!("Released authentication lock for {}", held.wallet_address);
        }
    }
}

/// RAII guard for the lock: dropping it fires the cancellation signal and
/// clears the lock state, so release happens exactly once on every exit
/// path, including panics and early returns.
#[derive(Debug)]
pub struct AuthLockGuard {
    lock: Arc<AuthAttemptLock>,
    signal: CancellationSignal,
}

impl AuthLockGuard {
    /// Polling handle that outlives the guard
    pub fn signal(&self) -> CancellationSignal {
        self.signal.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
    }
}

impl Drop for AuthLockGuard {
    fn drop(&mut self) {
        self.lock.release();
    }
}
