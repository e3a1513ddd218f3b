//! Fire-once readiness signal.
//!
//! Check-then-subscribe is a single critical section: `on_fired` either
//! queues the callback (not yet fired) or schedules it (already fired) while
//! holding the same lock `fire` takes to flip the flag. A subscriber can
//! therefore never miss the signal nor see it twice.
//!
//! Only the boot orchestrator fires its latch. Other code gets a
//! subscribe-only view through [`BootOrchestrator::latch`]:
//!
//! ```compile_fail
//! fn force(boot: &liftoff_boot::BootOrchestrator) {
//!     boot.latch().fire();
//! }
//! ```
//!
//! ```
//! fn subscribe(boot: &liftoff_boot::BootOrchestrator) {
//!     boot.latch().on_fired(|| println!("booted"));
//! }
//! ```
//!
//! [`BootOrchestrator::latch`]: crate::BootOrchestrator::latch

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

type Callback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct LatchState {
    fired: bool,
    pending: Vec<Callback>,
}

pub struct ReadinessLatch {
    name: String,
    state: Mutex<LatchState>,
}

impl ReadinessLatch {
    #[must_use]
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(LatchState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.lock().fired
    }

    /// Subscribers queued and waiting for the first `fire`.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Run `callback` exactly once when the latch fires.
    ///
    /// If the latch already fired, the callback is spawned onto the current
    /// Tokio runtime rather than run in the caller's frame (inline when no
    /// runtime is present).
    pub fn on_fired<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = self.lock();
            if !state.fired {
                state.pending.push(Box::new(callback));
                return;
            }
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { callback() });
            }
            Err(_) => callback(),
        }
    }

    /// Fire the latch. Returns `true` on the first call only; later calls do
    /// nothing.
    pub(crate) fn fire(&self) -> bool {
        let pending = {
            let mut state = self.lock();
            if state.fired {
                return false;
            }
            state.fired = true;
            std::mem::take(&mut state.pending)
        };
        tracing::info!(latch = %self.name, subscribers = pending.len(), "Readiness latch fired");
        for callback in pending {
            callback();
        }
        true
    }

    /// Resolve once the latch has fired. Never resolves if it never fires.
    pub async fn wait(&self) {
        if self.is_fired() {
            return;
        }
        let (tx, rx) = oneshot::channel();
        self.on_fired(move || {
            let _ = tx.send(());
        });
        // The sender lives in the pending list until fire; it is only dropped
        // unsent if the latch itself is dropped.
        let _ = rx.await;
    }
}

impl std::fmt::Debug for ReadinessLatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ReadinessLatch")
            .field("name", &self.name)
            .field("fired", &state.fired)
            .field("pending", &state.pending.len())
            .finish()
    }
}
