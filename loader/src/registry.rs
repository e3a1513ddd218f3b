//! Idempotent load tracking.
//!
//! Each identifier has at most one record: `Loading` while a fetch is in
//! flight, `Loaded` once it succeeded, absent otherwise. Failed loads leave
//! nothing behind, so the next request starts a fresh fetch.
//!
//! # Singleflight
//!
//! The first request for an identifier inserts a `Loading` record holding a
//! `watch` receiver and spawns the fetch. Later requests clone that receiver
//! and wait on the same outcome. The check-or-create step runs under one
//! lock, so concurrent callers can never start two fetches for the same id.
//!
//! The spawned task settles the record *before* publishing the outcome: a
//! caller that observes success always finds the identifier `Loaded`.

use std::collections::HashMap;
use std::future::IntoFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::BoxFuture;
use tokio::sync::watch;

use liftoff_types::{FetchError, Identifier, ResourceHandle};

use crate::fetcher::ResourceFetcher;

type Outcome = Result<ResourceHandle, FetchError>;
type Records = Arc<Mutex<RecordMap>>;

enum LoadRecord {
    Loading(watch::Receiver<Option<Outcome>>),
    Loaded(ResourceHandle),
}

type RecordMap = HashMap<Identifier, LoadRecord>;

fn lock(records: &Mutex<RecordMap>) -> MutexGuard<'_, RecordMap> {
    records.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a load that may still be in flight.
///
/// Every caller sharing one fetch holds a clone and observes the same outcome.
/// Dropping a `PendingLoad` never cancels the fetch.
#[derive(Clone)]
pub struct PendingLoad {
    id: Identifier,
    state: PendingState,
}

#[derive(Clone)]
enum PendingState {
    Ready(Outcome),
    Waiting(watch::Receiver<Option<Outcome>>),
}

impl PendingLoad {
    fn ready(id: Identifier, outcome: Outcome) -> Self {
        Self {
            id,
            state: PendingState::Ready(outcome),
        }
    }

    fn waiting(id: Identifier, rx: watch::Receiver<Option<Outcome>>) -> Self {
        Self {
            id,
            state: PendingState::Waiting(rx),
        }
    }

    #[must_use]
    pub fn id(&self) -> &Identifier {
        &self.id
    }

    /// Whether the outcome is already available without waiting.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        match &self.state {
            PendingState::Ready(_) => true,
            PendingState::Waiting(rx) => rx.borrow().is_some(),
        }
    }

    /// Wait for the shared outcome.
    pub async fn wait(self) -> Result<ResourceHandle, FetchError> {
        let mut rx = match self.state {
            PendingState::Ready(outcome) => return outcome,
            PendingState::Waiting(rx) => rx,
        };
        loop {
            if let Some(outcome) = rx.borrow_and_update().clone() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // Sender is gone; whatever it last published is final.
                return rx
                    .borrow()
                    .clone()
                    .unwrap_or(Err(FetchError::Abandoned { id: self.id }));
            }
        }
    }
}

impl IntoFuture for PendingLoad {
    type Output = Result<ResourceHandle, FetchError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}

impl std::fmt::Debug for PendingLoad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingLoad")
            .field("id", &self.id)
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// Settles a `Loading` record exactly once.
///
/// If the fetch task panics or is dropped before settling, `Drop` removes the
/// record and publishes `Abandoned` so waiters are released and the id can be
/// requested again.
struct SettleGuard {
    id: Identifier,
    records: Records,
    tx: watch::Sender<Option<Outcome>>,
    settled: bool,
}

impl SettleGuard {
    fn settle(mut self, outcome: Outcome) {
        {
            let mut records = lock(&self.records);
            match &outcome {
                Ok(handle) => {
                    records.insert(self.id.clone(), LoadRecord::Loaded(handle.clone()));
                    tracing::debug!(id = %self.id, "Resource loaded");
                }
                Err(err) => {
                    records.remove(&self.id);
                    tracing::debug!(id = %self.id, error = %err, "Resource load failed");
                }
            }
        }
        self.tx.send_replace(Some(outcome));
        self.settled = true;
    }
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        // Only this task's own record can be present: nothing else removes
        // a Loading record.
        lock(&self.records).remove(&self.id);
        tracing::warn!(id = %self.id, "Resource load abandoned before settling");
        self.tx.send_replace(Some(Err(FetchError::Abandoned {
            id: self.id.clone(),
        })));
    }
}

/// Load-state cache keyed by identifier.
pub struct ResourceRegistry {
    fetcher: Arc<dyn ResourceFetcher>,
    records: Records,
    dispatched: AtomicU64,
}

impl ResourceRegistry {
    #[must_use]
    pub fn new(fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            fetcher,
            records: Arc::new(Mutex::new(HashMap::new())),
            dispatched: AtomicU64::new(0),
        }
    }

    /// Request a resource.
    ///
    /// - `Loaded`: returns the cached handle, already settled.
    /// - `Loading`: joins the in-flight fetch.
    /// - absent: records `Loading`, spawns the fetch, returns its pending load.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn request(&self, id: &Identifier) -> PendingLoad {
        let (tx, rx) = {
            let mut records = lock(&self.records);
            match records.get(id) {
                Some(LoadRecord::Loaded(handle)) => {
                    return PendingLoad::ready(id.clone(), Ok(handle.clone()));
                }
                Some(LoadRecord::Loading(rx)) => {
                    tracing::debug!(id = %id, "Joining in-flight load");
                    return PendingLoad::waiting(id.clone(), rx.clone());
                }
                None => {}
            }
            let (tx, rx) = watch::channel(None);
            records.insert(id.clone(), LoadRecord::Loading(rx.clone()));
            (tx, rx)
        };

        let guard = SettleGuard {
            id: id.clone(),
            records: Arc::clone(&self.records),
            tx,
            settled: false,
        };
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(id = %id, "Dispatching fetch");
        let fetch = self.fetcher.fetch(id);
        tokio::spawn(async move {
            let outcome = fetch.await;
            guard.settle(outcome);
        });

        PendingLoad::waiting(id.clone(), rx)
    }

    /// Terminal handle for `id`, if it finished loading.
    #[must_use]
    pub fn loaded(&self, id: &Identifier) -> Option<ResourceHandle> {
        match lock(&self.records).get(id) {
            Some(LoadRecord::Loaded(handle)) => Some(handle.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_loaded(&self, id: &Identifier) -> bool {
        matches!(lock(&self.records).get(id), Some(LoadRecord::Loaded(_)))
    }

    #[must_use]
    pub fn is_loading(&self, id: &Identifier) -> bool {
        matches!(lock(&self.records).get(id), Some(LoadRecord::Loading(_)))
    }

    /// Loading or loaded.
    #[must_use]
    pub fn is_known(&self, id: &Identifier) -> bool {
        lock(&self.records).contains_key(id)
    }

    /// Sorted snapshot of loaded identifiers.
    #[must_use]
    pub fn loaded_ids(&self) -> Vec<Identifier> {
        self.snapshot(|record| matches!(record, LoadRecord::Loaded(_)))
    }

    /// Sorted snapshot of identifiers with a fetch in flight.
    #[must_use]
    pub fn loading_ids(&self) -> Vec<Identifier> {
        self.snapshot(|record| matches!(record, LoadRecord::Loading(_)))
    }

    /// Total fetches started over the registry's lifetime.
    #[must_use]
    pub fn fetches_dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    fn snapshot(&self, keep: impl Fn(&LoadRecord) -> bool) -> Vec<Identifier> {
        let mut ids: Vec<Identifier> = lock(&self.records)
            .iter()
            .filter(|(_, record)| keep(record))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("loaded", &self.loaded_ids())
            .field("loading", &self.loading_ids())
            .field("dispatched", &self.fetches_dispatched())
            .finish_non_exhaustive()
    }
}
