//! Boot orchestration.
//!
//! ```text
//! NotStarted -> LoadingFetcher -> LoadingAutoloader -> LoadingDependencies -> Booted
//!                     |                  |                     |
//!                     +------------------+---------------------+--> Aborted(stage)
//! ```
//!
//! Stages are strictly sequential: a stage starts only after the previous
//! stage's load settled successfully. Every failure becomes a [`BootAbort`]
//! that is logged, handed to the abort handler, and returned. The readiness
//! latch fires exactly once, on entering `Booted`.

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use tokio::sync::watch;

use liftoff_config::ResolvedBoot;
use liftoff_loader::{Autoloader, ResourceRegistry};
use liftoff_types::{
    AbortCause, BootAbort, BootError, BootStage, BootState, DependencySet, Identifier,
    ResourceHandle,
};

use crate::latch::ReadinessLatch;

pub type AbortHandler = Arc<dyn Fn(&BootAbort) + Send + Sync>;

/// What to load, in order.
#[derive(Debug, Clone)]
pub struct BootPlan {
    pub fetcher: Identifier,
    pub autoloader: Identifier,
    pub dependencies: DependencySet,
    /// Name of the readiness latch.
    pub event: String,
}

impl BootPlan {
    #[must_use]
    pub fn from_resolved(resolved: &ResolvedBoot) -> Self {
        Self {
            fetcher: resolved.fetcher.clone(),
            autoloader: resolved.autoloader.clone(),
            dependencies: resolved.dependencies.clone(),
            event: resolved.event.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BootReport {
    /// Dependency handles in dependency order.
    pub dependencies: Vec<ResourceHandle>,
    pub elapsed: Duration,
}

pub struct BootOrchestrator {
    plan: BootPlan,
    registry: Arc<ResourceRegistry>,
    latch: ReadinessLatch,
    state: watch::Sender<BootState>,
    autoloader: OnceLock<Arc<Autoloader>>,
    on_abort: Option<AbortHandler>,
}

impl BootOrchestrator {
    #[must_use]
    pub fn new(plan: BootPlan, registry: Arc<ResourceRegistry>) -> Self {
        let latch = ReadinessLatch::new(plan.event.clone());
        let (state, _) = watch::channel(BootState::NotStarted);
        Self {
            plan,
            registry,
            latch,
            state,
            autoloader: OnceLock::new(),
            on_abort: None,
        }
    }

    /// Called with every abort, after it has been logged.
    pub fn with_abort_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&BootAbort) + Send + Sync + 'static,
    {
        self.on_abort = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn plan(&self) -> &BootPlan {
        &self.plan
    }

    #[must_use]
    pub fn state(&self) -> BootState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<BootState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn is_booted(&self) -> bool {
        self.state() == BootState::Booted
    }

    /// Subscribe-only; the latch fires when the boot enters `Booted`.
    #[must_use]
    pub fn latch(&self) -> &ReadinessLatch {
        &self.latch
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    /// Present once the autoloader stage succeeded.
    #[must_use]
    pub fn autoloader(&self) -> Option<&Arc<Autoloader>> {
        self.autoloader.get()
    }

    /// Wait for the environment to be ready, then boot.
    pub async fn boot_when<F>(&self, ready: F) -> Result<BootReport, BootError>
    where
        F: Future<Output = ()>,
    {
        ready.await;
        self.boot().await
    }

    /// Run the boot sequence. Only the first call does anything; later calls
    /// return [`BootError::AlreadyStarted`].
    pub async fn boot(&self) -> Result<BootReport, BootError> {
        self.start()?;
        let started = Instant::now();
        tracing::info!(event = %self.plan.event, "Booting");

        // Fetcher
        if let Err(err) = self.registry.request(&self.plan.fetcher).wait().await {
            return Err(self
                .abort(BootStage::LoadingFetcher, AbortCause::FetcherUnavailable(err))
                .into());
        }
        tracing::info!(id = %self.plan.fetcher, "Fetcher loaded");
        self.advance(BootState::LoadingAutoloader);

        // Autoloader
        if let Err(err) = self.registry.request(&self.plan.autoloader).wait().await {
            return Err(self
                .abort(
                    BootStage::LoadingAutoloader,
                    AbortCause::AutoloaderUnavailable(err),
                )
                .into());
        }
        let autoloader = Arc::new(Autoloader::new(
            Arc::clone(&self.registry),
            self.plan.dependencies.clone(),
        ));
        let autoloader = Arc::clone(self.autoloader.get_or_init(|| autoloader));
        tracing::info!(id = %self.plan.autoloader, "Autoloader loaded");
        self.advance(BootState::LoadingDependencies);

        // Dependencies
        let dependencies = match autoloader.load_all().await {
            Ok(handles) => handles,
            Err(err) => {
                return Err(self
                    .abort(BootStage::LoadingDependencies, AbortCause::Dependencies(err))
                    .into());
            }
        };

        self.advance(BootState::Booted);
        self.latch.fire();
        let elapsed = started.elapsed();
        tracing::info!(
            elapsed_ms = elapsed.as_millis() as u64,
            dependencies = dependencies.len(),
            "Boot complete"
        );
        Ok(BootReport {
            dependencies,
            elapsed,
        })
    }

    fn start(&self) -> Result<(), BootError> {
        let mut observed = BootState::NotStarted;
        let started = self.state.send_if_modified(|current| {
            observed = *current;
            if current.can_advance_to(BootState::LoadingFetcher) {
                *current = BootState::LoadingFetcher;
                true
            } else {
                false
            }
        });
        if started {
            Ok(())
        } else {
            tracing::warn!(state = %observed, "Boot requested more than once");
            Err(BootError::AlreadyStarted(observed))
        }
    }

    fn advance(&self, next: BootState) {
        let advanced = self.state.send_if_modified(|current| {
            if current.can_advance_to(next) {
                *current = next;
                true
            } else {
                false
            }
        });
        debug_assert!(advanced, "illegal boot transition to {next}");
        tracing::debug!(state = %next, "Boot state advanced");
    }

    fn abort(&self, stage: BootStage, cause: AbortCause) -> BootAbort {
        self.advance(BootState::Aborted(stage));
        let abort = BootAbort { stage, cause };
        tracing::error!(
            stage = abort.stage_label(),
            error = %abort.fetch_error(),
            "{}. Aborting boot.",
            abort.cause
        );
        if let Some(handler) = &self.on_abort {
            handler(&abort);
        }
        abort
    }
}

impl std::fmt::Debug for BootOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootOrchestrator")
            .field("plan", &self.plan)
            .field("state", &self.state())
            .field("latch", &self.latch)
            .finish_non_exhaustive()
    }
}
