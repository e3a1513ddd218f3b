//! Legacy subsystem booter.
//!
//! Legacy resources are not part of the boot chain. The booter subscribes to
//! the readiness latch, which covers both orders: attached before boot
//! completes (queued until fire) or after (scheduled right away). Once
//! notified it loads the legacy helper, unless the registry already knows it,
//! then requests every legacy script and reports failures one by one.

use std::sync::{Arc, Weak};

use tokio::sync::oneshot;

use liftoff_config::ResolvedLegacy;
use liftoff_loader::Autoloader;
use liftoff_types::{FetchError, Identifier};

use crate::orchestrator::BootOrchestrator;

/// Outcome of one legacy load pass.
#[derive(Debug, Clone, Default)]
pub struct LegacyReport {
    pub loaded: Vec<Identifier>,
    pub failed: Vec<(Identifier, FetchError)>,
}

impl LegacyReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LegacyBooter {
    helper: Identifier,
    scripts: Vec<Identifier>,
}

impl LegacyBooter {
    /// `scripts` are dispatched in the given order.
    #[must_use]
    pub fn new(helper: Identifier, scripts: Vec<Identifier>) -> Self {
        Self { helper, scripts }
    }

    #[must_use]
    pub fn from_resolved(resolved: &ResolvedLegacy) -> Self {
        Self::new(resolved.helper.clone(), resolved.scripts.clone())
    }

    /// Subscribe to the orchestrator's readiness latch.
    ///
    /// The receiver resolves with the report once the legacy pass finishes.
    /// If the boot aborts, the latch never fires and the receiver never
    /// resolves. Must be called from within a Tokio runtime.
    pub fn attach(self, orchestrator: &Arc<BootOrchestrator>) -> oneshot::Receiver<LegacyReport> {
        let (tx, rx) = oneshot::channel();
        let weak: Weak<BootOrchestrator> = Arc::downgrade(orchestrator);
        tracing::debug!(
            latch = orchestrator.latch().name(),
            fired = orchestrator.is_booted(),
            "Legacy booter attached"
        );

        orchestrator.latch().on_fired(move || {
            tokio::spawn(async move {
                let Some(orchestrator) = weak.upgrade() else {
                    return;
                };
                let Some(autoloader) = orchestrator.autoloader() else {
                    tracing::warn!("Latch fired without an autoloader; skipping legacy scripts");
                    return;
                };
                let report = self.load(autoloader).await;
                let _ = tx.send(report);
            });
        });
        rx
    }

    /// Load the helper and then every legacy script through `autoloader`.
    pub async fn load(&self, autoloader: &Autoloader) -> LegacyReport {
        tracing::info!(scripts = self.scripts.len(), "Loading legacy scripts");
        let mut report = LegacyReport::default();

        match autoloader.load_one(&self.helper).await {
            Ok(_) => report.loaded.push(self.helper.clone()),
            Err(err) => {
                tracing::warn!(id = %self.helper, error = %err, "Legacy helper could not be loaded");
                report.failed.push((self.helper.clone(), err));
                return report;
            }
        }

        for (id, outcome) in autoloader.load_each(&self.scripts).await {
            match outcome {
                Ok(_) => report.loaded.push(id),
                Err(err) => {
                    tracing::warn!(id = %id, error = %err, "Legacy script could not be loaded");
                    report.failed.push((id, err));
                }
            }
        }

        if report.is_complete() {
            tracing::info!(loaded = report.loaded.len(), "Legacy scripts loaded");
        } else {
            tracing::warn!(
                loaded = report.loaded.len(),
                failed = report.failed.len(),
                "Not all legacy scripts could be loaded"
            );
        }
        report
    }
}
