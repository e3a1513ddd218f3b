//! End-to-end boot scenarios against an in-memory fetcher.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use liftoff_boot::{BootOrchestrator, BootPlan, LegacyBooter};
use liftoff_loader::{FetchFut, ResourceFetcher, ResourceRegistry};
use liftoff_types::{
    BootError, BootStage, BootState, DependencySet, FetchError, Identifier, ResourceHandle,
};

fn id(raw: &str) -> Identifier {
    Identifier::new(raw).unwrap()
}

/// Serves every id after a per-id delay, except those marked missing.
#[derive(Default)]
struct StubFetcher {
    delays: HashMap<&'static str, u64>,
    missing: Vec<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    fn calls_for(&self, raw: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == raw).count()
    }
}

impl ResourceFetcher for StubFetcher {
    fn fetch(&self, id: &Identifier) -> FetchFut {
        self.calls.lock().unwrap().push(id.to_string());
        let delay = self.delays.get(id.as_str()).copied().unwrap_or(1);
        let missing = self.missing.contains(&id.as_str());
        let id = id.clone();
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if missing {
                Err(FetchError::NotFound { id })
            } else {
                Ok(ResourceHandle::new(id.clone(), format!("/* {id} */")))
            }
        })
    }
}

fn plan() -> BootPlan {
    BootPlan {
        fetcher: id("fetcher.js"),
        autoloader: id("autoloader.js"),
        dependencies: DependencySet::new([id("x.js"), id("y.js"), id("z.js")]).unwrap(),
        event: "appBooted".to_string(),
    }
}

fn orchestrator(fetcher: Arc<StubFetcher>) -> Arc<BootOrchestrator> {
    Arc::new(BootOrchestrator::new(
        plan(),
        Arc::new(ResourceRegistry::new(fetcher)),
    ))
}

#[tokio::test]
async fn successful_boot_fires_latch_exactly_once() {
    let fetcher = Arc::new(StubFetcher::default());
    let boot = orchestrator(Arc::clone(&fetcher));
    let notified = Arc::new(AtomicUsize::new(0));
    {
        let notified = Arc::clone(&notified);
        boot.latch().on_fired(move || {
            notified.fetch_add(1, Ordering::SeqCst);
        });
    }

    let report = boot.boot().await.unwrap();
    assert_eq!(boot.state(), BootState::Booted);
    assert_eq!(report.dependencies.len(), 3);
    assert_eq!(notified.load(Ordering::SeqCst), 1);

    // A repeated boot must not notify again.
    assert!(boot.boot().await.is_err());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(notified.load(Ordering::SeqCst), 1);

    let registry = boot.registry();
    for raw in ["fetcher.js", "autoloader.js", "x.js", "y.js", "z.js"] {
        assert!(registry.is_loaded(&id(raw)), "{raw} should be loaded");
        assert_eq!(fetcher.calls_for(raw), 1);
    }
}

#[tokio::test]
async fn failing_dependency_aborts_without_firing() {
    let fetcher = Arc::new(StubFetcher {
        delays: HashMap::from([("x.js", 20), ("y.js", 1), ("z.js", 40)]),
        missing: vec!["y.js"],
        ..Default::default()
    });
    let boot = orchestrator(Arc::clone(&fetcher));
    let notified = Arc::new(AtomicUsize::new(0));
    {
        let notified = Arc::clone(&notified);
        boot.latch().on_fired(move || {
            notified.fetch_add(1, Ordering::SeqCst);
        });
    }

    let err = boot.boot().await.unwrap_err();
    let BootError::Aborted(abort) = err else {
        panic!("expected an abort");
    };
    assert_eq!(abort.stage_label(), "LoadingDependencies");
    assert_eq!(abort.fetch_error(), &FetchError::NotFound { id: id("y.js") });
    assert_eq!(
        boot.state(),
        BootState::Aborted(BootStage::LoadingDependencies)
    );

    // Siblings keep loading after the abort.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let registry = boot.registry();
    assert!(registry.is_loaded(&id("x.js")));
    assert!(registry.is_loaded(&id("z.js")));
    assert!(!registry.is_known(&id("y.js")));

    assert!(!boot.is_booted());
    assert_eq!(boot.latch().pending(), 1);
    assert_eq!(notified.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_autoloader_never_requests_dependencies() {
    let fetcher = Arc::new(StubFetcher {
        missing: vec!["autoloader.js"],
        ..Default::default()
    });
    let boot = orchestrator(Arc::clone(&fetcher));

    let err = boot.boot().await.unwrap_err();
    let BootError::Aborted(abort) = err else {
        panic!("expected an abort");
    };
    assert_eq!(abort.stage, BootStage::LoadingAutoloader);
    assert_eq!(fetcher.calls_for("x.js"), 0);
    assert!(boot.autoloader().is_none());
}

#[tokio::test]
async fn late_subscriber_is_notified_once() {
    let fetcher = Arc::new(StubFetcher::default());
    let boot = orchestrator(fetcher);
    boot.boot().await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    let notified = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = tokio::sync::oneshot::channel();
    {
        let notified = Arc::clone(&notified);
        boot.latch().on_fired(move || {
            notified.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(());
        });
    }
    tokio::time::timeout(Duration::from_secs(1), rx)
        .await
        .expect("late subscriber notified")
        .unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(notified.load(Ordering::SeqCst), 1);
}

fn legacy_booter() -> LegacyBooter {
    LegacyBooter::new(
        id("js/helper/legacy-helper.js"),
        vec![id("wwwroot/js/site-util.js"), id("wwwroot/js/site.js")],
    )
}

#[tokio::test]
async fn legacy_booter_attached_before_boot_runs_after_it() {
    let fetcher = Arc::new(StubFetcher::default());
    let boot = orchestrator(Arc::clone(&fetcher));

    let report = legacy_booter().attach(&boot);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(fetcher.calls_for("js/helper/legacy-helper.js"), 0);
    assert!(!boot.is_booted());
    assert!(!boot.latch().is_fired());
    assert_eq!(boot.latch().pending(), 1);

    boot.boot().await.unwrap();
    let report = tokio::time::timeout(Duration::from_secs(1), report)
        .await
        .expect("legacy pass finished")
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(report.loaded.len(), 3);
}

#[tokio::test]
async fn legacy_booter_attached_after_boot_still_runs() {
    let fetcher = Arc::new(StubFetcher::default());
    let boot = orchestrator(Arc::clone(&fetcher));
    boot.boot().await.unwrap();

    let report = tokio::time::timeout(Duration::from_secs(1), legacy_booter().attach(&boot))
        .await
        .expect("legacy pass finished")
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(fetcher.calls_for("wwwroot/js/site.js"), 1);
}

#[tokio::test]
async fn legacy_booter_waits_forever_on_aborted_boot() {
    let fetcher = Arc::new(StubFetcher {
        missing: vec!["fetcher.js"],
        ..Default::default()
    });
    let boot = orchestrator(Arc::clone(&fetcher));
    let report = legacy_booter().attach(&boot);

    assert!(boot.boot().await.is_err());
    let waited = tokio::time::timeout(Duration::from_millis(50), report).await;
    assert!(waited.is_err());
    assert_eq!(fetcher.calls_for("js/helper/legacy-helper.js"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_boot_calls_run_the_sequence_once() {
    let fetcher = Arc::new(StubFetcher::default());
    let boot = orchestrator(Arc::clone(&fetcher));

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let boot = Arc::clone(&boot);
            tokio::spawn(async move { boot.boot().await })
        })
        .collect();

    let mut booted = 0;
    let mut rejected = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => booted += 1,
            Err(BootError::AlreadyStarted(_)) => rejected += 1,
            Err(other) => panic!("unexpected boot error: {other}"),
        }
    }
    assert_eq!(booted, 1);
    assert_eq!(rejected, 3);
    assert_eq!(fetcher.calls_for("fetcher.js"), 1);
}
