//! Dependency autoloading.
//!
//! `load_all` dispatches every request up front and then waits. It is
//! fail-fast: the first failure observed rejects the aggregate. Sibling
//! fetches are spawned tasks owned by the registry, so they keep running and
//! may still become `Loaded` after the aggregate has already failed.

use std::sync::Arc;

use futures_util::future::{join_all, try_join_all};

use liftoff_types::{DependencyLoadError, DependencySet, FetchError, Identifier, ResourceHandle};

use crate::registry::{PendingLoad, ResourceRegistry};

pub struct Autoloader {
    registry: Arc<ResourceRegistry>,
    dependencies: DependencySet,
}

impl Autoloader {
    #[must_use]
    pub fn new(registry: Arc<ResourceRegistry>, dependencies: DependencySet) -> Self {
        Self {
            registry,
            dependencies,
        }
    }

    #[must_use]
    pub fn dependencies(&self) -> &DependencySet {
        &self.dependencies
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    /// Load a single resource, short-circuiting when it is already loaded.
    pub async fn load_one(&self, id: &Identifier) -> Result<ResourceHandle, FetchError> {
        if let Some(handle) = self.registry.loaded(id) {
            tracing::debug!(id = %id, "Resource already loaded");
            return Ok(handle);
        }
        self.registry.request(id).wait().await
    }

    /// Load every dependency.
    ///
    /// On success the handles come back in dependency order, not completion
    /// order.
    pub async fn load_all(&self) -> Result<Vec<ResourceHandle>, DependencyLoadError> {
        tracing::info!(count = self.dependencies.len(), "Loading dependencies");

        // Dispatch everything before waiting on anything.
        let pending: Vec<PendingLoad> = self
            .dependencies
            .iter()
            .map(|id| self.registry.request(id))
            .collect();

        let waits = pending.into_iter().map(|load| async move {
            let id = load.id().clone();
            load.wait()
                .await
                .map_err(|source| DependencyLoadError { id, source })
        });

        match try_join_all(waits).await {
            Ok(handles) => {
                tracing::info!(count = handles.len(), "All dependencies loaded");
                Ok(handles)
            }
            Err(err) => {
                tracing::warn!(id = %err.id, error = %err.source, "Dependency failed to load");
                Err(err)
            }
        }
    }

    /// Load each resource independently and report every outcome.
    ///
    /// All requests are dispatched in the given order before any is awaited.
    /// Results are returned in the same order.
    pub async fn load_each(
        &self,
        ids: &[Identifier],
    ) -> Vec<(Identifier, Result<ResourceHandle, FetchError>)> {
        let pending: Vec<PendingLoad> = ids.iter().map(|id| self.registry.request(id)).collect();
        let outcomes = join_all(pending.into_iter().map(PendingLoad::wait)).await;
        ids.iter().cloned().zip(outcomes).collect()
    }
}

impl std::fmt::Debug for Autoloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autoloader")
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::fetcher::{FetchFut, ResourceFetcher};

    fn id(raw: &str) -> Identifier {
        Identifier::new(raw).unwrap()
    }

    fn set(names: &[&str]) -> DependencySet {
        DependencySet::new(names.iter().map(|n| id(n))).unwrap()
    }

    /// Each id gets a delay; ids in `failing` reject after their delay.
    struct ScriptedFetcher {
        calls: AtomicUsize,
        delays: Vec<(&'static str, u64)>,
        failing: Vec<&'static str>,
    }

    impl ScriptedFetcher {
        fn new(delays: Vec<(&'static str, u64)>, failing: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delays,
                failing,
            })
        }
    }

    impl ResourceFetcher for ScriptedFetcher {
        fn fetch(&self, id: &Identifier) -> FetchFut {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = self
                .delays
                .iter()
                .find(|(name, _)| *name == id.as_str())
                .map_or(0, |(_, ms)| *ms);
            let fail = self.failing.contains(&id.as_str());
            let id = id.clone();
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                if fail {
                    Err(FetchError::NotFound { id })
                } else {
                    Ok(ResourceHandle::new(id.clone(), format!("// {id}")))
                }
            })
        }
    }

    #[tokio::test]
    async fn load_all_returns_handles_in_dependency_order() {
        // c settles first, a last.
        let fetcher = ScriptedFetcher::new(vec![("a", 30), ("b", 20), ("c", 1)], vec![]);
        let registry = Arc::new(ResourceRegistry::new(fetcher));
        let autoloader = Autoloader::new(registry, set(&["a", "b", "c"]));

        let handles = autoloader.load_all().await.unwrap();
        let order: Vec<&str> = handles.iter().map(|h| h.id().as_str()).collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn load_all_fails_fast_without_cancelling_siblings() {
        let fetcher = ScriptedFetcher::new(vec![("a", 10), ("b", 1), ("c", 40)], vec!["b"]);
        let registry = Arc::new(ResourceRegistry::new(fetcher.clone()));
        let autoloader = Autoloader::new(Arc::clone(&registry), set(&["a", "b", "c"]));

        let err = autoloader.load_all().await.unwrap_err();
        assert_eq!(err.id, id("b"));
        assert_eq!(err.source, FetchError::NotFound { id: id("b") });

        // c is still in flight when the aggregate rejects.
        assert!(registry.is_loading(&id("c")));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(registry.is_loaded(&id("a")));
        assert!(registry.is_loaded(&id("c")));
        assert!(!registry.is_known(&id("b")));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn load_one_short_circuits_when_loaded() {
        let fetcher = ScriptedFetcher::new(vec![], vec![]);
        let registry = Arc::new(ResourceRegistry::new(fetcher.clone()));
        let autoloader = Autoloader::new(registry, DependencySet::empty());

        let first = autoloader.load_one(&id("x.js")).await.unwrap();
        let second = autoloader.load_one(&id("x.js")).await.unwrap();
        assert!(first.same_resource(&second));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn load_all_reuses_resources_loaded_earlier() {
        let fetcher = ScriptedFetcher::new(vec![], vec![]);
        let registry = Arc::new(ResourceRegistry::new(fetcher.clone()));
        let autoloader = Autoloader::new(registry, set(&["x.js", "y.js"]));

        autoloader.load_one(&id("x.js")).await.unwrap();
        autoloader.load_all().await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn load_each_reports_every_outcome() {
        let fetcher = ScriptedFetcher::new(vec![("one", 5)], vec!["two"]);
        let registry = Arc::new(ResourceRegistry::new(fetcher));
        let autoloader = Autoloader::new(registry, DependencySet::empty());

        let outcomes = autoloader
            .load_each(&[id("one"), id("two"), id("three")])
            .await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].0, id("one"));
        assert!(outcomes[0].1.is_ok());
        assert!(outcomes[1].1.is_err());
        assert!(outcomes[2].1.is_ok());
    }

    #[tokio::test]
    async fn empty_set_loads_trivially() {
        let fetcher = ScriptedFetcher::new(vec![], vec![]);
        let registry = Arc::new(ResourceRegistry::new(fetcher.clone()));
        let autoloader = Autoloader::new(registry, DependencySet::empty());
        assert!(autoloader.load_all().await.unwrap().is_empty());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }
}
