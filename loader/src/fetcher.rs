//! Fetch capability and the filesystem binding.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;

use liftoff_types::{FetchError, Identifier, ResourceHandle};

pub type FetchFut = Pin<Box<dyn Future<Output = Result<ResourceHandle, FetchError>> + Send>>;

/// Obtains a resource by identifier.
///
/// The returned future must be `'static`: the registry spawns it and lets it
/// run to completion even when nobody is waiting on the outcome any more.
pub trait ResourceFetcher: Send + Sync {
    fn fetch(&self, id: &Identifier) -> FetchFut;
}

/// Reads resources from a directory, probing for existence first.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map an identifier to a path under the root. Absolute paths and `..`
    /// segments are refused so a resource can never resolve outside it.
    fn resolve(&self, id: &Identifier) -> Result<PathBuf, FetchError> {
        let relative = Path::new(id.as_str());
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(FetchError::Rejected {
                        id: id.clone(),
                        reason: "path escapes the assets directory".to_string(),
                    });
                }
            }
        }
        Ok(self.root.join(relative))
    }
}

impl ResourceFetcher for FsFetcher {
    fn fetch(&self, id: &Identifier) -> FetchFut {
        let id = id.clone();
        let resolved = self.resolve(&id);
        Box::pin(async move {
            let path = resolved?;

            // Existence probe before the read.
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => return Err(FetchError::NotFound { id }),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(FetchError::NotFound { id });
                }
                Err(e) => {
                    return Err(FetchError::Io {
                        id,
                        message: e.to_string(),
                    });
                }
            }

            let bytes = tokio::fs::read(&path).await.map_err(|e| FetchError::Io {
                id: id.clone(),
                message: e.to_string(),
            })?;
            let source = String::from_utf8(bytes).map_err(|e| FetchError::Rejected {
                id: id.clone(),
                reason: format!("not valid UTF-8: {e}"),
            })?;

            tracing::debug!(id = %id, path = %path.display(), bytes = source.len(), "Fetched resource");
            Ok(ResourceHandle::new(id, source))
        })
    }
}
