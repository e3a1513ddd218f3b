//! Failure taxonomy for loading and booting.
//!
//! `FetchError` is local to one identifier and is cloned to every caller that
//! shared the load. `DependencyLoadError` wraps the first fetch failure seen by
//! an aggregate load. `BootAbort` is terminal for the orchestrator.

use thiserror::Error;

use crate::{BootStage, BootState, Identifier};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("resource '{id}' could not be found")]
    NotFound { id: Identifier },
    #[error("resource '{id}' could not be loaded: {message}")]
    Io { id: Identifier, message: String },
    #[error("resource '{id}' was rejected: {reason}")]
    Rejected { id: Identifier, reason: String },
    /// The fetch task ended without producing an outcome.
    #[error("load of resource '{id}' was abandoned before it settled")]
    Abandoned { id: Identifier },
}

impl FetchError {
    #[must_use]
    pub fn id(&self) -> &Identifier {
        match self {
            Self::NotFound { id }
            | Self::Io { id, .. }
            | Self::Rejected { id, .. }
            | Self::Abandoned { id } => id,
        }
    }
}

/// First failure observed while loading a dependency set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dependency '{id}' failed to load")]
pub struct DependencyLoadError {
    pub id: Identifier,
    #[source]
    pub source: FetchError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbortCause {
    #[error("fetcher could not be loaded")]
    FetcherUnavailable(#[source] FetchError),
    #[error("autoloader could not be loaded")]
    AutoloaderUnavailable(#[source] FetchError),
    #[error("not all dependencies could be loaded")]
    Dependencies(#[source] DependencyLoadError),
}

/// Stage-labelled failure that halted the boot sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("boot aborted during {stage}: {cause}")]
pub struct BootAbort {
    pub stage: BootStage,
    #[source]
    pub cause: AbortCause,
}

impl BootAbort {
    #[must_use]
    pub fn stage_label(&self) -> &'static str {
        self.stage.label()
    }

    /// The fetch failure at the bottom of the chain.
    #[must_use]
    pub fn fetch_error(&self) -> &FetchError {
        match &self.cause {
            AbortCause::FetcherUnavailable(err) | AbortCause::AutoloaderUnavailable(err) => err,
            AbortCause::Dependencies(err) => &err.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootError {
    #[error(transparent)]
    Aborted(#[from] BootAbort),
    #[error("boot was already started (state: {0})")]
    AlreadyStarted(BootState),
}
