//! Resource loading for the boot runtime.
//!
//! - [`ResourceFetcher`] is the capability that actually obtains a resource.
//! - [`ResourceRegistry`] wraps a fetcher and guarantees at most one fetch
//!   in flight per identifier.
//! - [`Autoloader`] loads a [`DependencySet`](liftoff_types::DependencySet)
//!   through the registry.
//!
//! Requests spawn onto the ambient Tokio runtime, so every entry point that
//! dispatches a fetch must be called from within one.

mod autoloader;
mod fetcher;
mod registry;

pub use autoloader::Autoloader;
pub use fetcher::{FetchFut, FsFetcher, ResourceFetcher};
pub use registry::{PendingLoad, ResourceRegistry};
