//! Core domain types for liftoff.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the runtime.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod deps;
mod error;
mod ids;
mod resource;
mod state;

pub use deps::{DependencySet, DependencySetError};
pub use error::{AbortCause, BootAbort, BootError, DependencyLoadError, FetchError};
pub use ids::{Identifier, IdentifierError};
pub use resource::ResourceHandle;
pub use state::{BootStage, BootState};
