//! Boot orchestration for the module runtime.
//!
//! [`BootOrchestrator`] loads the fetcher, then the autoloader, then the
//! autoloader's dependencies, and fires its [`ReadinessLatch`] once all of
//! them loaded. [`LegacyBooter`] is the late subscriber that loads legacy
//! resources after boot, whenever it happens to attach.

mod latch;
mod legacy;
mod orchestrator;

pub use latch::ReadinessLatch;
pub use legacy::{LegacyBooter, LegacyReport};
pub use orchestrator::{AbortHandler, BootOrchestrator, BootPlan, BootReport};
