//! Liftoff CLI - boots the module runtime from an asset directory.
//!
//! ```text
//! main() -> load_config() -> resolve() -> BootOrchestrator::boot()
//!                                               |
//!                                               v
//!                              Booted -> legacy pass | Aborted -> exit 1
//! ```
//!
//! Identifiers are resolved against `<assets-dir>` by an [`FsFetcher`].
//! Logs go to stderr; filter with `RUST_LOG`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use liftoff_boot::{BootOrchestrator, BootPlan, LegacyBooter};
use liftoff_config::BootConfig;
use liftoff_loader::{FsFetcher, ResourceRegistry};
use liftoff_types::BootError;

#[derive(Parser, Debug)]
#[command(name = "liftoff")]
#[command(about = "Boot a module runtime from an asset directory")]
#[command(version)]
struct Args {
    /// Directory asset identifiers are resolved against
    assets: PathBuf,

    /// Config file (defaults to $LIFTOFF_CONFIG, then ~/.liftoff/config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// How long to wait for legacy scripts after boot
    #[arg(long, value_name = "MS", default_value_t = 5000)]
    legacy_timeout_ms: u64,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

/// An explicit path must exist; the default location may be absent.
fn load_config(explicit: Option<&Path>) -> Result<BootConfig> {
    if let Some(path) = explicit {
        return BootConfig::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()));
    }
    let config = BootConfig::load().context("loading default config")?;
    if config.is_none() {
        tracing::debug!("No config file found; using defaults");
    }
    Ok(config.unwrap_or_default())
}

/// Returns `Ok(false)` when the boot aborted.
async fn run(args: Args) -> Result<bool> {
    ensure!(
        args.assets.is_dir(),
        "asset directory {} does not exist",
        args.assets.display()
    );

    let config = load_config(args.config.as_deref())?;
    let resolved = config.resolve().context("invalid boot configuration")?;

    let registry = Arc::new(ResourceRegistry::new(Arc::new(FsFetcher::new(
        args.assets.clone(),
    ))));
    let orchestrator = Arc::new(
        BootOrchestrator::new(BootPlan::from_resolved(&resolved), registry)
            .with_abort_handler(|abort| eprintln!("Error: {abort}")),
    );

    let legacy = resolved
        .legacy
        .as_ref()
        .map(|legacy| LegacyBooter::from_resolved(legacy).attach(&orchestrator));

    match orchestrator.boot().await {
        Ok(report) => println!(
            "{}: booted with {} dependencies in {}ms",
            orchestrator.plan().event,
            report.dependencies.len(),
            report.elapsed.as_millis()
        ),
        // Already reported by the abort handler.
        Err(BootError::Aborted(_)) => return Ok(false),
        Err(err) => return Err(err.into()),
    }

    let Some(legacy) = legacy else {
        return Ok(true);
    };
    match tokio::time::timeout(Duration::from_millis(args.legacy_timeout_ms), legacy).await {
        Ok(Ok(report)) => {
            for (id, err) in &report.failed {
                eprintln!("Warning: legacy script {id}: {err}");
            }
            println!(
                "legacy: {} loaded, {} failed",
                report.loaded.len(),
                report.failed.len()
            );
        }
        Ok(Err(_)) => tracing::warn!("Legacy pass ended without a report"),
        Err(_) => tracing::warn!(
            timeout_ms = args.legacy_timeout_ms,
            "Timed out waiting for legacy scripts"
        ),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}
