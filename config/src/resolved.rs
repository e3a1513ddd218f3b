//! Resolved, invariant-safe configuration.
//!
//! Converts the string-based boundary config into identifiers and a
//! duplicate-free dependency set.

use liftoff_types::{DependencySet, Identifier, IdentifierError};

use crate::{BootConfig, ConfigError};

#[derive(Debug, Clone)]
pub struct ResolvedBoot {
    pub fetcher: Identifier,
    pub autoloader: Identifier,
    pub dependencies: DependencySet,
    pub event: String,
    /// `None` when the legacy subsystem is disabled.
    pub legacy: Option<ResolvedLegacy>,
}

#[derive(Debug, Clone)]
pub struct ResolvedLegacy {
    pub helper: Identifier,
    pub scripts: Vec<Identifier>,
}

fn invalid(what: &str, name: &str, err: IdentifierError) -> ConfigError {
    ConfigError::Invalid {
        message: format!("{what} '{name}': {err}"),
    }
}

impl ResolvedBoot {
    pub fn from_config(config: &BootConfig) -> Result<Self, ConfigError> {
        let paths = config.asset_paths();

        let fetcher = paths
            .app_asset(&config.boot.fetcher)
            .map_err(|e| invalid("fetcher", &config.boot.fetcher, e))?;
        let autoloader = paths
            .app_asset(&config.boot.autoloader)
            .map_err(|e| invalid("autoloader", &config.boot.autoloader, e))?;

        let ids = config
            .boot
            .dependencies
            .iter()
            .map(|name| paths.app_asset(name).map_err(|e| invalid("dependency", name, e)))
            .collect::<Result<Vec<_>, _>>()?;
        let dependencies = DependencySet::new(ids).map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })?;

        let event = if config.boot.event.trim().is_empty() {
            crate::DEFAULT_BOOTED_EVENT.to_string()
        } else {
            config.boot.event.clone()
        };

        let legacy = if config.legacy.enabled {
            Some(ResolvedLegacy::from_config(config)?)
        } else {
            None
        };

        Ok(Self {
            fetcher,
            autoloader,
            dependencies,
            event,
            legacy,
        })
    }
}

impl ResolvedLegacy {
    pub fn from_config(config: &BootConfig) -> Result<Self, ConfigError> {
        let helper = config
            .asset_paths()
            .js_asset(&config.legacy.helper)
            .map_err(|e| invalid("legacy helper", &config.legacy.helper, e))?;
        let legacy_paths = config.legacy_paths();
        let scripts = config
            .legacy
            .scripts
            .iter()
            .map(|name| {
                legacy_paths
                    .script(name)
                    .map_err(|e| invalid("legacy script", name, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { helper, scripts })
    }
}
