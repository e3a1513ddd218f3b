//! Configuration for the boot runtime.
//!
//! `BootConfig` is the boundary type deserialized from TOML. Every field has a
//! default so an empty file (or no file at all) yields the stock layout.
//! [`BootConfig::resolve`] turns it into identifiers the loader can use.

mod paths;
mod resolved;

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub use paths::{AssetPaths, LegacyPaths};
pub use resolved::{ResolvedBoot, ResolvedLegacy};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "LIFTOFF_CONFIG";

/// Default name of the fire-once boot signal.
pub const DEFAULT_BOOTED_EVENT: &str = "appBooted";

pub(crate) const fn default_true() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Invalid { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BootConfig {
    pub assets: AssetsConfig,
    pub boot: StagesConfig,
    pub legacy: LegacyConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Assets root, e.g. `src/asset/`.
    pub root: String,
    /// JS sub-path under the root.
    pub js: String,
    /// Application sub-path under the JS root.
    pub app: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: "src/asset/".to_string(),
            js: "js/".to_string(),
            app: "app/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StagesConfig {
    /// File name of the fetcher resource, loaded first.
    pub fetcher: String,
    /// File name of the autoloader resource, loaded second.
    pub autoloader: String,
    /// Name of the fire-once signal raised when boot completes.
    pub event: String,
    /// Application resources, in dispatch order.
    pub dependencies: Vec<String>,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            fetcher: "FileHelper.js".to_string(),
            autoloader: "Autoloader.js".to_string(),
            event: DEFAULT_BOOTED_EVENT.to_string(),
            dependencies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LegacyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Helper resource, relative to the application JS root.
    pub helper: String,
    pub root: String,
    pub js: String,
    /// Legacy resources. `site-util.js` must come first and `site.js` last.
    pub scripts: Vec<String>,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            helper: "helper/legacy-helper.js".to_string(),
            root: "wwwroot/".to_string(),
            js: "js/".to_string(),
            scripts: vec![
                "site-util.js".to_string(),
                "site-interactivity.js".to_string(),
                "site.js".to_string(),
            ],
        }
    }
}

impl BootConfig {
    /// Load from the default location.
    ///
    /// Returns `Ok(None)` when no config file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let path = match config_path() {
            Some(path) => path,
            None => return Ok(None),
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn asset_paths(&self) -> AssetPaths {
        AssetPaths::new(&self.assets.root, &self.assets.js, &self.assets.app)
    }

    #[must_use]
    pub fn legacy_paths(&self) -> LegacyPaths {
        LegacyPaths::new(&self.legacy.root, &self.legacy.js)
    }

    /// Build identifiers for every stage, rejecting blank names and
    /// duplicate dependencies.
    pub fn resolve(&self) -> Result<ResolvedBoot, ConfigError> {
        ResolvedBoot::from_config(self)
    }
}

/// `$LIFTOFF_CONFIG` if set, otherwise `~/.liftoff/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(explicit));
    }
    dirs::home_dir().map(|home| home.join(".liftoff").join("config.toml"))
}
