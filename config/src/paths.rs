//! Asset path building.
//!
//! Paths are plain concatenations: each segment carries its own trailing
//! slash (`"src/asset/"`, `"js/"`). No normalization is applied, so the
//! identifier produced is exactly what the fetcher receives.

use liftoff_types::{Identifier, IdentifierError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    root: String,
    js: String,
    app: String,
}

impl AssetPaths {
    #[must_use]
    pub fn new(root: impl Into<String>, js: impl Into<String>, app: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            js: js.into(),
            app: app.into(),
        }
    }

    /// `root + js`, e.g. `src/asset/js/`.
    #[must_use]
    pub fn js_root(&self) -> String {
        format!("{}{}", self.root, self.js)
    }

    /// `root + js + app`, e.g. `src/asset/js/app/`.
    #[must_use]
    pub fn app_root(&self) -> String {
        format!("{}{}{}", self.root, self.js, self.app)
    }

    /// Identifier of a resource under the JS assets root.
    pub fn js_asset(&self, name: &str) -> Result<Identifier, IdentifierError> {
        non_blank(name)?;
        Identifier::new(format!("{}{name}", self.js_root()))
    }

    /// Identifier of a resource under the application assets root.
    pub fn app_asset(&self, name: &str) -> Result<Identifier, IdentifierError> {
        non_blank(name)?;
        Identifier::new(format!("{}{name}", self.app_root()))
    }
}

/// Path rule for legacy resources: `root + js + name` with no app segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyPaths {
    root: String,
    js: String,
}

impl LegacyPaths {
    #[must_use]
    pub fn new(root: impl Into<String>, js: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            js: js.into(),
        }
    }

    #[must_use]
    pub fn js_root(&self) -> String {
        format!("{}{}", self.root, self.js)
    }

    pub fn script(&self, name: &str) -> Result<Identifier, IdentifierError> {
        non_blank(name)?;
        Identifier::new(format!("{}{name}", self.js_root()))
    }
}

// A blank name would otherwise resolve to the bare directory path.
fn non_blank(name: &str) -> Result<(), IdentifierError> {
    if name.trim().is_empty() {
        Err(IdentifierError::Empty)
    } else {
        Ok(())
    }
}
