//! Layer stack configuration loaded from RON.
//!
//! ```ron
//! (
//!     root: "mods/base",
//!     additional: ["mods/extra"],
//!     exclude: ["secret/"],
//! )
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::UnionError;
use crate::layer::LayerSpec;
use crate::mask::MaskPredicate;

/// A layer stack description.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StackConfig {
    /// Primary root, lowest priority.
    pub root: PathBuf,
    /// Layers placed ahead of the root, highest priority first.
    #[serde(default)]
    pub additional: Vec<PathBuf>,
    /// Relative-text prefixes hidden in every layer.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Error type for config loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

impl From<ConfigError> for UnionError {
    fn from(e: ConfigError) -> Self {
        UnionError::Config(e.to_string())
    }
}

impl StackConfig {
    /// Parse a config from RON text. Relative paths are kept as written.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Load a config file. Relative layer paths resolve against the
    /// directory containing the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_ron_str(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        tracing::debug!(config = %path.display(), "loaded layer stack config");
        Ok(config.relative_to(base))
    }

    fn relative_to(self, base: &Path) -> Self {
        let anchor = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        Self {
            root: anchor(self.root),
            additional: self.additional.into_iter().map(anchor).collect(),
            exclude: self.exclude,
        }
    }

    /// Layers in priority order: `additional`, then `root`.
    pub fn layers(&self) -> Vec<LayerSpec> {
        self.additional
            .iter()
            .chain(std::iter::once(&self.root))
            .cloned()
            .map(LayerSpec::from)
            .collect()
    }

    /// Mask built from `exclude`.
    pub fn mask(&self) -> MaskPredicate {
        if self.exclude.is_empty() {
            MaskPredicate::AllowAll
        } else {
            MaskPredicate::exclude_prefixes(self.exclude.iter().cloned())
        }
    }
}
