// History configuration
//
// Stored as RON next to the other editor settings. A missing file means
// defaults; a malformed file is reported so the user does not silently lose
// their settings.

use crate::history::domain::DomainKey;
use crate::history::timeline::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the history configuration inside the config directory
pub const CONFIG_FILE_NAME: &str = "history.ron";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Undo depth settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Undo steps kept per domain unless overridden
    pub max_depth: usize,
    /// Per-domain overrides
    pub domains: HashMap<DomainKey, usize>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            domains: HashMap::new(),
        }
    }
}

impl HistoryConfig {
    /// Configuration with the same depth for every domain
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    /// Builder-style per-domain override
    pub fn with_domain_depth(mut self, key: DomainKey, max_depth: usize) -> Self {
        self.domains.insert(key, max_depth);
        self
    }

    /// Depth for a domain
    pub fn max_depth_for(&self, key: DomainKey) -> usize {
        self.domains.get(&key).copied().unwrap_or(self.max_depth)
    }

    /// Check that every depth allows at least one undo step
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` naming the offending entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be at least 1".into()));
        }
        if let Some((key, _)) = self.domains.iter().find(|(_, depth)| **depth == 0) {
            return Err(ConfigError::Invalid(format!(
                "max_depth for '{}' must be at least 1",
                key
            )));
        }
        Ok(())
    }

    /// Default location: `<config dir>/mapforge/history.ron`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mapforge").join(CONFIG_FILE_NAME))
    }

    /// Load and validate a configuration file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = ron::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, falling back to defaults if it does not exist
    ///
    /// # Errors
    /// Returns an error if the file exists but is unreadable or invalid.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no history config, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save the configuration, creating parent directories as needed
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, text)?;
        Ok(())
    }
}
