//! Editor configuration
//!
//! Every field is optional in TOML; missing fields take their defaults.
//!
//! ```toml
//! default_version = "1.0"
//! create_backup_on_deploy = true
//!
//! [autosave]
//! enabled = true
//! debounce_ms = 30000
//! storage_key_prefix = "tcb-autosave"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tcb_autosave::AutoSaveConfig;
use tcb_config::DEFAULT_VERSION;

/// Failure reading an [`EditorConfig`]
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Contents are not valid TOML for this shape
    #[error("invalid editor configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Editor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Autosave behaviour
    pub autosave: AutoSaveConfig,
    /// Version stamped on merged documents that carry none
    pub default_version: String,
    /// Whether deploy asks the store to back up the previous document
    pub create_backup_on_deploy: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave: AutoSaveConfig::default(),
            default_version: DEFAULT_VERSION.to_string(),
            create_backup_on_deploy: true,
        }
    }
}

impl EditorConfig {
    /// Default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With autosave settings
    #[inline]
    #[must_use]
    pub fn with_autosave(mut self, autosave: AutoSaveConfig) -> Self {
        self.autosave = autosave;
        self
    }

    /// With fallback document version
    #[inline]
    #[must_use]
    pub fn with_default_version(mut self, version: impl Into<String>) -> Self {
        self.default_version = version.into();
        self
    }

    /// With deploy backups on or off
    #[inline]
    #[must_use]
    pub fn with_backup_on_deploy(mut self, enabled: bool) -> Self {
        self.create_backup_on_deploy = enabled;
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns [`ConfigLoadError::Parse`] on malformed TOML or mistyped fields
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigLoadError> {
        Ok(toml::from_str(text)?)
    }

    /// Read a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded editor configuration");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(EditorConfig::from_toml_str("").unwrap(), EditorConfig::default());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = EditorConfig::from_toml_str(
            r#"
            default_version = "2.0"

            [autosave]
            debounce_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.default_version, "2.0");
        assert!(config.create_backup_on_deploy);
        assert_eq!(config.autosave.debounce_ms, 500);
        assert_eq!(config.autosave.storage_key_prefix, "tcb-autosave");
        assert!(config.autosave.enabled);
    }

    #[test]
    fn mistyped_field_is_rejected() {
        let err = EditorConfig::from_toml_str("create_backup_on_deploy = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse(_)));
    }

    #[test]
    fn load_reads_file_and_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.toml");
        std::fs::write(&path, "create_backup_on_deploy = false\n").unwrap();

        assert!(!EditorConfig::load(&path).unwrap().create_backup_on_deploy);
        assert!(matches!(
            EditorConfig::load(dir.path().join("missing.toml")),
            Err(ConfigLoadError::Io { .. })
        ));
    }
}
