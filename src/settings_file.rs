//! # Settings File
//!
//! Writes a raw structured secret payload to disk so local tooling can read
//! the same settings the provider loaded.
//!
//! The file is overwritten on every write. It is a side channel: nothing in
//! the provider reads it back.

use crate::constants::DEFAULT_SETTINGS_FILE_NAME;
use crate::error::ConfigurationError;
use std::path::PathBuf;
use tracing::info;

/// Where the settings file is written
///
/// Both parts fall back to defaults: the current working directory and
/// `appsettings.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsFileOptions {
    pub file_name: Option<String>,
    pub file_path: Option<PathBuf>,
}

impl SettingsFileOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    #[must_use]
    pub fn with_file_path(mut self, file_path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    /// Full path of the settings file
    pub fn resolve_path(&self) -> Result<PathBuf, ConfigurationError> {
        let directory = match self.file_path.as_ref().filter(|p| !p.as_os_str().is_empty()) {
            Some(path) => path.clone(),
            None => std::env::current_dir().map_err(|source| ConfigurationError::SettingsFile {
                path: PathBuf::from("."),
                source,
            })?,
        };
        let file_name = self
            .file_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_SETTINGS_FILE_NAME);
        Ok(directory.join(file_name))
    }

    /// Write `payload` verbatim, replacing any existing file
    ///
    /// Blank payloads are skipped. Returns the path written, if any.
    pub async fn write(&self, payload: &str) -> Result<Option<PathBuf>, ConfigurationError> {
        if payload.trim().is_empty() {
            return Ok(None);
        }
        let path = self.resolve_path()?;
        tokio::fs::write(&path, payload)
            .await
            .map_err(|source| ConfigurationError::SettingsFile {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), bytes = payload.len(), "Wrote settings file");
        Ok(Some(path))
    }
}
