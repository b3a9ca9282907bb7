//! # Provider State
//!
//! What a provider has published so far. Readers take cheap `Arc` clones; a
//! load cycle replaces the whole state under a short write lock.

use crate::error::ConfigurationError;
use crate::snapshot::{ConfigurationData, Snapshot};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Lifecycle of a configuration provider
///
/// ```text
/// Uninitialized -> Loading -> Steady -> Polling -> Disposed
///                     |          |________________^
///                     v
///               Uninitialized (initial load failed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    Uninitialized,
    Loading,
    /// Loaded; no polling configured
    Steady,
    /// Loaded and the background poller is running
    Polling,
    Disposed,
}

impl ProviderStatus {
    /// Check if configuration has been published at least once
    #[must_use]
    pub fn is_loaded(self) -> bool {
        matches!(self, ProviderStatus::Steady | ProviderStatus::Polling)
    }
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProviderStatus::Uninitialized => "uninitialized",
            ProviderStatus::Loading => "loading",
            ProviderStatus::Steady => "steady",
            ProviderStatus::Polling => "polling",
            ProviderStatus::Disposed => "disposed",
        };
        f.write_str(label)
    }
}

/// Record of the most recent failed load or reload
///
/// Cleared by the next successful cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub message: String,
    /// Secret the failure relates to, when there is one
    pub secret_name: Option<String>,
    pub transient: bool,
    pub occurred_at: DateTime<Utc>,
}

impl LoadFailure {
    pub(crate) fn from_error(error: &ConfigurationError) -> Self {
        Self {
            message: error_chain(error),
            secret_name: error.secret_name().map(ToString::to_string),
            transient: error.is_transient(),
            occurred_at: Utc::now(),
        }
    }
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Render an error with its sources, outermost first
pub(crate) fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[derive(Debug)]
pub(crate) struct ProviderState {
    pub(crate) status: ProviderStatus,
    pub(crate) snapshot: Arc<Snapshot>,
    pub(crate) data: Arc<ConfigurationData>,
    pub(crate) last_error: Option<LoadFailure>,
}

impl Default for ProviderState {
    fn default() -> Self {
        Self {
            status: ProviderStatus::Uninitialized,
            snapshot: Arc::new(Snapshot::new()),
            data: Arc::new(ConfigurationData::new()),
            last_error: None,
        }
    }
}
