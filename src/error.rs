//! # Errors
//!
//! Failure taxonomy for loading and reloading secret-backed configuration.
//!
//! Two error types exist:
//! - [`StoreError`]: what a [`crate::client::SecretStoreClient`] reports
//! - [`ConfigurationError`]: what the provider reports to its callers
//!
//! Filtered-out secrets and unchanged snapshots are not errors. Everything
//! else listed here fails the load or reload cycle it occurred in.

use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by a secret store client
#[derive(Debug, Error)]
pub enum StoreError {
    /// The secret does not exist (deleted between list and fetch)
    #[error("secret not found: {secret_id}")]
    NotFound { secret_id: String },

    /// Any other failure talking to the store
    #[error("secret store request failed: {0}")]
    Service(#[from] anyhow::Error),
}

impl StoreError {
    /// Check if this error means the secret no longer exists
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Errors reported by the configuration provider
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A listed secret was not found when its value was fetched
    #[error("Error retrieving secret value (Secret: {name} Arn: {arn})")]
    MissingSecretValue {
        name: String,
        arn: String,
        #[source]
        source: StoreError,
    },

    /// Fetching a secret value failed for a reason other than not-found
    #[error("failed to fetch secret value for {name}")]
    Store {
        name: String,
        #[source]
        source: StoreError,
    },

    /// Enumerating secrets failed
    #[error("failed to list secrets")]
    ListSecrets(#[source] StoreError),

    /// Writing the raw payload to the settings file failed
    #[error("failed to write settings file {}", path.display())]
    SettingsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A polling interval of zero was configured
    #[error("polling interval must be strictly positive")]
    InvalidPollingInterval,

    /// An accepted secret ARN was blank
    #[error("accepted secret ARN at position {index} is empty")]
    EmptyAcceptedArn { index: usize },

    /// An environment setting has a value that cannot be interpreted
    #[error("invalid value {value:?} for {key}")]
    InvalidSetting { key: String, value: String },

    /// Reload was requested before the initial load completed
    #[error("configuration has not been loaded yet")]
    NotLoaded,

    /// The provider has been disposed
    #[error("configuration provider has been disposed")]
    Disposed,

    /// The operation observed its cancellation signal
    #[error("configuration reload was cancelled")]
    Cancelled,
}

impl ConfigurationError {
    /// Name of the secret this error relates to, if any
    #[must_use]
    pub fn secret_name(&self) -> Option<&str> {
        match self {
            ConfigurationError::MissingSecretValue { name, .. }
            | ConfigurationError::Store { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Check if a later retry may succeed
    ///
    /// Missing secrets and store failures can resolve themselves (a secret is
    /// recreated, the network recovers); validation and lifecycle errors cannot.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConfigurationError::MissingSecretValue { .. }
                | ConfigurationError::Store { .. }
                | ConfigurationError::ListSecrets(_)
                | ConfigurationError::SettingsFile { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_secret_value_message_names_secret_and_arn() {
        let err = ConfigurationError::MissingSecretValue {
            name: "prod/api/db".to_string(),
            arn: "arn:aws:secretsmanager:us-west-1:123456789012:secret:prod/api/db-AbCdEf"
                .to_string(),
            source: StoreError::NotFound {
                secret_id: "prod/api/db".to_string(),
            },
        };

        let message = err.to_string();
        assert!(message.contains("prod/api/db"));
        assert!(message.contains("secret:prod/api/db-AbCdEf"));
        assert_eq!(err.secret_name(), Some("prod/api/db"));
        assert!(err.is_transient());
    }

    #[test]
    fn test_lifecycle_errors_are_permanent() {
        assert!(!ConfigurationError::Disposed.is_transient());
        assert!(!ConfigurationError::InvalidPollingInterval.is_transient());
        assert!(!ConfigurationError::InvalidSetting {
            key: "GENERATE_APP_SETTINGS".to_string(),
            value: "maybe".to_string(),
        }
        .is_transient());
        assert!(ConfigurationError::NotLoaded.secret_name().is_none());
    }

    #[test]
    fn test_store_error_not_found_classification() {
        let not_found = StoreError::NotFound {
            secret_id: "x".to_string(),
        };
        let service = StoreError::Service(anyhow::anyhow!("throttled"));
        assert!(not_found.is_not_found());
        assert!(!service.is_not_found());
    }
}
