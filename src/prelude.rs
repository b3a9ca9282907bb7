//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use secret_config_provider::prelude::*;
//! ```
//!
//! This brings into scope:
//! - The provider, its builder and its options
//! - The secret store client trait and both implementations
//! - Configuration views and secret metadata types
//! - Error types

pub use crate::provider::{ChangeListener, ConfigurationProvider, LoadFailure, ProviderStatus};
pub use crate::source::ConfigurationSource;

pub use crate::options::{KeyGenerator, ProviderOptions, SecretFilter, SecretValueRequestHook};
pub use crate::settings_file::SettingsFileOptions;

pub use crate::client::{
    AwsAuthConfig, AwsConfig, AwsSecretsManagerClient, InMemorySecretStore, SecretStoreClient,
};

pub use crate::config::ProviderSettings;
pub use crate::secret::{ListFilter, SecretRecord, SecretValueContext, SecretValueRequest};
pub use crate::snapshot::{ConfigurationData, ConfigurationEntry, Snapshot};

pub use crate::error::{ConfigurationError, StoreError};

pub use tokio_util::sync::CancellationToken;
