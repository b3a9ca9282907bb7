//! # Configuration Source
//!
//! Builder that wires a secret store client to a [`ConfigurationProvider`].
//!
//! ```rust,no_run
//! use secret_config_provider::prelude::*;
//!
//! # async fn run() -> Result<(), ConfigurationError> {
//! let provider = ConfigurationSource::new(ProviderOptions::new().with_name_prefix("prod/api/"))
//!     .with_region("eu-west-1")
//!     .build_and_load()
//!     .await?;
//! let host = provider.get("database:host");
//! # Ok(())
//! # }
//! ```

use crate::client::{AwsAuthConfig, AwsConfig, AwsSecretsManagerClient, SecretStoreClient};
use crate::config::ProviderSettings;
use crate::constants::DEFAULT_REGION;
use crate::error::ConfigurationError;
use crate::options::ProviderOptions;
use crate::provider::ConfigurationProvider;
use std::sync::Arc;

/// Creates the client a provider will use
pub type ClientFactory = Arc<dyn Fn() -> Arc<dyn SecretStoreClient> + Send + Sync>;

/// Provider builder
#[derive(Clone)]
pub struct ConfigurationSource {
    options: ProviderOptions,
    aws: AwsConfig,
    client_factory: Option<ClientFactory>,
}

impl std::fmt::Debug for ConfigurationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationSource")
            .field("options", &self.options)
            .field("aws", &self.aws)
            .field("custom_client", &self.client_factory.is_some())
            .finish()
    }
}

impl ConfigurationSource {
    #[must_use]
    pub fn new(options: ProviderOptions) -> Self {
        Self {
            options,
            aws: AwsConfig::new(DEFAULT_REGION),
            client_factory: None,
        }
    }

    /// Source configured from process settings
    #[must_use]
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self {
            options: settings.to_options(),
            aws: settings.aws_config(),
            client_factory: None,
        }
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.aws.region = region.into();
        self
    }

    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.aws.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Use static access keys instead of the default credential chain
    #[must_use]
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.aws.auth = Some(AwsAuthConfig::AccessKeys {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        });
        self
    }

    /// Replace the AWS client with one produced by `factory`
    ///
    /// Region, endpoint and credentials are ignored once a factory is set.
    #[must_use]
    pub fn with_client_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn SecretStoreClient> + Send + Sync + 'static,
    {
        self.client_factory = Some(Arc::new(factory));
        self
    }

    #[must_use]
    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }

    #[must_use]
    pub fn aws_config(&self) -> &AwsConfig {
        &self.aws
    }

    /// Create the provider without loading it
    pub async fn build(&self) -> Result<ConfigurationProvider, ConfigurationError> {
        self.options.validate()?;
        let client: Arc<dyn SecretStoreClient> = match &self.client_factory {
            Some(factory) => factory(),
            None => Arc::new(AwsSecretsManagerClient::new(&self.aws).await),
        };
        ConfigurationProvider::new(client, self.options.clone())
    }

    /// Create the provider and perform its initial load
    pub async fn build_and_load(&self) -> Result<ConfigurationProvider, ConfigurationError> {
        let provider = self.build().await?;
        provider.load().await?;
        Ok(provider)
    }
}
