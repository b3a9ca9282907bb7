//! # Provider Options
//!
//! Declarative policy for a [`crate::provider::ConfigurationProvider`]:
//! - which secrets are enumerated (accept-list or paginated listing + filters)
//! - which listed secrets are accepted ([`SecretFilter`])
//! - how extracted keys become configuration keys ([`KeyGenerator`])
//! - how each get-secret-value request is shaped
//! - whether and how often to poll for changes
//! - whether raw payloads are materialised to a settings file
//!
//! Policies are plain closures; defaults accept every secret and pass keys
//! through unchanged.

use crate::error::ConfigurationError;
use crate::secret::{ListFilter, SecretRecord, SecretValueContext, SecretValueRequest};
use crate::settings_file::SettingsFileOptions;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether a listed secret contributes to the configuration
pub type SecretFilter = Arc<dyn Fn(&SecretRecord) -> bool + Send + Sync>;

/// Maps `(secret, extracted key)` to the final configuration key
pub type KeyGenerator = Arc<dyn Fn(&SecretRecord, &str) -> String + Send + Sync>;

/// Adjusts a get-secret-value request before it is sent
pub type SecretValueRequestHook =
    Arc<dyn Fn(&mut SecretValueRequest, &SecretValueContext) + Send + Sync>;

/// Options for a configuration provider
#[derive(Clone)]
pub struct ProviderOptions {
    /// When non-empty, only these secrets are fetched and no list call is made
    pub accepted_secret_arns: Vec<String>,
    pub secret_filter: SecretFilter,
    /// Server-side filters passed to every list page
    pub list_filters: Vec<ListFilter>,
    pub key_generator: KeyGenerator,
    pub configure_secret_value_request: SecretValueRequestHook,
    /// `None` disables polling; the provider then loads once
    pub polling_interval: Option<Duration>,
    pub settings_file: Option<SettingsFileOptions>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            accepted_secret_arns: Vec::new(),
            secret_filter: Arc::new(|_: &SecretRecord| true),
            list_filters: Vec::new(),
            key_generator: Arc::new(|_: &SecretRecord, key: &str| key.to_string()),
            configure_secret_value_request: Arc::new(
                |_: &mut SecretValueRequest, _: &SecretValueContext| {},
            ),
            polling_interval: None,
            settings_file: None,
        }
    }
}

impl std::fmt::Debug for ProviderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderOptions")
            .field("accepted_secret_arns", &self.accepted_secret_arns)
            .field("list_filters", &self.list_filters)
            .field("polling_interval", &self.polling_interval)
            .field("settings_file", &self.settings_file)
            .finish_non_exhaustive()
    }
}

impl ProviderOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_accepted_secret_arns<I, S>(mut self, arns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepted_secret_arns = arns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_secret_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&SecretRecord) -> bool + Send + Sync + 'static,
    {
        self.secret_filter = Arc::new(filter);
        self
    }

    #[must_use]
    pub fn with_list_filter(mut self, filter: ListFilter) -> Self {
        self.list_filters.push(filter);
        self
    }

    #[must_use]
    pub fn with_key_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(&SecretRecord, &str) -> String + Send + Sync + 'static,
    {
        self.key_generator = Arc::new(generator);
        self
    }

    #[must_use]
    pub fn with_secret_value_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut SecretValueRequest, &SecretValueContext) + Send + Sync + 'static,
    {
        self.configure_secret_value_request = Arc::new(hook);
        self
    }

    #[must_use]
    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = Some(interval);
        self
    }

    #[must_use]
    pub fn with_settings_file(mut self, settings_file: SettingsFileOptions) -> Self {
        self.settings_file = Some(settings_file);
        self
    }

    /// Accept only secrets under `prefix` and strip it from generated keys
    ///
    /// `"prod/api/"` accepts `prod/api/database` and turns its key
    /// `prod/api/database:Host` into `database:Host`.
    #[must_use]
    pub fn with_name_prefix(self, prefix: impl Into<String>) -> Self {
        let prefix: Arc<str> = Arc::from(prefix.into());
        let filter_prefix = Arc::clone(&prefix);
        self.with_secret_filter(move |record| record.name.starts_with(&*filter_prefix))
            .with_key_generator(move |_, key| key.replace(&*prefix, ""))
    }

    /// Check invariants before any network activity
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.polling_interval.is_some_and(|interval| interval.is_zero()) {
            return Err(ConfigurationError::InvalidPollingInterval);
        }
        if let Some(index) = self
            .accepted_secret_arns
            .iter()
            .position(|arn| arn.trim().is_empty())
        {
            return Err(ConfigurationError::EmptyAcceptedArn { index });
        }
        Ok(())
    }
}
