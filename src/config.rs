//! # Provider Settings
//!
//! Process-level settings loaded from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `AWS_REGION` | `us-west-1` |
//! | `SECRETS_ENDPOINT_URL` | SDK default |
//! | `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` | default credential chain |
//! | `APP_ENVIRONMENT` / `APP_NAME` | no prefix |
//! | `SECRETS_POLLING_INTERVAL_SECS` | `0` (disabled) |
//! | `GENERATE_APP_SETTINGS` | `false` |
//! | `APP_SETTINGS_FILE_NAME` / `APP_SETTINGS_FILE_PATH` | `appsettings.json` in the working directory |
//! | `LOG_LEVEL` / `LOG_FORMAT` | `INFO` / `text` |
//! | `METRICS_PORT` | `5000` |

use crate::client::{AwsAuthConfig, AwsConfig};
use crate::constants::{
    DEFAULT_LOG_FORMAT, DEFAULT_METRICS_PORT, DEFAULT_REGION, POLLING_DISABLED_SECS,
};
use crate::error::ConfigurationError;
use crate::options::ProviderOptions;
use crate::settings_file::SettingsFileOptions;
use std::path::PathBuf;
use std::time::Duration;

/// Provider settings
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub region: String,
    /// Override the Secrets Manager endpoint (LocalStack and similar)
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Deployment environment, first segment of the secret name prefix
    pub environment: Option<String>,
    /// Application name, second segment of the secret name prefix
    pub app_name: Option<String>,
    pub polling_interval_secs: u64,
    /// Write raw JSON payloads to a settings file
    pub generate_app_settings: bool,
    pub app_settings_file_name: Option<String>,
    pub app_settings_file_path: Option<PathBuf>,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    pub metrics_port: u16,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key_id", &self.access_key_id)
            .field("environment", &self.environment)
            .field("app_name", &self.app_name)
            .field("polling_interval_secs", &self.polling_interval_secs)
            .field("generate_app_settings", &self.generate_app_settings)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("metrics_port", &self.metrics_port)
            .finish_non_exhaustive()
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            environment: None,
            app_name: None,
            polling_interval_secs: POLLING_DISABLED_SECS,
            generate_app_settings: false,
            app_settings_file_name: None,
            app_settings_file_path: None,
            log_level: "INFO".to_string(),
            log_format: DEFAULT_LOG_FORMAT.to_string(),
            metrics_port: DEFAULT_METRICS_PORT,
        }
    }
}

impl ProviderSettings {
    /// Load settings from environment variables with defaults
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            region: var_or_default_str(&lookup, "AWS_REGION", &defaults.region),
            endpoint_url: var_non_empty(&lookup, "SECRETS_ENDPOINT_URL"),
            access_key_id: var_non_empty(&lookup, "AWS_ACCESS_KEY_ID"),
            secret_access_key: var_non_empty(&lookup, "AWS_SECRET_ACCESS_KEY"),
            environment: var_non_empty(&lookup, "APP_ENVIRONMENT"),
            app_name: var_non_empty(&lookup, "APP_NAME"),
            polling_interval_secs: var_or_default(
                &lookup,
                "SECRETS_POLLING_INTERVAL_SECS",
                defaults.polling_interval_secs,
            ),
            generate_app_settings: var_strict_bool(
                &lookup,
                "GENERATE_APP_SETTINGS",
                defaults.generate_app_settings,
            )?,
            app_settings_file_name: var_non_empty(&lookup, "APP_SETTINGS_FILE_NAME"),
            app_settings_file_path: var_non_empty(&lookup, "APP_SETTINGS_FILE_PATH")
                .map(PathBuf::from),
            log_level: var_or_default_str(&lookup, "LOG_LEVEL", &defaults.log_level),
            log_format: var_or_default_str(&lookup, "LOG_FORMAT", &defaults.log_format),
            metrics_port: var_or_default(&lookup, "METRICS_PORT", defaults.metrics_port),
        })
    }

    /// Polling interval, or `None` when polling is disabled
    #[must_use]
    pub fn polling_interval(&self) -> Option<Duration> {
        (self.polling_interval_secs != POLLING_DISABLED_SECS)
            .then(|| Duration::from_secs(self.polling_interval_secs))
    }

    /// Secret name prefix `"{environment}/{app}/"` when both parts are set
    #[must_use]
    pub fn name_prefix(&self) -> Option<String> {
        match (&self.environment, &self.app_name) {
            (Some(environment), Some(app_name)) => Some(format!("{environment}/{app_name}/")),
            _ => None,
        }
    }

    /// Connection settings for the AWS client
    #[must_use]
    pub fn aws_config(&self) -> AwsConfig {
        let auth = match (&self.access_key_id, &self.secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => AwsAuthConfig::AccessKeys {
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
            },
            _ => AwsAuthConfig::DefaultChain,
        };
        AwsConfig {
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            auth: Some(auth),
        }
    }

    /// Provider options implied by these settings
    #[must_use]
    pub fn to_options(&self) -> ProviderOptions {
        let mut options = ProviderOptions::new();
        if let Some(prefix) = self.name_prefix() {
            options = options.with_name_prefix(prefix);
        }
        if let Some(interval) = self.polling_interval() {
            options = options.with_polling_interval(interval);
        }
        if self.generate_app_settings {
            let mut settings_file = SettingsFileOptions::new();
            settings_file.file_name = self.app_settings_file_name.clone();
            settings_file.file_path = self.app_settings_file_path.clone();
            options = options.with_settings_file(settings_file);
        }
        options
    }
}

/// Parse a strict boolean
///
/// Accepts `true`/`yes`/`1` and `false`/`no`/`0`, case-insensitively.
pub fn parse_strict_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Read variable or return default value
fn var_or_default<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read variable as string or return default
fn var_or_default_str<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    var_non_empty(lookup, key).unwrap_or_else(|| default.to_string())
}

fn var_non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

/// Read variable as a strict boolean; unknown values are an error
fn var_strict_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    match var_non_empty(lookup, key) {
        None => Ok(default),
        Some(value) => parse_strict_bool(&value).ok_or(ConfigurationError::InvalidSetting {
            key: key.to_string(),
            value,
        }),
    }
}
