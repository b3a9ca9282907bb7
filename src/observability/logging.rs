//! # Logging
//!
//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins when set. Otherwise the filter is built from `LOG_LEVEL`
//! and applies to this crate and the `secretcfg` binary only, so SDK internals
//! stay quiet.

use crate::config::ProviderSettings;
use crate::constants::DEFAULT_LOG_FILTER;
use tracing_subscriber::EnvFilter;

/// Build the filter for `settings`
#[must_use]
pub fn env_filter(settings: &ProviderSettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = settings.log_level.trim().to_lowercase();
        if level.is_empty() || level == "info" {
            DEFAULT_LOG_FILTER.into()
        } else {
            format!("secret_config_provider={level},secretcfg={level}").into()
        }
    })
}

/// Install the global tracing subscriber
///
/// Output is JSON when `LOG_FORMAT=json`, human-readable text otherwise.
pub fn init_tracing(settings: &ProviderSettings) -> anyhow::Result<()> {
    let filter = env_filter(settings);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if settings.log_format.eq_ignore_ascii_case("json") {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {e}"))
}
