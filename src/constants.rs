//! # Constants
//!
//! Shared constants used throughout the provider.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Delimiter between hierarchical configuration key segments
///
/// Array elements use their zero-based index as a segment, so `db:hosts:0`
/// addresses the first element of the `hosts` array under `db`.
pub const KEY_DELIMITER: &str = ":";

/// Default file name for the materialised settings file
pub const DEFAULT_SETTINGS_FILE_NAME: &str = "appsettings.json";

/// Default AWS region when none is configured
pub const DEFAULT_REGION: &str = "us-west-1";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "secret_config_provider=info,secretcfg=info";

/// Polling interval of `0` seconds disables polling
pub const POLLING_DISABLED_SECS: u64 = 0;

/// Default log output format (`text` or `json`)
pub const DEFAULT_LOG_FORMAT: &str = "text";
