//! Secret Config Provider Library
//!
//! Loads secrets from AWS Secrets Manager (or any [`client::SecretStoreClient`])
//! into a flat, case-insensitive key/value configuration and keeps it current
//! by polling. JSON secrets are flattened into `secret:path:to:leaf` keys;
//! anything else is used verbatim under the secret name.
//!
//! ## Quick Start
//!
//! ```rust
//! use secret_config_provider::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod observability;
pub mod options;
pub mod prelude;
pub mod provider;
pub mod secret;
pub mod server;
pub mod settings_file;
pub mod snapshot;
pub mod source;
