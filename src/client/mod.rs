//! # Secret Store Clients
//!
//! The provider consumes a remote secret store through [`SecretStoreClient`].
//!
//! Implementations:
//! - [`aws::AwsSecretsManagerClient`] - AWS Secrets Manager via the official SDK
//! - [`memory::InMemorySecretStore`] - in-process store for tests and local runs
//!
//! Timeouts and retries of individual calls belong to the implementation; the
//! provider only decides what a failure means for the load cycle.

use crate::error::StoreError;
use crate::secret::{ListFilter, SecretPage, SecretValueRequest, SecretValueResponse};
use async_trait::async_trait;

pub mod aws;
pub mod memory;

pub use aws::{AwsAuthConfig, AwsConfig, AwsSecretsManagerClient};
pub use memory::InMemorySecretStore;

/// Capability to enumerate secrets and read their current values
#[async_trait]
pub trait SecretStoreClient: Send + Sync {
    /// List one page of secrets
    ///
    /// `next_token` is `None` for the first page. The returned page carries the
    /// token for the following page, or `None` when enumeration is complete.
    async fn list_secrets(
        &self,
        next_token: Option<&str>,
        filters: &[ListFilter],
    ) -> Result<SecretPage, StoreError>;

    /// Fetch the current value of a secret
    ///
    /// Fails with [`StoreError::NotFound`] when the secret no longer exists.
    async fn get_secret_value(
        &self,
        request: &SecretValueRequest,
    ) -> Result<SecretValueResponse, StoreError>;
}
