//! # AWS Secrets Manager Client
//!
//! [`SecretStoreClient`] backed by the official AWS SDK.
//!
//! This module provides functionality to:
//! - List secrets page by page, passing server-side filters through
//! - Retrieve secret values, optionally pinned to a version id or stage
//! - Authenticate with static access keys or the default credential chain

use super::SecretStoreClient;
use crate::error::StoreError;
use crate::secret::{ListFilter, SecretPage, SecretRecord, SecretValueRequest, SecretValueResponse};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::types::{Filter, FilterNameStringType};
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::{debug, info, Instrument};

/// AWS connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsConfig {
    pub region: String,
    /// Override the service endpoint (LocalStack and similar)
    pub endpoint_url: Option<String>,
    pub auth: Option<AwsAuthConfig>,
}

impl AwsConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint_url: None,
            auth: None,
        }
    }
}

/// AWS authentication configuration
#[derive(Clone, PartialEq, Eq)]
pub enum AwsAuthConfig {
    /// Static access keys
    AccessKeys {
        access_key_id: String,
        secret_access_key: String,
    },
    /// Default credential chain (env, profile, IRSA, instance metadata)
    DefaultChain,
}

impl std::fmt::Debug for AwsAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AwsAuthConfig::AccessKeys { access_key_id, .. } => f
                .debug_struct("AccessKeys")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"***")
                .finish(),
            AwsAuthConfig::DefaultChain => f.write_str("DefaultChain"),
        }
    }
}

/// AWS Secrets Manager client
pub struct AwsSecretsManagerClient {
    client: SecretsManagerClient,
    region: String,
}

impl std::fmt::Debug for AwsSecretsManagerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretsManagerClient")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl AwsSecretsManagerClient {
    /// Create a client from connection settings
    pub async fn new(config: &AwsConfig) -> Self {
        let sdk_config = Self::create_sdk_config(config).await;
        Self {
            client: SecretsManagerClient::new(&sdk_config),
            region: config.region.clone(),
        }
    }

    /// Wrap an SDK client that the caller configured
    #[must_use]
    pub fn from_client(client: SecretsManagerClient, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    async fn create_sdk_config(config: &AwsConfig) -> SdkConfig {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        match &config.auth {
            Some(AwsAuthConfig::AccessKeys {
                access_key_id,
                secret_access_key,
            }) => {
                info!(region = %config.region, "Using static AWS access keys");
                loader = loader.credentials_provider(aws_credential_types::Credentials::new(
                    access_key_id,
                    secret_access_key,
                    None,
                    None,
                    "secret-config-provider",
                ));
            }
            Some(AwsAuthConfig::DefaultChain) | None => {
                info!(region = %config.region, "Using default AWS credential chain");
            }
        }

        if let Some(endpoint_url) = &config.endpoint_url {
            info!(endpoint = %endpoint_url, "Using custom Secrets Manager endpoint");
            loader = loader.endpoint_url(endpoint_url);
        }

        loader.load().await
    }
}

fn to_chrono(date: &aws_sdk_secretsmanager::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(date.secs(), date.subsec_nanos())
}

fn to_sdk_filter(filter: &ListFilter) -> Filter {
    Filter::builder()
        .key(FilterNameStringType::from(filter.key.as_str()))
        .set_values(Some(filter.values.clone()))
        .build()
}

#[async_trait]
impl SecretStoreClient for AwsSecretsManagerClient {
    async fn list_secrets(
        &self,
        next_token: Option<&str>,
        filters: &[ListFilter],
    ) -> Result<SecretPage, StoreError> {
        let span = tracing::debug_span!("aws.secrets.list", region = %self.region);
        let start = Instant::now();

        async move {
            let sdk_filters: Vec<Filter> = filters.iter().map(to_sdk_filter).collect();
            let response = self
                .client
                .list_secrets()
                .set_next_token(next_token.map(ToString::to_string))
                .set_filters((!sdk_filters.is_empty()).then_some(sdk_filters))
                .send()
                .await
                .map_err(|e| {
                    StoreError::Service(anyhow::anyhow!(
                        "Failed to list AWS secrets: {}",
                        DisplayErrorContext(&e)
                    ))
                })?;

            let secrets: Vec<SecretRecord> = response
                .secret_list()
                .iter()
                .filter_map(|entry| {
                    let name = entry.name()?;
                    let arn = entry.arn().unwrap_or(name);
                    let mut record = SecretRecord::new(name, arn);
                    if let Some(stages) = entry.secret_versions_to_stages() {
                        record
                            .version_stages
                            .extend(stages.iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                    record.created_at = entry.created_date().and_then(to_chrono);
                    Some(record)
                })
                .collect();

            debug!(
                count = secrets.len(),
                duration_ms = start.elapsed().as_millis(),
                has_more = response.next_token().is_some(),
                "Listed AWS secrets page"
            );

            Ok(SecretPage {
                secrets,
                next_token: response
                    .next_token()
                    .filter(|token| !token.is_empty())
                    .map(ToString::to_string),
            })
        }
        .instrument(span)
        .await
    }

    async fn get_secret_value(
        &self,
        request: &SecretValueRequest,
    ) -> Result<SecretValueResponse, StoreError> {
        let span = tracing::debug_span!(
            "aws.secret.get",
            secret.id = %request.secret_id,
            region = %self.region
        );
        let start = Instant::now();

        async move {
            let response = self
                .client
                .get_secret_value()
                .secret_id(&request.secret_id)
                .set_version_id(request.version_id.clone())
                .set_version_stage(request.version_stage.clone())
                .send()
                .await
                .map_err(|e| {
                    let not_found = e
                        .as_service_error()
                        .is_some_and(|service| service.is_resource_not_found_exception());
                    if not_found {
                        StoreError::NotFound {
                            secret_id: request.secret_id.clone(),
                        }
                    } else {
                        StoreError::Service(anyhow::anyhow!(
                            "Failed to get AWS secret {}: {}",
                            request.secret_id,
                            DisplayErrorContext(&e)
                        ))
                    }
                })?;

            debug!(
                has_string = response.secret_string().is_some(),
                duration_ms = start.elapsed().as_millis(),
                "Fetched AWS secret value"
            );

            Ok(SecretValueResponse {
                name: response.name().map(ToString::to_string),
                arn: response.arn().map(ToString::to_string),
                secret_string: response.secret_string().map(ToString::to_string),
                created_at: response.created_date().and_then(to_chrono),
            })
        }
        .instrument(span)
        .await
    }
}
