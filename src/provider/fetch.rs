//! # Secret Loading
//!
//! One pass over the secret store: enumerate, filter, fetch, extract.
//!
//! The pass is all-or-nothing. Any error stops it and nothing it gathered is
//! published.

use crate::client::SecretStoreClient;
use crate::error::ConfigurationError;
use crate::extract::Payload;
use crate::observability::metrics;
use crate::options::ProviderOptions;
use crate::secret::{FetchedSecret, SecretRecord, SecretValueContext, SecretValueRequest};
use crate::snapshot::{ConfigurationEntry, Snapshot};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, warn, Instrument};

/// Output of a successful pass
#[derive(Debug, Default)]
pub(crate) struct LoadedConfiguration {
    pub(crate) snapshot: Snapshot,
    /// Raw JSON documents, in fetch order, for the settings file
    pub(crate) documents: Vec<String>,
    pub(crate) secrets_fetched: usize,
}

pub(crate) struct SecretLoader<'a> {
    client: &'a dyn SecretStoreClient,
    options: &'a ProviderOptions,
}

impl<'a> SecretLoader<'a> {
    pub(crate) fn new(client: &'a dyn SecretStoreClient, options: &'a ProviderOptions) -> Self {
        Self { client, options }
    }

    pub(crate) async fn load(&self) -> Result<LoadedConfiguration, ConfigurationError> {
        let start = Instant::now();
        let records = self.enumerate().await?;
        let mut loaded = LoadedConfiguration::default();

        for record in &records {
            if !(self.options.secret_filter)(record) {
                debug!(secret.name = %record.name, "Secret rejected by filter");
                continue;
            }

            let fetched = self.fetch(record).await?;
            loaded.secrets_fetched += 1;

            let Some(raw) = fetched.raw_value.as_deref().filter(|raw| !raw.is_empty()) else {
                debug!(secret.name = %fetched.record.name, "Secret has no string value, skipping");
                continue;
            };

            let payload = Payload::classify(raw);
            if payload.is_document() {
                loaded.documents.push(raw.to_string());
            }
            for entry in payload.entries(&fetched.record.name) {
                let key = (self.options.key_generator)(&fetched.record, &entry.key);
                loaded.snapshot.insert(ConfigurationEntry::new(key, entry.value));
            }
        }

        debug!(
            secrets = records.len(),
            fetched = loaded.secrets_fetched,
            entries = loaded.snapshot.len(),
            duration_ms = start.elapsed().as_millis(),
            "Loaded secrets"
        );
        Ok(loaded)
    }

    /// Secrets to consider, in store order
    async fn enumerate(&self) -> Result<Vec<SecretRecord>, ConfigurationError> {
        if !self.options.accepted_secret_arns.is_empty() {
            return Ok(self
                .options
                .accepted_secret_arns
                .iter()
                .map(SecretRecord::from_arn)
                .collect());
        }

        let mut records = Vec::new();
        let mut seen_tokens = HashSet::new();
        let mut next_token: Option<String> = None;
        loop {
            let page = self
                .client
                .list_secrets(next_token.as_deref(), &self.options.list_filters)
                .await
                .map_err(ConfigurationError::ListSecrets)?;
            records.extend(page.secrets);

            // An empty token marks the last page, same as none
            let Some(token) = page.next_token.filter(|t| !t.is_empty()) else {
                break;
            };
            if !seen_tokens.insert(token.clone()) {
                warn!(token = %token, "Secret store repeated a pagination token, stopping");
                break;
            }
            next_token = Some(token);
        }
        Ok(records)
    }

    async fn fetch(&self, record: &SecretRecord) -> Result<FetchedSecret, ConfigurationError> {
        let mut request = SecretValueRequest::new(record.arn.clone());
        (self.options.configure_secret_value_request)(
            &mut request,
            &SecretValueContext::from(record),
        );

        let span = tracing::debug_span!("secret.fetch", secret.name = %record.name);
        let response = self
            .client
            .get_secret_value(&request)
            .instrument(span)
            .await
            .map_err(|source| {
                if source.is_not_found() {
                    ConfigurationError::MissingSecretValue {
                        name: record.name.clone(),
                        arn: record.arn.clone(),
                        source,
                    }
                } else {
                    ConfigurationError::Store {
                        name: record.name.clone(),
                        source,
                    }
                }
            })?;
        metrics::increment_secrets_fetched();

        // Accept-list records only carry the ARN until the store names them
        let record = if self.options.accepted_secret_arns.is_empty() {
            record.clone()
        } else {
            let mut refreshed = record.clone();
            if let Some(name) = response.name.clone().filter(|name| !name.is_empty()) {
                refreshed.name = name;
            }
            refreshed.created_at = response.created_at.or(record.created_at);
            refreshed
        };

        Ok(FetchedSecret {
            record,
            raw_value: response.secret_string,
            created_at: response.created_at,
        })
    }
}
