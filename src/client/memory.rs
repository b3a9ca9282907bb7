//! # In-Memory Secret Store
//!
//! Ephemeral [`SecretStoreClient`] holding versioned secrets in process memory.
//!
//! Behaves like Secrets Manager where the provider can observe it:
//! - listing is paginated (configurable page size) and ordered by name
//! - the `name` list filter matches name prefixes
//! - every put creates a version staged `AWSCURRENT`; the previous current
//!   version becomes `AWSPREVIOUS`
//! - fetching a deleted secret fails with [`StoreError::NotFound`]
//!
//! Used by the test suite and by `secretcfg` runs without AWS access.

use super::SecretStoreClient;
use crate::error::StoreError;
use crate::secret::{ListFilter, SecretPage, SecretRecord, SecretValueRequest, SecretValueResponse};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const STAGE_CURRENT: &str = "AWSCURRENT";
const STAGE_PREVIOUS: &str = "AWSPREVIOUS";
const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
struct StoredVersion {
    version_id: String,
    secret_string: Option<String>,
    stages: Vec<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredSecret {
    arn: String,
    created_at: DateTime<Utc>,
    versions: Vec<StoredVersion>,
}

impl StoredSecret {
    fn record(&self, name: &str) -> SecretRecord {
        let mut record = SecretRecord::new(name, self.arn.clone()).with_created_at(self.created_at);
        for version in &self.versions {
            if !version.stages.is_empty() {
                record
                    .version_stages
                    .insert(version.version_id.clone(), version.stages.clone());
            }
        }
        record
    }

    fn resolve(&self, request: &SecretValueRequest) -> Option<&StoredVersion> {
        let stage = request.version_stage.as_deref().unwrap_or(STAGE_CURRENT);
        self.versions.iter().find(|version| {
            let id_matches = request
                .version_id
                .as_deref()
                .is_none_or(|id| version.version_id == id);
            let stage_matches = (request.version_id.is_some() && request.version_stage.is_none())
                || version.stages.iter().any(|s| s == stage);
            id_matches && stage_matches
        })
    }
}

#[derive(Debug, Default)]
struct Counters {
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    next_id: AtomicUsize,
}

/// In-memory secret store
///
/// Cloning is cheap and clones share the same secrets, so a test can keep a
/// handle for mutation while the provider owns another.
#[derive(Debug, Clone)]
pub struct InMemorySecretStore {
    secrets: Arc<RwLock<BTreeMap<String, StoredSecret>>>,
    counters: Arc<Counters>,
    unavailable: Arc<AtomicBool>,
    page_size: usize,
    region: String,
    latency: Option<Duration>,
}

impl Default for InMemorySecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            secrets: Arc::new(RwLock::new(BTreeMap::new())),
            counters: Arc::new(Counters::default()),
            unavailable: Arc::new(AtomicBool::new(false)),
            page_size: DEFAULT_PAGE_SIZE,
            region: crate::constants::DEFAULT_REGION.to_string(),
            latency: None,
        }
    }

    /// Limit the number of secrets returned per list page
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Delay every call by `latency`
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Store a new current string value, creating the secret if needed
    ///
    /// Returns the secret's ARN.
    pub async fn put_secret(&self, name: &str, value: impl Into<String>) -> String {
        self.put_version(name, Some(value.into())).await
    }

    /// Store a new current version that has no string payload
    pub async fn put_binary_secret(&self, name: &str) -> String {
        self.put_version(name, None).await
    }

    /// Remove a secret and all of its versions
    ///
    /// Returns `true` if the secret existed.
    pub async fn delete_secret(&self, name: &str) -> bool {
        self.secrets.write().await.remove(name).is_some()
    }

    /// Make every call fail with a service error until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.counters.list_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn get_calls(&self) -> usize {
        self.counters.get_calls.load(Ordering::SeqCst)
    }

    /// ARN of a stored secret
    pub async fn arn_of(&self, name: &str) -> Option<String> {
        self.secrets.read().await.get(name).map(|s| s.arn.clone())
    }

    async fn put_version(&self, name: &str, secret_string: Option<String>) -> String {
        let id = self.counters.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        let mut secrets = self.secrets.write().await;
        let secret = secrets.entry(name.to_string()).or_insert_with(|| StoredSecret {
            arn: format!(
                "arn:aws:secretsmanager:{}:000000000000:secret:{name}-{id:06X}",
                self.region
            ),
            created_at: now,
            versions: Vec::new(),
        });

        for version in &mut secret.versions {
            version
                .stages
                .retain(|stage| stage != STAGE_PREVIOUS && stage != STAGE_CURRENT);
        }
        if let Some(previous) = secret.versions.last_mut() {
            previous.stages.push(STAGE_PREVIOUS.to_string());
        }
        secret.versions.push(StoredVersion {
            version_id: format!("{id:08x}-0000-4000-8000-000000000000"),
            secret_string,
            stages: vec![STAGE_CURRENT.to_string()],
            created_at: now,
        });
        secret.arn.clone()
    }

    async fn simulate_call(&self) -> Result<(), StoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Service(anyhow::anyhow!(
                "in-memory secret store is unavailable"
            )));
        }
        Ok(())
    }
}

fn matches_filters(name: &str, filters: &[ListFilter]) -> Result<bool, StoreError> {
    for filter in filters {
        match filter.key.as_str() {
            "name" => {
                if !filter.values.iter().any(|prefix| name.starts_with(prefix.as_str())) {
                    return Ok(false);
                }
            }
            other => {
                return Err(StoreError::Service(anyhow::anyhow!(
                    "unsupported list filter key: {other}"
                )));
            }
        }
    }
    Ok(true)
}

#[async_trait]
impl SecretStoreClient for InMemorySecretStore {
    async fn list_secrets(
        &self,
        next_token: Option<&str>,
        filters: &[ListFilter],
    ) -> Result<SecretPage, StoreError> {
        self.counters.list_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_call().await?;

        let offset = match next_token {
            Some(token) => token.parse::<usize>().map_err(|_| {
                StoreError::Service(anyhow::anyhow!("invalid pagination token: {token}"))
            })?,
            None => 0,
        };

        let secrets = self.secrets.read().await;
        let mut matching = Vec::new();
        for (name, secret) in secrets.iter() {
            if matches_filters(name, filters)? {
                matching.push(secret.record(name));
            }
        }

        let end = (offset + self.page_size).min(matching.len());
        let page: Vec<SecretRecord> = matching
            .get(offset..end)
            .map(<[SecretRecord]>::to_vec)
            .unwrap_or_default();
        let next_token = (end < matching.len()).then(|| end.to_string());

        Ok(SecretPage {
            secrets: page,
            next_token,
        })
    }

    async fn get_secret_value(
        &self,
        request: &SecretValueRequest,
    ) -> Result<SecretValueResponse, StoreError> {
        self.counters.get_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_call().await?;

        let not_found = || StoreError::NotFound {
            secret_id: request.secret_id.clone(),
        };

        let secrets = self.secrets.read().await;
        let (name, secret) = secrets
            .iter()
            .find(|(name, secret)| *name == &request.secret_id || secret.arn == request.secret_id)
            .ok_or_else(not_found)?;
        let version = secret.resolve(request).ok_or_else(not_found)?;

        Ok(SecretValueResponse {
            name: Some(name.clone()),
            arn: Some(secret.arn.clone()),
            secret_string: version.secret_string.clone(),
            created_at: Some(version.created_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_paginates_in_name_order() {
        let store = InMemorySecretStore::new().with_page_size(2);
        for name in ["c", "a", "e", "b", "d"] {
            store.put_secret(name, "v").await;
        }

        let first = store.list_secrets(None, &[]).await.unwrap();
        let names: Vec<_> = first.secrets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let second = store
            .list_secrets(first.next_token.as_deref(), &[])
            .await
            .unwrap();
        let third = store
            .list_secrets(second.next_token.as_deref(), &[])
            .await
            .unwrap();
        assert_eq!(third.secrets.len(), 1);
        assert!(third.next_token.is_none());
        assert_eq!(store.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_name_filter_matches_prefix() {
        let store = InMemorySecretStore::new();
        store.put_secret("prod/api/db", "v").await;
        store.put_secret("dev/api/db", "v").await;

        let page = store
            .list_secrets(None, &[ListFilter::new("name", ["prod/"])])
            .await
            .unwrap();
        assert_eq!(page.secrets.len(), 1);
        assert_eq!(page.secrets[0].name, "prod/api/db");
    }

    #[tokio::test]
    async fn test_versions_rotate_stages() {
        let store = InMemorySecretStore::new();
        store.put_secret("db", "v1").await;
        store.put_secret("db", "v2").await;

        let current = store
            .get_secret_value(&SecretValueRequest::new("db"))
            .await
            .unwrap();
        assert_eq!(current.secret_string.as_deref(), Some("v2"));

        let mut previous_request = SecretValueRequest::new("db");
        previous_request.version_stage = Some(STAGE_PREVIOUS.to_string());
        let previous = store.get_secret_value(&previous_request).await.unwrap();
        assert_eq!(previous.secret_string.as_deref(), Some("v1"));

        let page = store.list_secrets(None, &[]).await.unwrap();
        assert_eq!(page.secrets[0].version_stages.len(), 2);
    }

    #[tokio::test]
    async fn test_get_by_arn_and_deleted_secret() {
        let store = InMemorySecretStore::new();
        let arn = store.put_secret("db", "v1").await;

        let by_arn = store
            .get_secret_value(&SecretValueRequest::new(arn.clone()))
            .await
            .unwrap();
        assert_eq!(by_arn.name.as_deref(), Some("db"));

        assert!(store.delete_secret("db").await);
        let err = store
            .get_secret_value(&SecretValueRequest::new(arn))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_calls() {
        let store = InMemorySecretStore::new();
        store.set_unavailable(true);
        let err = store.list_secrets(None, &[]).await.unwrap_err();
        assert!(!err.is_not_found());
    }
}
