//! Common test utilities for provider integration tests
//!
//! Provides shared setup: tracing for failing tests, provider construction
//! over the in-memory store, and a store wrapper that lists secrets which
//! no longer exist.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use secret_config_provider::prelude::*;
use secret_config_provider::secret::{SecretPage, SecretValueResponse};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

static TRACING_INIT: Once = Once::new();

/// Install a test-friendly tracing subscriber once per test binary
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "secret_config_provider=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Provider over a clone of `store`
pub fn provider_for(store: &InMemorySecretStore, options: ProviderOptions) -> ConfigurationProvider {
    init_tracing();
    ConfigurationProvider::new(Arc::new(store.clone()), options).expect("valid options")
}

/// Count change notifications
pub fn count_changes(provider: &ConfigurationProvider) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    provider.on_change(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    count
}

/// Store wrapper whose listing includes one secret that cannot be fetched
///
/// Models a secret deleted between the list call and the value fetch.
#[derive(Debug, Clone)]
pub struct PhantomListing {
    pub store: InMemorySecretStore,
    pub phantom: Arc<std::sync::Mutex<Option<SecretRecord>>>,
}

impl PhantomListing {
    pub fn new(store: InMemorySecretStore, phantom: SecretRecord) -> Self {
        Self {
            store,
            phantom: Arc::new(std::sync::Mutex::new(Some(phantom))),
        }
    }

    /// Stop listing the phantom secret
    pub fn clear(&self) {
        *self.phantom.lock().expect("phantom lock") = None;
    }
}

#[async_trait]
impl SecretStoreClient for PhantomListing {
    async fn list_secrets(
        &self,
        next_token: Option<&str>,
        filters: &[ListFilter],
    ) -> Result<SecretPage, StoreError> {
        let mut page = self.store.list_secrets(next_token, filters).await?;
        if page.next_token.is_none() {
            if let Some(phantom) = self.phantom.lock().expect("phantom lock").clone() {
                page.secrets.push(phantom);
            }
        }
        Ok(page)
    }

    async fn get_secret_value(
        &self,
        request: &SecretValueRequest,
    ) -> Result<SecretValueResponse, StoreError> {
        self.store.get_secret_value(request).await
    }
}

/// Store wrapper that serves hand-written list pages keyed by request token
///
/// Tokens without a scripted page are rejected, as a real store rejects
/// tokens it never issued.
#[derive(Debug, Clone)]
pub struct ScriptedListing {
    pub store: InMemorySecretStore,
    pub pages: Arc<HashMap<Option<String>, SecretPage>>,
    pub list_calls: Arc<AtomicUsize>,
}

impl ScriptedListing {
    pub fn new(
        store: InMemorySecretStore,
        pages: impl IntoIterator<Item = (Option<&'static str>, SecretPage)>,
    ) -> Self {
        Self {
            store,
            pages: Arc::new(
                pages
                    .into_iter()
                    .map(|(token, page)| (token.map(str::to_string), page))
                    .collect(),
            ),
            list_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStoreClient for ScriptedListing {
    async fn list_secrets(
        &self,
        next_token: Option<&str>,
        _filters: &[ListFilter],
    ) -> Result<SecretPage, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(&next_token.map(str::to_string))
            .cloned()
            .ok_or_else(|| StoreError::Service(anyhow::anyhow!("invalid NextToken {next_token:?}")))
    }

    async fn get_secret_value(
        &self,
        request: &SecretValueRequest,
    ) -> Result<SecretValueResponse, StoreError> {
        self.store.get_secret_value(request).await
    }
}
