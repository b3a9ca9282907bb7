//! # Provider Load Tests
//!
//! End-to-end load and reload behaviour against the in-memory store.
//!
//! These tests verify:
//! - Flattening of JSON secrets and verbatim scalar secrets
//! - Idempotent reloads and set-based change detection
//! - Missing-secret failures keep the previous configuration
//! - Filters, list filters, pagination and the accept-list
//! - Conflicting keys and case-insensitive lookups

mod common;

use common::{count_changes, provider_for, PhantomListing, ScriptedListing};
use secret_config_provider::prelude::*;
use secret_config_provider::secret::SecretPage;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn test_initial_load_flattens_json_and_keeps_scalars() {
    let store = InMemorySecretStore::new();
    store
        .put_secret(
            "prod/api",
            r#"{"Database": {"Host": "db.internal", "Port": 5432, "Replicas": ["r1", "r2"]}, "Debug": false, "Optional": null}"#,
        )
        .await;
    store.put_secret("prod/token", "abc123").await;

    let provider = provider_for(&store, ProviderOptions::new());
    provider.load().await.unwrap();
    let data = provider.data();

    assert_eq!(data.get("prod/api:Database:Host"), Some("db.internal"));
    assert_eq!(data.get("prod/api:Database:Port"), Some("5432"));
    assert_eq!(data.get("prod/api:Database:Replicas:0"), Some("r1"));
    assert_eq!(data.get("prod/api:Database:Replicas:1"), Some("r2"));
    assert_eq!(data.get("prod/api:Debug"), Some("false"));
    assert_eq!(data.get("prod/api:Optional"), Some(""));
    assert_eq!(data.get("prod/token"), Some("abc123"));
    assert_eq!(data.len(), 7);
    assert_eq!(provider.status(), ProviderStatus::Steady);
}

#[tokio::test]
async fn test_lookups_ignore_case() {
    let store = InMemorySecretStore::new();
    store.put_secret("App", r#"{"ConnectionString": "Server=x"}"#).await;

    let provider = provider_for(&store, ProviderOptions::new());
    provider.load().await.unwrap();

    assert_eq!(provider.get("app:connectionstring").as_deref(), Some("Server=x"));
    assert_eq!(provider.get("APP:CONNECTIONSTRING").as_deref(), Some("Server=x"));
    assert_eq!(
        provider.data().section("app").get("ConnectionString"),
        Some("Server=x")
    );
}

#[tokio::test]
async fn test_unchanged_reload_does_not_notify() {
    let store = InMemorySecretStore::new();
    store.put_secret("a", r#"{"x": 1, "y": [true, "z"]}"#).await;
    store.put_secret("b", "plain").await;

    let provider = provider_for(&store, ProviderOptions::new());
    let changes = count_changes(&provider);
    provider.load().await.unwrap();
    let first = provider.snapshot();

    for _ in 0..3 {
        let changed = provider.force_reload(CancellationToken::new()).await.unwrap();
        assert!(!changed);
    }

    assert_eq!(*provider.snapshot(), *first);
    assert_eq!(changes.load(Ordering::SeqCst), 0);
    assert_eq!(provider.generation(), 0);
}

#[tokio::test]
async fn test_single_value_change_notifies_once() {
    let store = InMemorySecretStore::new();
    store.put_secret("svc", r#"{"Timeout": 30, "Retries": 3}"#).await;

    let provider = provider_for(&store, ProviderOptions::new());
    let changes = count_changes(&provider);
    let mut generations = provider.subscribe();
    provider.load().await.unwrap();

    store.put_secret("svc", r#"{"Timeout": 45, "Retries": 3}"#).await;
    assert!(provider.force_reload(CancellationToken::new()).await.unwrap());
    assert!(!provider.force_reload(CancellationToken::new()).await.unwrap());

    assert_eq!(provider.get("svc:Timeout").as_deref(), Some("45"));
    assert_eq!(provider.get("svc:Retries").as_deref(), Some("3"));
    assert_eq!(changes.load(Ordering::SeqCst), 1);
    assert!(generations.has_changed().unwrap());
    assert_eq!(*generations.borrow_and_update(), 1);
}

#[tokio::test]
async fn test_listener_sees_new_data() {
    let store = InMemorySecretStore::new();
    store.put_secret("flag", "off").await;

    let provider = provider_for(&store, ProviderOptions::new());
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    provider.on_change(move |data| {
        sink.lock()
            .unwrap()
            .push(data.get("flag").map(ToString::to_string));
    });
    provider.load().await.unwrap();

    store.put_secret("flag", "on").await;
    provider.force_reload(CancellationToken::new()).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![Some("on".to_string())]);
}

#[tokio::test]
async fn test_missing_secret_fails_reload_and_keeps_previous_snapshot() {
    let store = InMemorySecretStore::new();
    store.put_secret("kept", r#"{"k": "v1"}"#).await;
    let phantom = SecretRecord::new(
        "deleted",
        "arn:aws:secretsmanager:us-west-1:000000000000:secret:deleted-AbCdEf",
    );
    let client = PhantomListing::new(store.clone(), phantom);

    let provider =
        ConfigurationProvider::new(Arc::new(client.clone()), ProviderOptions::new()).unwrap();
    let changes = count_changes(&provider);
    client.clear();
    provider.load().await.unwrap();
    let before = provider.snapshot();

    *client.phantom.lock().unwrap() = Some(SecretRecord::new(
        "deleted",
        "arn:aws:secretsmanager:us-west-1:000000000000:secret:deleted-AbCdEf",
    ));
    store.put_secret("kept", r#"{"k": "v2"}"#).await;
    let err = provider
        .force_reload(CancellationToken::new())
        .await
        .unwrap_err();

    match &err {
        ConfigurationError::MissingSecretValue { name, arn, .. } => {
            assert_eq!(name, "deleted");
            assert!(arn.ends_with("secret:deleted-AbCdEf"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("deleted"));
    assert_eq!(*provider.snapshot(), *before);
    assert_eq!(provider.get("kept:k").as_deref(), Some("v1"));
    assert_eq!(changes.load(Ordering::SeqCst), 0);

    let failure = provider.last_error().unwrap();
    assert_eq!(failure.secret_name.as_deref(), Some("deleted"));

    client.clear();
    assert!(provider.force_reload(CancellationToken::new()).await.unwrap());
    assert_eq!(provider.get("kept:k").as_deref(), Some("v2"));
    assert!(provider.last_error().is_none());
}

#[tokio::test]
async fn test_missing_secret_fails_initial_load() {
    let store = InMemorySecretStore::new();
    let client = PhantomListing::new(store, SecretRecord::new("gone", "arn:gone"));
    let provider = ConfigurationProvider::new(Arc::new(client), ProviderOptions::new()).unwrap();

    let err = provider.load().await.unwrap_err();

    assert!(matches!(err, ConfigurationError::MissingSecretValue { .. }));
    assert_eq!(provider.status(), ProviderStatus::Uninitialized);
    assert!(provider.data().is_empty());
}

#[tokio::test]
async fn test_reject_all_filter_yields_empty_configuration() {
    let store = InMemorySecretStore::new();
    store.put_secret("a", "1").await;
    store.put_secret("b", r#"{"c": 2}"#).await;

    let provider = provider_for(&store, ProviderOptions::new().with_secret_filter(|_| false));
    provider.load().await.unwrap();

    assert!(provider.snapshot().is_empty());
    assert!(provider.data().is_empty());
    assert_eq!(store.get_calls(), 0);
    assert_eq!(provider.status(), ProviderStatus::Steady);
}

#[tokio::test]
async fn test_pagination_collects_every_page() {
    let store = InMemorySecretStore::new().with_page_size(2);
    for i in 0..5 {
        store.put_secret(&format!("s{i}"), format!("v{i}")).await;
    }

    let provider = provider_for(&store, ProviderOptions::new());
    provider.load().await.unwrap();

    assert_eq!(store.list_calls(), 3);
    assert_eq!(provider.data().len(), 5);
    assert_eq!(provider.get("s4").as_deref(), Some("v4"));
}

#[tokio::test]
async fn test_empty_continuation_token_ends_listing() {
    let store = InMemorySecretStore::new();
    let arn = store.put_secret("only", "v").await;
    let client = ScriptedListing::new(
        store,
        [(
            None,
            SecretPage {
                secrets: vec![SecretRecord::new("only", arn)],
                next_token: Some(String::new()),
            },
        )],
    );

    let provider = ConfigurationProvider::new(Arc::new(client.clone()), ProviderOptions::new()).unwrap();
    provider.load().await.unwrap();

    assert_eq!(client.list_calls(), 1);
    assert_eq!(provider.get("only").as_deref(), Some("v"));
}

#[tokio::test]
async fn test_cycling_continuation_tokens_stop_listing() {
    let store = InMemorySecretStore::new();
    let a = store.put_secret("a", "1").await;
    let b = store.put_secret("b", "2").await;
    let c = store.put_secret("c", "3").await;
    let page = |name: &str, arn: &str, next: &str| SecretPage {
        secrets: vec![SecretRecord::new(name, arn)],
        next_token: Some(next.to_string()),
    };
    let client = ScriptedListing::new(
        store,
        [
            (None, page("a", a.as_str(), "A")),
            (Some("A"), page("b", b.as_str(), "B")),
            (Some("B"), page("c", c.as_str(), "A")),
        ],
    );

    let provider = ConfigurationProvider::new(Arc::new(client.clone()), ProviderOptions::new()).unwrap();
    provider.load().await.unwrap();

    assert_eq!(client.list_calls(), 3);
    assert_eq!(provider.data().len(), 3);
    assert_eq!(provider.get("c").as_deref(), Some("3"));
}

#[tokio::test]
async fn test_accept_list_skips_listing() {
    let store = InMemorySecretStore::new();
    let wanted = store.put_secret("prod/api", r#"{"Url": "https://api"}"#).await;
    store.put_secret("prod/other", "ignored").await;

    let provider = provider_for(
        &store,
        ProviderOptions::new().with_accepted_secret_arns([wanted]),
    );
    provider.load().await.unwrap();

    assert_eq!(store.list_calls(), 0);
    assert_eq!(provider.data().len(), 1);
    assert_eq!(provider.get("prod/api:Url").as_deref(), Some("https://api"));
}

#[tokio::test]
async fn test_name_prefix_policy() {
    let store = InMemorySecretStore::new();
    store
        .put_secret(
            "Production/Api/ExaiConfiguration",
            r#"{"AWS": {"Region": "us-west-1"}}"#,
        )
        .await;
    store
        .put_secret("Staging/Api/ExaiConfiguration", r#"{"AWS": {"Region": "eu-west-1"}}"#)
        .await;

    let provider = provider_for(
        &store,
        ProviderOptions::new().with_name_prefix("Production/Api/"),
    );
    provider.load().await.unwrap();

    let section = provider.data().section("ExaiConfiguration");
    assert_eq!(section.get("AWS:Region"), Some("us-west-1"));
    assert_eq!(provider.data().len(), 1);
}

#[tokio::test]
async fn test_conflicting_keys_last_writer_wins() {
    let store = InMemorySecretStore::new();
    store.put_secret("a-first", r#"{"Shared": "from-a"}"#).await;
    store.put_secret("b-second", r#"{"shared": "from-b"}"#).await;

    let provider = provider_for(
        &store,
        ProviderOptions::new().with_key_generator(|_, key| {
            key.split_once(':')
                .map_or_else(|| key.to_string(), |(_, rest)| rest.to_string())
        }),
    );
    provider.load().await.unwrap();

    assert_eq!(provider.snapshot().len(), 2);
    assert_eq!(provider.data().len(), 1);
    assert_eq!(provider.get("SHARED").as_deref(), Some("from-b"));
}

#[tokio::test]
async fn test_request_hook_pins_previous_version() {
    let store = InMemorySecretStore::new();
    store.put_secret("db", "old-password").await;
    store.put_secret("db", "new-password").await;

    let provider = provider_for(
        &store,
        ProviderOptions::new().with_secret_value_request(|request, context| {
            let has_previous = context
                .version_stages
                .values()
                .any(|stages| stages.iter().any(|s| s == "AWSPREVIOUS"));
            if has_previous {
                request.version_stage = Some("AWSPREVIOUS".to_string());
            }
        }),
    );
    provider.load().await.unwrap();

    assert_eq!(provider.get("db").as_deref(), Some("old-password"));
}

#[tokio::test]
async fn test_concurrent_reloads_publish_once() {
    let store = InMemorySecretStore::new().with_latency(std::time::Duration::from_millis(20));
    store.put_secret("cfg", r#"{"v": 1}"#).await;

    let provider = Arc::new(provider_for(&store, ProviderOptions::new()));
    let changes = count_changes(&provider);
    provider.load().await.unwrap();
    store.put_secret("cfg", r#"{"v": 2}"#).await;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.force_reload(CancellationToken::new()).await })
        })
        .collect();
    let mut published = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            published += 1;
        }
    }

    assert_eq!(published, 1);
    assert_eq!(changes.load(Ordering::SeqCst), 1);
    assert_eq!(provider.get("cfg:v").as_deref(), Some("2"));
}

#[tokio::test]
async fn test_store_outage_is_recorded_and_recovers() {
    let store = InMemorySecretStore::new();
    store.put_secret("cfg", "1").await;

    let provider = provider_for(&store, ProviderOptions::new());
    provider.load().await.unwrap();

    store.set_unavailable(true);
    let err = provider
        .force_reload(CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::ListSecrets(_)));
    assert!(provider.last_error().is_some_and(|f| f.transient));
    assert_eq!(provider.get("cfg").as_deref(), Some("1"));

    store.set_unavailable(false);
    assert!(!provider.force_reload(CancellationToken::new()).await.unwrap());
    assert!(provider.last_error().is_none());
}
