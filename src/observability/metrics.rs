//! # Metrics
//!
//! Prometheus metrics for monitoring the configuration provider.
//!
//! ## Metrics Exposed
//!
//! - `secret_config_loads_total{kind}` - Load cycles started (`initial`, `reload`)
//! - `secret_config_load_errors_total{kind}` - Load cycles that failed
//! - `secret_config_load_duration_seconds` - Duration of load cycles
//! - `secret_config_snapshot_changes_total` - Snapshots published after a change
//! - `secret_config_secrets_fetched_total` - Secret values fetched from the store
//! - `secret_config_entries` - Entries in the active snapshot

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static LOADS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("secret_config_loads_total", "Total number of load cycles"),
        &["kind"],
    )
    .expect("Failed to create LOADS_TOTAL metric - this should never happen")
});

static LOAD_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "secret_config_load_errors_total",
            "Total number of failed load cycles",
        ),
        &["kind"],
    )
    .expect("Failed to create LOAD_ERRORS_TOTAL metric - this should never happen")
});

static LOAD_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "secret_config_load_duration_seconds",
            "Duration of load cycles in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
    )
    .expect("Failed to create LOAD_DURATION metric - this should never happen")
});

static SNAPSHOT_CHANGES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_config_snapshot_changes_total",
        "Total number of snapshots published after a change",
    )
    .expect("Failed to create SNAPSHOT_CHANGES_TOTAL metric - this should never happen")
});

static SECRETS_FETCHED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_config_secrets_fetched_total",
        "Total number of secret values fetched",
    )
    .expect("Failed to create SECRETS_FETCHED_TOTAL metric - this should never happen")
});

static CONFIGURATION_ENTRIES: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "secret_config_entries",
        "Number of entries in the active snapshot",
    )
    .expect("Failed to create CONFIGURATION_ENTRIES metric - this should never happen")
});

/// Register all metrics with the shared registry
///
/// Call once at startup. Metrics record values whether or not they are
/// registered; registration only makes them visible on `/metrics`.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(LOADS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(LOAD_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(LOAD_DURATION.clone()))?;
    REGISTRY.register(Box::new(SNAPSHOT_CHANGES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRETS_FETCHED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CONFIGURATION_ENTRIES.clone()))?;

    Ok(())
}

/// Gather all registered metric families
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

pub fn increment_loads(kind: &str) {
    LOADS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_load_errors(kind: &str) {
    LOAD_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_load_duration(duration: f64) {
    LOAD_DURATION.observe(duration);
}

pub fn increment_snapshot_changes() {
    SNAPSHOT_CHANGES_TOTAL.inc();
}

pub fn increment_secrets_fetched() {
    SECRETS_FETCHED_TOTAL.inc();
}

pub fn set_configuration_entries(count: usize) {
    CONFIGURATION_ENTRIES.set(i64::try_from(count).unwrap_or(i64::MAX));
}
