//! # secretcfg
//!
//! Command-line front end for the secret configuration provider.
//!
//! ## Usage
//!
//! ```bash
//! # Print every key the provider would expose (values redacted)
//! secretcfg dump
//!
//! # Same, scoped to the "Production/Api/" prefix, with values
//! secretcfg --prefix-environment Production --prefix-app Api dump --show-values
//!
//! # Keep polling every 30s, serve /metrics and probes on port 5000
//! secretcfg watch --interval 30 --metrics-port 5000
//!
//! # Run against a local JSON fixture instead of AWS
//! secretcfg --fixture secrets.json dump
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secret_config_provider::client::{InMemorySecretStore, SecretStoreClient};
use secret_config_provider::config::ProviderSettings;
use secret_config_provider::observability::{logging, metrics};
use secret_config_provider::provider::ConfigurationProvider;
use secret_config_provider::server::{start_server, ServerState};
use secret_config_provider::source::ConfigurationSource;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const REDACTED: &str = "********";

/// Secret-backed configuration provider CLI
#[derive(Parser)]
#[command(name = "secretcfg", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// AWS region
    #[arg(long, global = true, env = "AWS_REGION")]
    region: Option<String>,

    /// Secrets Manager endpoint override
    #[arg(long, global = true, env = "SECRETS_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Environment segment of the secret name prefix
    #[arg(long, global = true, env = "APP_ENVIRONMENT")]
    prefix_environment: Option<String>,

    /// Application segment of the secret name prefix
    #[arg(long, global = true, env = "APP_NAME")]
    prefix_app: Option<String>,

    /// Load secrets from a JSON file (`{"name": value, ...}`) instead of AWS
    #[arg(long, global = true, value_name = "PATH")]
    fixture: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load once and print the resulting configuration
    Dump {
        /// Print values instead of redacting them
        #[arg(long)]
        show_values: bool,
    },
    /// Load, then poll for changes until interrupted
    Watch {
        /// Polling interval in seconds
        #[arg(long, env = "SECRETS_POLLING_INTERVAL_SECS")]
        interval: Option<u64>,

        /// Port for /metrics, /healthz, /readyz and /config/keys
        #[arg(long, env = "METRICS_PORT")]
        metrics_port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = settings_for(&cli)?;

    logging::init_tracing(&settings)?;
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    let mut source = ConfigurationSource::from_settings(&settings);
    if let Some(path) = &cli.fixture {
        let store = load_fixture(path).await?;
        source = source.with_client_factory(move || -> Arc<dyn SecretStoreClient> {
            Arc::new(store.clone())
        });
    }

    match cli.command {
        Commands::Dump { show_values } => dump(&source, show_values).await,
        Commands::Watch { .. } => watch(&source, settings.metrics_port).await,
    }
}

/// Environment settings with command-line overrides applied
fn settings_for(cli: &Cli) -> Result<ProviderSettings> {
    let mut settings = ProviderSettings::from_env().context("Invalid environment settings")?;
    if let Some(region) = &cli.region {
        settings.region.clone_from(region);
    }
    if cli.endpoint_url.is_some() {
        settings.endpoint_url.clone_from(&cli.endpoint_url);
    }
    if cli.prefix_environment.is_some() {
        settings.environment.clone_from(&cli.prefix_environment);
    }
    if cli.prefix_app.is_some() {
        settings.app_name.clone_from(&cli.prefix_app);
    }
    match &cli.command {
        Commands::Dump { .. } => settings.polling_interval_secs = 0,
        Commands::Watch {
            interval,
            metrics_port,
        } => {
            if let Some(interval) = interval {
                settings.polling_interval_secs = *interval;
            }
            if let Some(port) = metrics_port {
                settings.metrics_port = *port;
            }
        }
    }
    Ok(settings)
}

async fn load_fixture(path: &Path) -> Result<InMemorySecretStore> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read fixture {}", path.display()))?;
    let secrets: serde_json::Map<String, Value> = serde_json::from_str(&raw)
        .with_context(|| format!("Fixture {} is not a JSON object", path.display()))?;

    let store = InMemorySecretStore::new();
    for (name, value) in secrets {
        match value {
            Value::String(text) => store.put_secret(&name, text).await,
            other => store.put_secret(&name, other.to_string()).await,
        };
    }
    info!(path = %path.display(), "Loaded secret fixture");
    Ok(store)
}

async fn dump(source: &ConfigurationSource, show_values: bool) -> Result<()> {
    let provider = source
        .build_and_load()
        .await
        .context("Failed to load configuration")?;

    for (key, value) in provider.data().iter() {
        let value = if show_values { value } else { REDACTED };
        println!("{key}={value}");
    }
    provider.dispose().await;
    Ok(())
}

async fn watch(source: &ConfigurationSource, metrics_port: u16) -> Result<()> {
    metrics::register_metrics()?;

    let provider = Arc::new(
        source
            .build()
            .await
            .context("Failed to create configuration provider")?,
    );
    provider.on_change(|data| {
        info!(keys = data.len(), "Configuration reloaded");
    });

    let shutdown = CancellationToken::new();
    let server_state = ServerState {
        provider: Arc::clone(&provider),
    };
    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = start_server(metrics_port, server_state, server_shutdown).await {
            error!(error = %e, "HTTP server error");
        }
    });

    provider
        .load()
        .await
        .context("Failed to load configuration")?;
    info!(
        status = %provider.status(),
        keys = provider.data().len(),
        "Watching secret store, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");

    provider.dispose().await;
    shutdown.cancel();
    if let Err(e) = server.await {
        error!(error = %e, "HTTP server task failed");
    }
    log_final_state(&provider);
    Ok(())
}

fn log_final_state(provider: &ConfigurationProvider) {
    match provider.last_error() {
        Some(failure) => info!(
            generation = provider.generation(),
            last_error = %failure,
            "Provider stopped"
        ),
        None => info!(generation = provider.generation(), "Provider stopped"),
    }
}
