//! # Configuration Provider
//!
//! Turns the contents of a secret store into a flat, case-insensitive
//! configuration map and keeps it fresh.
//!
//! ## Load cycle
//!
//! 1. Enumerate secrets (accept-list, or every page of the listing)
//! 2. Apply the secret filter; rejected secrets are never fetched
//! 3. Fetch each value, shaping the request with the configured hook
//! 4. Flatten JSON payloads (`name:path:to:leaf`), keep others verbatim
//! 5. Map every key through the key generator
//!
//! The initial [`ConfigurationProvider::load`] always publishes. Later reloads
//! publish only when the new snapshot differs as a set from the current one,
//! and each publication notifies change listeners exactly once.
//!
//! Cycles never overlap: a reload requested while another is running waits
//! for it to finish.

mod fetch;
mod polling;
mod state;

pub use state::{LoadFailure, ProviderStatus};

use crate::client::SecretStoreClient;
use crate::error::ConfigurationError;
use crate::observability::metrics;
use crate::options::ProviderOptions;
use crate::snapshot::{ConfigurationData, Snapshot};
use fetch::{LoadedConfiguration, SecretLoader};
use state::ProviderState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Callback invoked after a reload publishes new configuration
pub type ChangeListener = Arc<dyn Fn(&ConfigurationData) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleKind {
    Initial,
    Reload,
}

impl CycleKind {
    fn label(self) -> &'static str {
        match self {
            CycleKind::Initial => "initial",
            CycleKind::Reload => "reload",
        }
    }
}

/// Secret-backed configuration provider
///
/// Cheap to read from any thread: [`data`](Self::data) hands out the current
/// immutable view. Dropping the provider stops polling; call
/// [`dispose`](Self::dispose) to also wait for the poller to exit.
pub struct ConfigurationProvider {
    inner: Arc<ProviderInner>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

pub(crate) struct ProviderInner {
    client: Arc<dyn SecretStoreClient>,
    options: ProviderOptions,
    state: RwLock<ProviderState>,
    /// Held for the duration of every load cycle
    cycle: tokio::sync::Mutex<()>,
    listeners: RwLock<Vec<ChangeListener>>,
    generation: watch::Sender<u64>,
    shutdown: CancellationToken,
    disposed: AtomicBool,
}

impl std::fmt::Debug for ConfigurationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationProvider")
            .field("status", &self.status())
            .field("options", &self.inner.options)
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl ConfigurationProvider {
    /// Create a provider; nothing is fetched until [`load`](Self::load)
    pub fn new(
        client: Arc<dyn SecretStoreClient>,
        options: ProviderOptions,
    ) -> Result<Self, ConfigurationError> {
        options.validate()?;
        let (generation, _) = watch::channel(0);
        Ok(Self {
            inner: Arc::new(ProviderInner {
                client,
                options,
                state: RwLock::new(ProviderState::default()),
                cycle: tokio::sync::Mutex::new(()),
                listeners: RwLock::new(Vec::new()),
                generation,
                shutdown: CancellationToken::new(),
                disposed: AtomicBool::new(false),
            }),
            poller: Mutex::new(None),
        })
    }

    /// Perform the initial load and start polling if an interval is set
    ///
    /// The first successful load publishes unconditionally. On failure nothing
    /// is published and `load` may be called again. Calling `load` on a loaded
    /// provider behaves like [`force_reload`](Self::force_reload) without a
    /// cancellation signal.
    pub async fn load(&self) -> Result<(), ConfigurationError> {
        let inner = &self.inner;
        let guard = inner.cycle.lock().await;
        if inner.disposed.load(Ordering::SeqCst) {
            return Err(ConfigurationError::Disposed);
        }

        match inner.status() {
            ProviderStatus::Disposed => return Err(ConfigurationError::Disposed),
            status if status.is_loaded() => {
                drop(guard);
                return inner.reload(&inner.shutdown).await.map(|_| ());
            }
            _ => {}
        }

        inner.set_status(ProviderStatus::Loading);
        if let Err(e) = inner.run_cycle(CycleKind::Initial, &inner.shutdown).await {
            let status = if inner.disposed.load(Ordering::SeqCst) {
                ProviderStatus::Disposed
            } else {
                ProviderStatus::Uninitialized
            };
            inner.set_status(status);
            return Err(e);
        }

        match inner.options.polling_interval {
            Some(interval) => {
                inner.set_status(ProviderStatus::Polling);
                let handle = polling::spawn(Arc::clone(inner), interval);
                *self.poller.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
            }
            None => inner.set_status(ProviderStatus::Steady),
        }
        drop(guard);
        Ok(())
    }

    /// Run one reload cycle now
    ///
    /// Returns `true` if new configuration was published. Store calls observe
    /// `cancel`; a cancelled reload publishes nothing and reports
    /// [`ConfigurationError::Cancelled`].
    pub async fn force_reload(&self, cancel: CancellationToken) -> Result<bool, ConfigurationError> {
        self.inner.reload(&cancel).await
    }

    /// Stop polling and wait for the poller to exit
    ///
    /// After this returns no reload is running or will run. Calling it again
    /// is a no-op.
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.shutdown.cancel();

        // In-flight cycles observe the shutdown token and finish promptly
        let _guard = self.inner.cycle.lock().await;
        let poller = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = poller {
            if let Err(e) = handle.await {
                warn!(error = %e, "Polling task ended abnormally");
            }
        }
        self.inner.set_status(ProviderStatus::Disposed);
        info!("Configuration provider disposed");
    }

    /// Current configuration view
    #[must_use]
    pub fn data(&self) -> Arc<ConfigurationData> {
        Arc::clone(&self.inner.read_state().data)
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.read_state().snapshot)
    }

    /// Look up a single value (case-insensitive)
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.read_state().data.get(key).map(ToString::to_string)
    }

    #[must_use]
    pub fn status(&self) -> ProviderStatus {
        self.inner.status()
    }

    /// Most recent failure, cleared by the next successful cycle
    #[must_use]
    pub fn last_error(&self) -> Option<LoadFailure> {
        self.inner.read_state().last_error.clone()
    }

    /// Number of reloads that published new configuration
    #[must_use]
    pub fn generation(&self) -> u64 {
        *self.inner.generation.borrow()
    }

    /// Receiver that observes a new generation after every published reload
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.generation.subscribe()
    }

    /// Register a callback for published reloads
    ///
    /// Callbacks run on the task that performed the reload, after the new
    /// view is visible through [`data`](Self::data).
    pub fn on_change<F>(&self, listener: F)
    where
        F: Fn(&ConfigurationData) + Send + Sync + 'static,
    {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    /// Check if the background poller is alive
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    #[must_use]
    pub fn options(&self) -> &ProviderOptions {
        &self.inner.options
    }
}

impl Drop for ConfigurationProvider {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
    }
}

impl ProviderInner {
    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, ProviderState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, ProviderState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn status(&self) -> ProviderStatus {
        self.read_state().status
    }

    fn set_status(&self, status: ProviderStatus) {
        self.write_state().status = status;
    }

    /// Serialised reload; fails unless the provider is loaded
    async fn reload(&self, cancel: &CancellationToken) -> Result<bool, ConfigurationError> {
        let _guard = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(self.cancellation_error()),
            () = self.shutdown.cancelled() => return Err(ConfigurationError::Disposed),
            guard = self.cycle.lock() => guard,
        };

        match self.status() {
            ProviderStatus::Disposed => Err(ConfigurationError::Disposed),
            status if !status.is_loaded() => Err(ConfigurationError::NotLoaded),
            _ => self.run_cycle(CycleKind::Reload, cancel).await,
        }
    }

    fn cancellation_error(&self) -> ConfigurationError {
        if self.disposed.load(Ordering::SeqCst) {
            ConfigurationError::Disposed
        } else {
            ConfigurationError::Cancelled
        }
    }

    /// One load cycle; the caller holds the cycle lock
    async fn run_cycle(
        &self,
        kind: CycleKind,
        cancel: &CancellationToken,
    ) -> Result<bool, ConfigurationError> {
        let start = Instant::now();
        metrics::increment_loads(kind.label());

        let result = match self.fetch_and_publish(kind, cancel).await {
            Ok(published) => {
                self.write_state().last_error = None;
                Ok(published)
            }
            Err(e) => {
                metrics::increment_load_errors(kind.label());
                if !matches!(e, ConfigurationError::Cancelled | ConfigurationError::Disposed) {
                    self.write_state().last_error = Some(state::LoadFailure::from_error(&e));
                }
                Err(e)
            }
        };

        metrics::observe_load_duration(start.elapsed().as_secs_f64());
        result
    }

    async fn fetch_and_publish(
        &self,
        kind: CycleKind,
        cancel: &CancellationToken,
    ) -> Result<bool, ConfigurationError> {
        let loader = SecretLoader::new(self.client.as_ref(), &self.options);
        let loaded = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(self.cancellation_error()),
            () = self.shutdown.cancelled() => return Err(self.cancellation_error()),
            loaded = loader.load() => loaded?,
        };

        let changed = kind == CycleKind::Initial || *self.read_state().snapshot != loaded.snapshot;
        if !changed {
            debug!(entries = loaded.snapshot.len(), "Configuration unchanged");
            return Ok(false);
        }

        self.write_settings_file(&loaded).await?;
        self.publish(kind, loaded.snapshot);
        Ok(true)
    }

    /// Materialise raw documents before the snapshot they belong to is published
    async fn write_settings_file(&self, loaded: &LoadedConfiguration) -> Result<(), ConfigurationError> {
        let Some(settings_file) = &self.options.settings_file else {
            return Ok(());
        };
        for document in &loaded.documents {
            settings_file.write(document).await?;
        }
        Ok(())
    }

    fn publish(&self, kind: CycleKind, snapshot: Snapshot) {
        let entries = snapshot.len();
        let data = Arc::new(snapshot.materialize());
        {
            let mut state = self.write_state();
            state.snapshot = Arc::new(snapshot);
            state.data = Arc::clone(&data);
        }
        metrics::set_configuration_entries(data.len());

        match kind {
            CycleKind::Initial => {
                info!(entries, keys = data.len(), "Loaded configuration from secret store");
            }
            CycleKind::Reload => {
                info!(entries, keys = data.len(), "Configuration changed, publishing reload");
                metrics::increment_snapshot_changes();
                self.generation.send_modify(|generation| *generation += 1);
                let listeners: Vec<ChangeListener> = self
                    .listeners
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                for listener in listeners {
                    listener(data.as_ref());
                }
            }
        }
    }
}
