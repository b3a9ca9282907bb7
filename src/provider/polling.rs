//! # Change Polling
//!
//! Background task that reloads the provider on a fixed interval until the
//! provider is disposed.
//!
//! A failed reload is logged and recorded on the provider; the loop keeps
//! polling and the last published configuration stays in place.

use super::ProviderInner;
use crate::error::ConfigurationError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub(crate) fn spawn(inner: Arc<ProviderInner>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(poll_for_changes(inner, interval))
}

async fn poll_for_changes(inner: Arc<ProviderInner>, interval: Duration) {
    let shutdown = inner.shutdown.clone();
    info!(interval_secs = interval.as_secs_f64(), "Polling secret store for changes");

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }

        match inner.reload(&shutdown).await {
            Ok(true) => debug!("Poll published new configuration"),
            Ok(false) => debug!("Poll found no changes"),
            Err(ConfigurationError::Cancelled | ConfigurationError::Disposed) => break,
            Err(e) if e.is_transient() => {
                warn!(error = %e, "Poll failed, keeping current configuration");
            }
            Err(e) => {
                error!(error = %e, "Poll failed, keeping current configuration");
            }
        }
    }

    debug!("Polling stopped");
}
