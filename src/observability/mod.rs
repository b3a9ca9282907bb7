//! # Observability
//!
//! - `logging`: tracing subscriber initialisation
//! - `metrics`: Prometheus metrics collection

pub mod logging;
pub mod metrics;
