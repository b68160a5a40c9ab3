//! Prometheus metrics backend for the loadmgr executor.
//!
//! This crate provides a [`PrometheusMetrics`] implementation of [`loadmgr_core::MetricsBackend`] that exposes executor and controller metrics in Prometheus format.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use loadmgr_core::BoundedExecutor;
//! use loadmgr_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Create prometheus metrics backend
//! let metrics = PrometheusMetrics::new()?;
//!
//! // Inject into an executor
//! let executor = BoundedExecutor::new("ingest").with_metrics(Arc::new(metrics.clone()));
//!
//! // Expose /metrics endpoint (example with custom HTTP server)
//! // let metric_families = metrics.gather();
//! // let encoder = prometheus::TextEncoder::new();
//! // encoder.encode(&metric_families, &mut response_buffer)?;
//! # let _ = executor;
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `loadmgr_tasks_in_progress{run}` - Gauge
//! - `loadmgr_tasks_succeeded_total{run}` - Counter
//! - `loadmgr_task_errors_total{run, outcome}` - Counter
//! - `loadmgr_task_duration_seconds{run}` - Histogram
//! - `loadmgr_gate_wait_duration_seconds{run}` - Histogram
//! - `loadmgr_processing_time_seconds_total{run}` - Counter
//! - `loadmgr_queue_length{run}` - Gauge
//! - `loadmgr_tasks_not_admitted_total{run}` - Counter
//! - `loadmgr_concurrency_limit` - Gauge
//! - `loadmgr_load_percent` - Gauge
//!
//! ## HTTP Server
//! This crate does NOT provide HTTP server for `/metrics` endpoint.
//! Use your application's existing HTTP framework (axum, warp, etc):
//!
//! ```rust,ignore
//! // Example with axum
//! async fn metrics_handler(
//!     State(metrics): State<Arc<PrometheusMetrics>>
//! ) -> Response {
//!     let families = metrics.gather();
//!     let encoder = prometheus::TextEncoder::new();
//!     let mut buffer = vec![];
//!     encoder.encode(&families, &mut buffer).unwrap();
//!     Response::builder()
//!         .header("Content-Type", encoder.format_type())
//!         .body(buffer.into())
//!         .unwrap()
//! }
//! ```

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
