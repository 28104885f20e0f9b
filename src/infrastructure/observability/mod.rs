//! Observability for the pricing engine
//!
//! Metrics live in a process-local Prometheus registry and are exposed as text
//! via [`EngineMetrics::render`]. The engine never serves them itself.

pub mod metrics;

pub use metrics::EngineMetrics;
