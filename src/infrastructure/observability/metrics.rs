//! Prometheus metrics definitions for the pricing engine
//!
//! All metrics use the `fixit_pricing_` prefix.

use prometheus::{
    CounterVec, Gauge, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

/// Prometheus metrics for the price estimation engine
#[derive(Clone)]
pub struct EngineMetrics {
    registry: Arc<Registry>,
    /// Quotes produced, by method and confidence
    pub predictions_total: CounterVec,
    /// Cache lookups by outcome (hit/miss)
    pub cache_lookups_total: CounterVec,
    /// Requests rejected by input validation
    pub validation_rejections_total: IntCounter,
    /// Quotes priced by rules because no model output was used
    pub backend_fallbacks_total: IntCounter,
    /// Entries currently held by the prediction cache
    pub cache_entries: GenericGauge<AtomicF64>,
    /// Time spent producing one quote (cache hits included)
    pub prediction_latency_seconds: Histogram,
}

impl EngineMetrics {
    /// Create a new metrics instance with all series registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let predictions_total = CounterVec::new(
            Opts::new(
                "fixit_pricing_predictions_total",
                "Total price predictions by method and confidence",
            ),
            &["method", "confidence"],
        )?;
        registry.register(Box::new(predictions_total.clone()))?;

        let cache_lookups_total = CounterVec::new(
            Opts::new(
                "fixit_pricing_cache_lookups_total",
                "Prediction cache lookups by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(cache_lookups_total.clone()))?;

        let validation_rejections_total = IntCounter::new(
            "fixit_pricing_validation_rejections_total",
            "Quote requests rejected by input validation",
        )?;
        registry.register(Box::new(validation_rejections_total.clone()))?;

        let backend_fallbacks_total = IntCounter::new(
            "fixit_pricing_backend_fallbacks_total",
            "Quotes computed without model output",
        )?;
        registry.register(Box::new(backend_fallbacks_total.clone()))?;

        let cache_entries = Gauge::with_opts(Opts::new(
            "fixit_pricing_cache_entries",
            "Entries held by the prediction cache",
        ))?;
        registry.register(Box::new(cache_entries.clone()))?;

        let prediction_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "fixit_pricing_prediction_latency_seconds",
                "Quote latency in seconds",
            )
            .buckets(vec![0.00001, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 1.0]),
        )?;
        registry.register(Box::new(prediction_latency_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            predictions_total,
            cache_lookups_total,
            validation_rejections_total,
            backend_fallbacks_total,
            cache_entries,
            prediction_latency_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_predictions(&self, method: &str, confidence: &str) {
        self.predictions_total
            .with_label_values(&[method, confidence])
            .inc();
    }

    pub fn inc_cache_lookup(&self, hit: bool) {
        let outcome = if hit { "hit" } else { "miss" };
        self.cache_lookups_total.with_label_values(&[outcome]).inc();
    }

    pub fn set_cache_entries(&self, entries: usize) {
        self.cache_entries.set(entries as f64);
    }
}
