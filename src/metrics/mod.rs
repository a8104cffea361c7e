//! Metrics collection for observability

use prometheus::{
    Counter, CounterVec, Encoder, HistogramVec, Opts, Registry, TextEncoder,
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry,
};
use std::sync::Arc;
use once_cell::sync::Lazy;

use crate::pricing::models::{EstimationMethod, EstimationResult, MethodFailure};

const UNKNOWN_METHOD_LABEL: &str = "unknown";

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Estimation API metrics
    pub estimation_requests: CounterVec,
    pub estimation_duration: HistogramVec,
    pub method_outcomes: CounterVec,

    // Cache metrics
    pub cache_hits: Counter,
    pub cache_misses: Counter,

    // Category detection
    pub category_detections: CounterVec,

    // Request store
    pub requests_created: Counter,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let estimation_requests = register_counter_vec_with_registry!(
            Opts::new("estimation_requests_total", "Total estimation requests"),
            &["status"],
            registry
        )?;

        let estimation_duration = register_histogram_vec_with_registry!(
            "estimation_duration_seconds",
            "Estimation request duration in seconds",
            &["endpoint"],
            registry
        )?;

        let method_outcomes = register_counter_vec_with_registry!(
            Opts::new("estimation_method_outcomes_total", "Estimation method results"),
            &["method", "status"],
            registry
        )?;

        let cache_hits = register_counter_with_registry!(
            Opts::new("estimation_cache_hits_total", "Estimations served from cache"),
            registry
        )?;

        let cache_misses = register_counter_with_registry!(
            Opts::new("estimation_cache_misses_total", "Estimations computed fresh"),
            registry
        )?;

        let category_detections = register_counter_vec_with_registry!(
            Opts::new("category_detections_total", "Category detections by result"),
            &["category"],
            registry
        )?;

        let requests_created = register_counter_with_registry!(
            Opts::new("procurement_requests_created_total", "Procurement requests created"),
            registry
        )?;

        Ok(Self {
            registry,
            estimation_requests,
            estimation_duration,
            method_outcomes,
            cache_hits,
            cache_misses,
            category_detections,
            requests_created,
        })
    }

    /// Record an estimation request
    pub fn record_estimation(&self, success: bool) {
        let status = if success { "success" } else { "error" };
        self.estimation_requests.with_label_values(&[status]).inc();
    }

    /// Record per-method results of one aggregation
    pub fn record_methods(&self, estimates: &[EstimationResult], failures: &[MethodFailure]) {
        for result in estimates {
            self.method_outcomes
                .with_label_values(&[result.method.as_str(), "success"])
                .inc();
        }
        for failure in failures {
            self.method_outcomes
                .with_label_values(&[method_label(&failure.method), "error"])
                .inc();
        }
    }

    pub fn record_cache(&self, hit: bool) {
        if hit {
            self.cache_hits.inc();
        } else {
            self.cache_misses.inc();
        }
    }

    pub fn record_detection(&self, category_id: &str) {
        self.category_detections.with_label_values(&[category_id]).inc();
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Canonical method name, or `unknown` for names no method answers to
fn method_label(name: &str) -> &'static str {
    name.parse::<EstimationMethod>()
        .map(|method| method.as_str())
        .unwrap_or(UNKNOWN_METHOD_LABEL)
}

/// Helper macro to time operations
#[macro_export]
macro_rules! time_operation {
    ($histogram:expr, $label:expr, $operation:expr) => {{
        let timer = $histogram.with_label_values(&[$label]).start_timer();
        let result = $operation;
        timer.observe_duration();
        result
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        let metrics = Metrics::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_record_estimation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_estimation(true);
        metrics.record_estimation(false);
        assert_eq!(metrics.estimation_requests.with_label_values(&["success"]).get(), 1.0);
        assert_eq!(metrics.estimation_requests.with_label_values(&["error"]).get(), 1.0);
    }

    #[test]
    fn test_record_method_failure() {
        let metrics = Metrics::new().unwrap();
        metrics.record_methods(&[], &[MethodFailure::new("analogous", "no data")]);
        assert_eq!(
            metrics.method_outcomes.with_label_values(&["analogous", "error"]).get(),
            1.0
        );
    }

    #[test]
    fn test_unrecognized_methods_share_one_series() {
        let metrics = Metrics::new().unwrap();
        for i in 0..200 {
            metrics.record_methods(&[], &[MethodFailure::new(format!("junk-{}", i), "unknown")]);
        }
        metrics.record_methods(&[], &[MethodFailure::new("bottom_up", "failed")]);

        assert_eq!(
            metrics.method_outcomes.with_label_values(&["unknown", "error"]).get(),
            200.0
        );
        assert_eq!(
            metrics.method_outcomes.with_label_values(&["bottom-up", "error"]).get(),
            1.0
        );

        let series = metrics
            .export_prometheus()
            .lines()
            .filter(|line| line.starts_with("estimation_method_outcomes_total{"))
            .count();
        assert_eq!(series, 2);
    }

    #[test]
    fn test_export_contains_metric_names() {
        let metrics = Metrics::new().unwrap();
        metrics.record_cache(true);
        metrics.record_detection("IT001");
        let text = metrics.export_prometheus();
        assert!(text.contains("estimation_cache_hits_total"));
        assert!(text.contains("category_detections_total"));
    }

    #[test]
    fn test_time_operation_macro() {
        let metrics = Metrics::new().unwrap();
        let value = time_operation!(metrics.estimation_duration, "test", 2 + 2);
        assert_eq!(value, 4);
    }
}
