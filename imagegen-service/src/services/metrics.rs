//! Prometheus metrics for imagegen-service.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub static IMAGEGEN_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static IMAGEGEN_PROVIDER_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static IMAGEGEN_PROVIDER_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Later calls are no-ops.
pub fn init_metrics() {
    if REGISTRY.get().is_some() {
        return;
    }

    let registry = Registry::new();

    // Relay outcomes: "success" or a relay error code
    let requests_total = IntCounterVec::new(
        Opts::new("imagegen_requests_total", "Total relay requests by outcome"),
        &["outcome"],
    )
    .expect("Failed to create imagegen_requests_total metric");

    let provider_latency = HistogramVec::new(
        HistogramOpts::new(
            "imagegen_provider_latency_seconds",
            "Image provider latency in seconds",
        )
        .buckets(vec![0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["provider", "model"],
    )
    .expect("Failed to create imagegen_provider_latency_seconds metric");

    let provider_errors = IntCounterVec::new(
        Opts::new("imagegen_provider_errors_total", "Total image provider errors"),
        &["provider", "error_type"],
    )
    .expect("Failed to create imagegen_provider_errors_total metric");

    registry
        .register(Box::new(requests_total.clone()))
        .expect("Failed to register imagegen_requests_total");
    registry
        .register(Box::new(provider_latency.clone()))
        .expect("Failed to register imagegen_provider_latency_seconds");
    registry
        .register(Box::new(provider_errors.clone()))
        .expect("Failed to register imagegen_provider_errors_total");

    let _ = REGISTRY.set(registry);
    let _ = IMAGEGEN_REQUESTS_TOTAL.set(requests_total);
    let _ = IMAGEGEN_PROVIDER_LATENCY_SECONDS.set(provider_latency);
    let _ = IMAGEGEN_PROVIDER_ERRORS_TOTAL.set(provider_errors);

    tracing::info!("Prometheus metrics initialized");
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to convert metrics to UTF-8");
        format!("# Failed to convert metrics to UTF-8: {}\n", e)
    })
}

pub fn record_request(outcome: &str) {
    if let Some(counter) = IMAGEGEN_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn record_provider_latency(provider: &str, model: &str, duration_secs: f64) {
    if let Some(histogram) = IMAGEGEN_PROVIDER_LATENCY_SECONDS.get() {
        histogram
            .with_label_values(&[provider, model])
            .observe(duration_secs);
    }
}

pub fn record_provider_error(provider: &str, error_type: &str) {
    if let Some(counter) = IMAGEGEN_PROVIDER_ERRORS_TOTAL.get() {
        counter.with_label_values(&[provider, error_type]).inc();
    }
}
