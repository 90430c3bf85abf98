//! Prometheus metrics for the docity server.
//!
//! Labels never carry pack names or paths, only status codes and error kinds,
//! so cardinality stays fixed regardless of traffic.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Content handler
pub static VIEW_RESPONSES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "docity_view_responses_total",
            "Content responses by HTTP status",
        ),
        &["status"],
    )
    .expect("metric creation failed")
});

pub static BYTES_SERVED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "docity_bytes_served_total",
        "Total content bytes sent in 200 responses",
    )
    .expect("metric creation failed")
});

// Repository access
pub static REPO_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "docity_repo_failures_total",
            "Repository call failures by error kind",
        ),
        &["kind"],
    )
    .expect("metric creation failed")
});

pub static LOCATE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "docity_locate_duration_seconds",
            "Time taken to resolve a path to an object identity",
        )
        .buckets(vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5, 1.0, 5.0]),
    )
    .expect("metric creation failed")
});

// Path cache
pub static CACHE_HITS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("docity_path_cache_hits_total", "Path cache hits")
        .expect("metric creation failed")
});

pub static CACHE_MISSES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "docity_path_cache_misses_total",
        "Path cache misses, including expired entries",
    )
    .expect("metric creation failed")
});

pub static CACHE_EVICTIONS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "docity_path_cache_evictions_total",
        "Expired entries removed by the sweep task",
    )
    .expect("metric creation failed")
});

pub static CACHE_ENTRIES: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "docity_path_cache_entries",
        "Entries held by the path cache after the last sweep",
    )
    .expect("metric creation failed")
});

// Registry
pub static PACKS_REGISTERED: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "docity_packs_registered",
        "Document packs accepted at startup",
    )
    .expect("metric creation failed")
});

pub static PACKS_REJECTED: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "docity_packs_rejected",
        "Configured document packs rejected at startup",
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
/// Safe to call more than once.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(VIEW_RESPONSES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(BYTES_SERVED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REPO_FAILURES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(LOCATE_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CACHE_HITS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CACHE_MISSES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CACHE_EVICTIONS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CACHE_ENTRIES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(PACKS_REGISTERED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(PACKS_REJECTED.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Count one content response.
pub fn record_view_response(status: StatusCode) {
    VIEW_RESPONSES
        .with_label_values(&[status.as_str()])
        .inc();
}

/// Count one failed repository call.
pub fn record_repo_failure(kind: &str) {
    REPO_FAILURES.with_label_values(&[kind]).inc();
}
