// Prometheus metrics definitions for the monkey backend.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Simulation ───────────────────────────────────────────────────

    /// Monkeys produced by breeding.
    pub static ref MONKEYS_BORN_TOTAL: IntCounter =
        IntCounter::new("monkey_born_total", "Monkeys produced by breeding").unwrap();

    /// Fights resolved, by outcome (win, draw).
    pub static ref FIGHTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("monkey_fights_total", "Fights resolved"),
        &["outcome"],
    )
    .unwrap();

    /// Breedings and fights refused, by reason.
    pub static ref SIM_REJECTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("monkey_sim_rejections_total", "Breedings and fights refused"),
        &["reason"],
    )
    .unwrap();

    // ── HTTP ─────────────────────────────────────────────────────────

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("monkey_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    /// API request duration in seconds, by endpoint.
    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "monkey_api_request_duration_seconds",
            "API request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        &["endpoint"],
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Safe to call more than once.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(MONKEYS_BORN_TOTAL.clone()),
        Box::new(FIGHTS_TOTAL.clone()),
        Box::new(SIM_REJECTIONS_TOTAL.clone()),
        Box::new(API_REQUESTS_TOTAL.clone()),
        Box::new(API_REQUEST_DURATION_SECONDS.clone()),
    ];

    for c in collectors {
        if let Err(e) = REGISTRY.register(c) {
            if !matches!(e, prometheus::Error::AlreadyReg) {
                tracing::error!("Failed to register metric: {e}");
            }
        }
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Normalize a URL path for metric labels: replace numeric path segments with `:id`
/// to prevent cardinality explosion.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.parse::<i64>().is_ok() {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
