// Prometheus metrics definitions.

use std::sync::Once;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use lazy_static::lazy_static;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Counters ─────────────────────────────────────────────────────

    /// Accounts created.
    pub static ref REGISTRATIONS_TOTAL: IntCounter = IntCounter::new(
        "gamematch_registrations_total",
        "Accounts created",
    )
    .unwrap();

    /// Login attempts, by outcome (success, failure).
    pub static ref LOGINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("gamematch_logins_total", "Login attempts"),
        &["outcome"],
    )
    .unwrap();

    /// Match records created by candidate searches.
    pub static ref MATCHES_CREATED_TOTAL: IntCounter = IntCounter::new(
        "gamematch_matches_created_total",
        "Match records created",
    )
    .unwrap();

    /// Accept / reject decisions applied, by resulting status.
    pub static ref MATCH_DECISIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("gamematch_match_decisions_total", "Match decisions applied"),
        &["status"],
    )
    .unwrap();

    /// Chat messages stored.
    pub static ref MESSAGES_SENT_TOTAL: IntCounter = IntCounter::new(
        "gamematch_messages_sent_total",
        "Chat messages sent",
    )
    .unwrap();

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("gamematch_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// API request duration in seconds, by endpoint.
    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "gamematch_api_request_duration_seconds",
            "API request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        &["endpoint"],
    )
    .unwrap();
}

static REGISTER: Once = Once::new();

/// Register all metrics with the custom registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(REGISTRATIONS_TOTAL.clone()),
            Box::new(LOGINS_TOTAL.clone()),
            Box::new(MATCHES_CREATED_TOTAL.clone()),
            Box::new(MATCH_DECISIONS_TOTAL.clone()),
            Box::new(MESSAGES_SENT_TOTAL.clone()),
            Box::new(API_REQUESTS_TOTAL.clone()),
            Box::new(API_REQUEST_DURATION_SECONDS.clone()),
        ];

        for c in collectors {
            REGISTRY.register(c).expect("failed to register metric");
        }
    });
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
    }
    String::from_utf8(buffer).unwrap_or_default()
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

/// Middleware recording request counts and latency per normalized path.
pub async fn track_requests(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let endpoint = normalize_path(req.uri().path());
    let started = Instant::now();

    let response = next.run(req).await;

    API_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), endpoint.as_str(), response.status().as_str()])
        .inc();
    API_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint.as_str()])
        .observe(started.elapsed().as_secs_f64());
    response
}
