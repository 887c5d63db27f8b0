use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("advisory_requests_total", "Requests to rate-limited API routes, rejected ones included").unwrap();
    pub static ref RATE_LIMITED: Counter =
        register_counter!("advisory_rate_limited_total", "Requests rejected by the rate limiter").unwrap();
    pub static ref BLACKLISTED: Counter =
        register_counter!("advisory_blacklisted_total", "Requests rejected from blacklisted IPs").unwrap();
    pub static ref SUBMISSIONS: Counter =
        register_counter!("advisory_submissions_total", "Sign requests created").unwrap();
    pub static ref SUBMISSION_FAILURES: Counter =
        register_counter!("advisory_submission_failures_total", "Submissions that failed validation or signing").unwrap();
    pub static ref PERSIST_FAILURES: Counter =
        register_counter!("advisory_persist_failures_total", "Records that could not be written to Firebase").unwrap();
    pub static ref PROVIDER_LATENCY: Histogram = register_histogram!(
        "advisory_provider_latency_seconds",
        "Digio call latency in seconds"
    )
    .unwrap();
    pub static ref RATE_LIMIT_ENTRIES: Gauge =
        register_gauge!("advisory_rate_limit_entries", "IPs currently tracked by the rate limiter").unwrap();
}

// Prometheus text exposition of every registered metric
pub fn render() -> String {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
