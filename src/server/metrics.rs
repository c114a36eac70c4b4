use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all sync server metrics
const PREFIX: &str = "casino_sync";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Trigger Metrics
    pub static ref TRIGGER_EXECUTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_trigger_executions_total"), "Trigger deliveries by process and outcome"),
        &["process", "outcome"]
    ).expect("Failed to create trigger_executions_total metric");

    // Content Metrics
    pub static ref CONTENT_ENTRIES_TOTAL: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_content_entries_total"), "Total entries in the content store"),
        &["kind"]
    ).expect("Failed to create content_entries_total metric");

    // Process Metrics
    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(TRIGGER_EXECUTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CONTENT_ENTRIES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a trigger delivery outcome for a process
pub fn record_trigger_execution(process: &str, outcome: &str) {
    TRIGGER_EXECUTIONS_TOTAL
        .with_label_values(&[process, outcome])
        .inc();
}

/// Update the entry count gauge for a content kind
pub fn set_content_entries(kind: &str, count: u64) {
    CONTENT_ENTRIES_TOTAL
        .with_label_values(&[kind])
        .set(count as f64);
}

/// Update process memory usage
pub fn update_memory_usage() {
    // Get current process memory usage
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    // Parse the RSS (Resident Set Size) in kB
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        if let Ok(kb) = kb_str.parse::<f64>() {
                            // Convert kB to bytes
                            PROCESS_MEMORY_BYTES.set(kb * 1024.0);
                            return;
                        }
                    }
                }
            }
        }
    }

    // Fallback for non-Linux systems or if reading fails
    // We'll just not update the metric
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    // Update memory usage before returning metrics
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        // This test ensures metrics can be initialized without panic
        init_metrics();

        // Verify we can gather metrics
        let metric_families = REGISTRY.gather();
        assert!(!metric_families.is_empty(), "Metrics should be registered");
    }

    #[test]
    fn test_record_http_request() {
        // Ensure metrics are initialized
        init_metrics();

        // Record a sample request
        record_http_request("GET", "/v1/import/status", 200, Duration::from_millis(50));

        // Verify the counter was incremented
        let metrics = REGISTRY.gather();
        let http_metrics = metrics
            .iter()
            .find(|m| m.get_name() == "casino_sync_http_requests_total");

        assert!(http_metrics.is_some(), "HTTP request metrics should exist");
    }

    #[test]
    fn test_record_trigger_execution() {
        // Ensure metrics are initialized
        init_metrics();

        record_trigger_execution("brand_sync", "handled");
        record_trigger_execution("brand_sync", "busy");

        let metrics = REGISTRY.gather();
        let trigger_metrics = metrics
            .iter()
            .find(|m| m.get_name() == "casino_sync_trigger_executions_total");

        assert!(trigger_metrics.is_some(), "Trigger metrics should exist");
    }

    #[test]
    fn test_content_entries_gauge() {
        // Ensure metrics are initialized
        init_metrics();

        set_content_entries("brand", 42);
        set_content_entries("slot", 1300);

        let metrics = REGISTRY.gather();
        let entries_metric = metrics
            .iter()
            .find(|m| m.get_name() == "casino_sync_content_entries_total")
            .expect("Content entries metrics should exist");

        let brand = entries_metric
            .get_metric()
            .iter()
            .find(|m| m.get_label().iter().any(|l| l.get_value() == "brand"))
            .expect("brand gauge should exist");
        assert_eq!(brand.get_gauge().get_value(), 42.0);
    }
}
