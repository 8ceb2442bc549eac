//! Metrics instrumentation for runtime observability.

use std::time::Instant;

/// Record backend invocation latency.
pub fn record_invoke_latency(duration_ms: f64) {
    metrics::histogram!("backend_invoke_latency", duration_ms);
}

/// Record end-to-end run duration.
pub fn record_run_duration(duration_ms: f64) {
    metrics::histogram!("run_duration", duration_ms);
}

/// Increment run counter.
pub fn increment_runs() {
    metrics::counter!("agent_runs_total", 1);
}

/// Increment counter of normalized backend failures.
pub fn increment_backend_failures() {
    metrics::counter!("backend_failures_total", 1);
}

/// Increment counter of failures caught at the engine boundary.
pub fn increment_graph_failures() {
    metrics::counter!("graph_failures_total", 1);
}

/// Increment counter of client handles built by the cache.
pub fn increment_client_constructions() {
    metrics::counter!("client_cache_constructions_total", 1);
}

/// RAII timer for automatic metric recording.
pub struct MetricTimer {
    start: Instant,
    metric_name: &'static str,
}

impl MetricTimer {
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }
}

impl Drop for MetricTimer {
    fn drop(&mut self) {
        let duration_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        match self.metric_name {
            "backend_invoke_latency" => record_invoke_latency(duration_ms),
            "run_duration" => record_run_duration(duration_ms),
            _ => {}
        }
    }
}
