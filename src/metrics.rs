use crate::telemetry::{runtime_counters, RuntimeCounters};
use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

pub use crate::telemetry::{
    HttpDurationSnapshot, HttpMetricsSnapshot, HttpRequestCountSnapshot, PeerFetchSnapshot,
};

/// Collector that wraps the runtime counter APIs with a single entrypoint.
pub struct MetricsCollector {
    counters: &'static RuntimeCounters,
}

impl MetricsCollector {
    fn new() -> Self {
        Self {
            counters: runtime_counters(),
        }
    }

    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<MetricsCollector> = OnceLock::new();
        INSTANCE.get_or_init(Self::new)
    }

    pub fn http_metrics_snapshot(&self) -> HttpMetricsSnapshot {
        self.counters.http_metrics_snapshot()
    }

    pub fn peer_fetch_snapshot(&self) -> Vec<PeerFetchSnapshot> {
        self.counters.peer_fetch_snapshot()
    }

    pub fn record_http_request(&self, route: &str, status: u16, duration: Duration) {
        self.counters.record_http_request(route, status, duration);
    }

    pub fn record_peer_success(&self, service: &str) {
        self.counters.record_peer_success(service);
    }

    pub fn record_peer_failure(&self, service: &str, stage: &str) {
        self.counters.record_peer_failure(service, stage);
    }
}

/// Returns the shared `MetricsCollector` instance.
pub fn metrics() -> &'static MetricsCollector {
    MetricsCollector::global()
}

/// Middleware recording every request under its matched route template.
pub async fn track_http(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let started = Instant::now();
    let response = next.run(request).await;
    metrics().record_http_request(&route, response.status().as_u16(), started.elapsed());
    response
}

/// Process facts rendered alongside the counters.
pub struct ExpositionContext<'a> {
    pub role: &'a str,
    pub version: &'a str,
    pub ready: bool,
}

pub fn render_exposition(context: &ExpositionContext<'_>) -> String {
    let http_metrics = metrics().http_metrics_snapshot();
    let peer_metrics = metrics().peer_fetch_snapshot();

    let mut output = String::new();
    append_process_metrics(&mut output, context);
    append_http_request_metrics(&mut output, &http_metrics);
    append_peer_fetch_metrics(&mut output, &peer_metrics);
    output
}

fn append_process_metrics(output: &mut String, context: &ExpositionContext<'_>) {
    output.push_str("# HELP podtato_info Static facts about this instance\n");
    output.push_str("# TYPE podtato_info gauge\n");
    output.push_str(&format!(
        "podtato_info{{role=\"{}\",version=\"{}\"}} 1\n",
        bounded_label(context.role),
        bounded_label(context.version)
    ));

    output.push_str("# HELP podtato_ready Readiness gate state (0=NOT_READY,1=READY)\n");
    output.push_str("# TYPE podtato_ready gauge\n");
    output.push_str(&format!(
        "podtato_ready {}\n",
        if context.ready { 1 } else { 0 }
    ));
}

fn append_http_request_metrics(output: &mut String, http_metrics: &HttpMetricsSnapshot) {
    output.push_str(
        "# HELP podtato_http_requests_total HTTP request outcomes by route and status code\n",
    );
    output.push_str("# TYPE podtato_http_requests_total counter\n");
    for entry in &http_metrics.requests {
        let route = bounded_label(&entry.route);
        output.push_str(&format!(
            "podtato_http_requests_total{{route=\"{}\",code=\"{}\"}} {}\n",
            route, entry.status_code, entry.total
        ));
    }

    if http_metrics.durations.is_empty() {
        return;
    }

    output.push_str("# HELP podtato_http_request_duration_seconds HTTP request latency\n");
    output.push_str("# TYPE podtato_http_request_duration_seconds histogram\n");
    for entry in &http_metrics.durations {
        let route = bounded_label(&entry.route);
        for (boundary, cumulative) in &entry.buckets {
            output.push_str(&format!(
                "podtato_http_request_duration_seconds_bucket{{route=\"{}\",le=\"{}\"}} {}\n",
                route, boundary, cumulative
            ));
        }
        output.push_str(&format!(
            "podtato_http_request_duration_seconds_bucket{{route=\"{}\",le=\"+Inf\"}} {}\n",
            route, entry.count
        ));
        output.push_str(&format!(
            "podtato_http_request_duration_seconds_sum{{route=\"{}\"}} {:.6}\n",
            route, entry.sum
        ));
        output.push_str(&format!(
            "podtato_http_request_duration_seconds_count{{route=\"{}\"}} {}\n",
            route, entry.count
        ));
    }
}

fn append_peer_fetch_metrics(output: &mut String, peer_metrics: &[PeerFetchSnapshot]) {
    if peer_metrics.is_empty() {
        return;
    }

    output.push_str("# HELP podtato_peer_fetch_total Peer part fetch outcomes\n");
    output.push_str("# TYPE podtato_peer_fetch_total counter\n");
    for entry in peer_metrics {
        let service = bounded_label(&entry.service);
        output.push_str(&format!(
            "podtato_peer_fetch_total{{service=\"{}\",outcome=\"success\"}} {}\n",
            service, entry.success
        ));
        for (stage, total) in &entry.failures_by_stage {
            output.push_str(&format!(
                "podtato_peer_fetch_total{{service=\"{}\",outcome=\"failure\",stage=\"{}\"}} {}\n",
                service,
                bounded_label(stage),
                total
            ));
        }
    }
}

fn bounded_label(value: &str) -> String {
    const MAX_LEN: usize = 40;
    let trimmed: String = if value.len() <= MAX_LEN {
        value.to_string()
    } else {
        value.chars().take(MAX_LEN).collect()
    };
    trimmed.replace('\\', "\\\\").replace('"', "\\\"")
}
