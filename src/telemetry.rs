use crate::error::Result;
use chrono::{SecondsFormat, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self as stdfmt};
use std::sync::Mutex;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::field::{Field, Visit};
use tracing::Event;
use tracing::Subscriber;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::fmt::{
    self as fmt_subscriber, format::Writer, FmtContext, FormatEvent, FormatFields,
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

const APP_NAME: &str = "podtato";
pub(crate) const HTTP_DURATION_BUCKETS: [f64; 10] =
    [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

pub fn init_tracing() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("podtato=info,info"));

    let stdout = std::io::stdout;
    let stderr = std::io::stderr;

    // WARN and ERROR go to stderr, everything else to stdout
    let writer = stderr
        .with_max_level(tracing::Level::WARN)
        .or_else(stdout);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(false)
        .with_ansi(false)
        .event_format(KeyValueFormatter::new())
        .fmt_fields(fmt_subscriber::format::DefaultFields::new())
        .with_writer(writer)
        .try_init()
        .map_err(|err| crate::err!("failed to initialise tracing subscriber: {err}"))
}

/// Process identity goes under `app`; `service` is left to event fields naming a peer.
pub struct KeyValueFormatter {
    app_name: &'static str,
}

impl KeyValueFormatter {
    pub const fn new() -> Self {
        Self {
            app_name: APP_NAME,
        }
    }
}

impl Default for KeyValueFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, N> FormatEvent<S, N> for KeyValueFormatter
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let pid = std::process::id().to_string();
        let metadata = event.metadata();
        let component = metadata.target();

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let message = visitor
            .message
            .take()
            .unwrap_or_else(|| metadata.name().to_string());

        let mut fields = visitor.fields;
        fields.sort_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs));

        let span_path = current_span_path(ctx);

        let mut line = String::new();
        push_field(&mut line, "ts", &timestamp);
        push_field(&mut line, "level", metadata.level().as_str());
        push_field(&mut line, "app", self.app_name);
        push_field(&mut line, "component", component);
        push_field(&mut line, "pid", &pid);

        if let Some(span_path) = span_path {
            push_field(&mut line, "span", &span_path);
        }

        push_field(&mut line, "msg", &message);

        for (key, value) in fields {
            push_field(&mut line, &key, &value);
        }

        if let Some(file) = metadata.file() {
            push_field(&mut line, "file", file);
        }
        if let Some(line_no) = metadata.line() {
            push_field(&mut line, "line", &line_no.to_string());
        }

        writer.write_str(&line)?;
        writer.write_char('\n')
    }
}

fn current_span_path<S, N>(ctx: &FmtContext<'_, S, N>) -> Option<String>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    let span = ctx.lookup_current()?;
    let names: Vec<&str> = span.scope().from_root().map(|s| s.name()).collect();
    if names.is_empty() {
        None
    } else {
        Some(names.join("."))
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl FieldVisitor {
    fn record_field(&mut self, field: &Field, value: String) {
        if field.name().is_empty() {
            return;
        }
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_field(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn stdfmt::Debug) {
        self.record_field(field, format!("{value:?}"));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_field(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_field(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_field(field, value.to_string());
    }
}

#[derive(Default)]
pub struct RuntimeCounters {
    http_requests: HttpRequestMetrics,
    peer_fetches: PeerFetchRegistry,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequestCountSnapshot {
    pub route: String,
    pub status_code: u16,
    pub total: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HttpDurationSnapshot {
    pub route: String,
    pub buckets: Vec<(f64, u64)>,
    pub sum: f64,
    pub count: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HttpMetricsSnapshot {
    pub requests: Vec<HttpRequestCountSnapshot>,
    pub durations: Vec<HttpDurationSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerFetchSnapshot {
    pub service: String,
    pub success: u64,
    pub failures_by_stage: Vec<(String, u64)>,
}

#[derive(Default)]
struct HttpRequestMetrics {
    counts: Mutex<HashMap<(String, u16), u64>>,
    durations: Mutex<HashMap<String, HttpDurationBuckets>>,
}

impl HttpRequestMetrics {
    fn record(&self, route: &str, status: u16, duration: Duration) {
        let mut counts = self
            .counts
            .lock()
            .expect("http request counts lock poisoned");
        *counts.entry((route.to_string(), status)).or_insert(0) += 1;
        drop(counts);

        let mut durations = self
            .durations
            .lock()
            .expect("http request durations lock poisoned");
        let entry = durations.entry(route.to_string()).or_default();
        entry.observe(duration.as_secs_f64());
    }

    fn snapshot(&self) -> HttpMetricsSnapshot {
        let counts_guard = self
            .counts
            .lock()
            .expect("http request counts lock poisoned");
        let durations_guard = self
            .durations
            .lock()
            .expect("http request durations lock poisoned");

        let mut requests: Vec<HttpRequestCountSnapshot> = counts_guard
            .iter()
            .map(|((route, status), total)| HttpRequestCountSnapshot {
                route: route.clone(),
                status_code: *status,
                total: *total,
            })
            .collect();
        requests.sort_by(|a, b| (&a.route, a.status_code).cmp(&(&b.route, b.status_code)));

        let mut durations: Vec<HttpDurationSnapshot> = durations_guard
            .iter()
            .map(|(route, buckets)| HttpDurationSnapshot {
                route: route.clone(),
                buckets: buckets.histogram(),
                sum: buckets.sum,
                count: buckets.total,
            })
            .collect();
        durations.sort_by(|a, b| a.route.cmp(&b.route));

        HttpMetricsSnapshot {
            requests,
            durations,
        }
    }
}

#[derive(Default)]
struct HttpDurationBuckets {
    counts: [u64; HTTP_DURATION_BUCKETS.len()],
    sum: f64,
    total: u64,
}

impl HttpDurationBuckets {
    fn observe(&mut self, duration_secs: f64) {
        for (idx, boundary) in HTTP_DURATION_BUCKETS.iter().enumerate() {
            if duration_secs <= *boundary {
                self.counts[idx] += 1;
                break;
            }
        }
        self.sum += duration_secs;
        self.total += 1;
    }

    fn histogram(&self) -> Vec<(f64, u64)> {
        let mut cumulative = 0;
        HTTP_DURATION_BUCKETS
            .iter()
            .enumerate()
            .map(|(idx, boundary)| {
                cumulative += self.counts[idx];
                (*boundary, cumulative)
            })
            .collect()
    }
}

#[derive(Clone, Debug, Default)]
struct PeerFetchEntry {
    success: u64,
    failures: BTreeMap<String, u64>,
}

#[derive(Default)]
struct PeerFetchRegistry {
    inner: Mutex<BTreeMap<String, PeerFetchEntry>>,
}

impl PeerFetchRegistry {
    fn record_success(&self, service: &str) {
        let mut guard = self.inner.lock().expect("peer fetch registry poisoned");
        let entry = guard.entry(service.to_string()).or_default();
        entry.success = entry.success.saturating_add(1);
    }

    fn record_failure(&self, service: &str, stage: &str) {
        let mut guard = self.inner.lock().expect("peer fetch registry poisoned");
        let entry = guard.entry(service.to_string()).or_default();
        let counter = entry.failures.entry(stage.to_string()).or_insert(0);
        *counter = counter.saturating_add(1);
    }

    fn snapshot(&self) -> Vec<PeerFetchSnapshot> {
        let guard = self.inner.lock().expect("peer fetch registry poisoned");
        guard
            .iter()
            .map(|(service, entry)| PeerFetchSnapshot {
                service: service.clone(),
                success: entry.success,
                failures_by_stage: entry
                    .failures
                    .iter()
                    .map(|(stage, count)| (stage.clone(), *count))
                    .collect(),
            })
            .collect()
    }
}

static RUNTIME_COUNTERS: OnceLock<RuntimeCounters> = OnceLock::new();

pub fn runtime_counters() -> &'static RuntimeCounters {
    RUNTIME_COUNTERS.get_or_init(RuntimeCounters::default)
}

impl RuntimeCounters {
    pub fn record_http_request(&self, route: &str, status: u16, duration: Duration) {
        self.http_requests.record(route, status, duration);
    }

    pub fn http_metrics_snapshot(&self) -> HttpMetricsSnapshot {
        self.http_requests.snapshot()
    }

    pub fn record_peer_success(&self, service: &str) {
        self.peer_fetches.record_success(service);
    }

    pub fn record_peer_failure(&self, service: &str, stage: &str) {
        self.peer_fetches.record_failure(service, stage);
    }

    pub fn peer_fetch_snapshot(&self) -> Vec<PeerFetchSnapshot> {
        self.peer_fetches.snapshot()
    }
}

fn encode_field_value(value: &str) -> String {
    let needs_quotes = value.chars().any(|c| {
        c.is_whitespace()
            || matches!(
                c,
                '"' | '\\' | '=' | '[' | ']' | '{' | '}' | ',' | '\n' | '\r' | '\t'
            )
    });

    if !needs_quotes {
        return value.to_string();
    }

    let mut encoded = String::with_capacity(value.len() + 2);
    encoded.push('"');
    for ch in value.chars() {
        match ch {
            '"' => encoded.push_str("\\\""),
            '\\' => encoded.push_str("\\\\"),
            '\n' => encoded.push_str("\\n"),
            '\r' => encoded.push_str("\\r"),
            '\t' => encoded.push_str("\\t"),
            _ => encoded.push(ch),
        }
    }
    encoded.push('"');
    encoded
}

fn push_field(buffer: &mut String, key: &str, value: &str) {
    if !buffer.is_empty() {
        buffer.push(' ');
    }
    buffer.push_str(key);
    buffer.push('=');
    buffer.push_str(&encode_field_value(value));
}
