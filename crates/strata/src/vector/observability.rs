use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use parking_lot::Mutex;
use prometheus::{
    Counter, CounterVec, Encoder, Error, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use serde::{Deserialize, Serialize};

use strata_core::RetrievalMode;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub enum VectorErrorKind {
    Embedding,
    Qdrant(&'static str),
    Health,
}

impl VectorErrorKind {
    fn label(&self) -> &'static str {
        match self {
            VectorErrorKind::Embedding => "embedding",
            VectorErrorKind::Qdrant(_) => "qdrant",
            VectorErrorKind::Health => "health",
        }
    }
}

const METRIC_NAMESPACE: &str = "strata";
const METRIC_SUBSYSTEM: &str = "vector";
const LATENCY_BUCKETS: [f64; 11] = [
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0,
];

#[derive(Debug, Clone)]
pub struct VectorError {
    kind: VectorErrorKind,
    message: String,
}

impl VectorError {
    pub fn embedding(message: String) -> Self {
        Self {
            kind: VectorErrorKind::Embedding,
            message,
        }
    }

    pub fn qdrant(stage: &'static str, message: String) -> Self {
        Self {
            kind: VectorErrorKind::Qdrant(stage),
            message,
        }
    }

    pub fn health(message: String) -> Self {
        Self {
            kind: VectorErrorKind::Health,
            message,
        }
    }
}

impl fmt::Display for VectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            VectorErrorKind::Embedding => write!(f, "embedding error: {}", self.message),
            VectorErrorKind::Qdrant(stage) => {
                write!(f, "qdrant [{}] error: {}", stage, self.message)
            }
            VectorErrorKind::Health => write!(f, "health error: {}", self.message),
        }
    }
}

impl std::error::Error for VectorError {}

/// Prometheus view of embedding, store and search activity
#[derive(Debug)]
pub struct VectorMetrics {
    embedding_requests: Counter,
    embedding_latency: Histogram,
    qdrant_requests: Counter,
    qdrant_latency: Histogram,
    points_indexed: Counter,
    searches: CounterVec,
    errors: CounterVec,
}

impl VectorMetrics {
    pub fn register(registry: &Registry) -> Result<Arc<Self>, Error> {
        let embedding_requests = Counter::with_opts(Self::counter_opts(
            "embedding_requests_total",
            "Texts sent to the embedding service",
        ))?;
        registry.register(Box::new(embedding_requests.clone()))?;

        let embedding_latency = Histogram::with_opts(Self::histogram_opts(
            "embedding_latency_seconds",
            "Latency of embedding requests",
        ))?;
        registry.register(Box::new(embedding_latency.clone()))?;

        let qdrant_requests = Counter::with_opts(Self::counter_opts(
            "qdrant_requests_total",
            "Total Qdrant search and management calls",
        ))?;
        registry.register(Box::new(qdrant_requests.clone()))?;

        let qdrant_latency = Histogram::with_opts(Self::histogram_opts(
            "qdrant_latency_seconds",
            "Latency of Qdrant operations",
        ))?;
        registry.register(Box::new(qdrant_latency.clone()))?;

        let points_indexed = Counter::with_opts(Self::counter_opts(
            "points_indexed_total",
            "Points written by index builds",
        ))?;
        registry.register(Box::new(points_indexed.clone()))?;

        let searches = CounterVec::new(
            Self::counter_opts("searches_total", "Answered searches by retrieval mode"),
            &["mode"],
        )?;
        registry.register(Box::new(searches.clone()))?;

        let errors = CounterVec::new(
            Self::counter_opts("errors_total", "Vector pipeline errors by kind"),
            &["kind"],
        )?;
        registry.register(Box::new(errors.clone()))?;

        Ok(Arc::new(Self {
            embedding_requests,
            embedding_latency,
            qdrant_requests,
            qdrant_latency,
            points_indexed,
            searches,
            errors,
        }))
    }

    fn counter_opts(name: &str, help: &str) -> Opts {
        Opts::new(name, help)
            .namespace(METRIC_NAMESPACE)
            .subsystem(METRIC_SUBSYSTEM)
    }

    fn histogram_opts(name: &str, help: &str) -> HistogramOpts {
        HistogramOpts::new(name, help)
            .namespace(METRIC_NAMESPACE)
            .subsystem(METRIC_SUBSYSTEM)
            .buckets(LATENCY_BUCKETS.to_vec())
    }

    pub fn observe_embedding(&self, latency: Duration) {
        self.embedding_requests.inc();
        self.embedding_latency.observe(latency.as_secs_f64());
    }

    pub fn observe_qdrant(&self, latency: Duration) {
        self.qdrant_requests.inc();
        self.qdrant_latency.observe(latency.as_secs_f64());
    }

    pub fn record_points(&self, count: u64) {
        self.points_indexed.inc_by(count as f64);
    }

    pub fn record_search(&self, mode: RetrievalMode) {
        if let Ok(counter) = self.searches.get_metric_with_label_values(&[mode.as_str()]) {
            counter.inc();
        }
    }

    pub fn record_error(&self, kind: &VectorErrorKind) {
        if let Ok(counter) = self.errors.get_metric_with_label_values(&[kind.label()]) {
            counter.inc();
        }
    }
}

/// Prometheus text exposition of everything in `registry`
pub fn render_metrics(registry: &Registry) -> Result<String, Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| Error::Msg(err.to_string()))
}

#[derive(Debug, Default)]
pub struct VectorTelemetry {
    embedding_count: AtomicU64,
    embedding_ns: AtomicU64,
    qdrant_count: AtomicU64,
    qdrant_ns: AtomicU64,
    points_indexed: AtomicU64,
    searches: AtomicU64,
    errors: AtomicU64,
    last_error: Mutex<Option<String>>,
    metrics: Mutex<Option<Arc<VectorMetrics>>>,
}

impl VectorTelemetry {
    pub fn attach_metrics(&self, metrics: Arc<VectorMetrics>) {
        *self.metrics.lock() = Some(metrics);
    }

    pub fn record_embedding(&self, latency: Duration) {
        self.embedding_count.fetch_add(1, Ordering::Relaxed);
        self.embedding_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
        if let Some(metrics) = self.metrics_arc() {
            metrics.observe_embedding(latency);
        }
    }

    pub fn record_qdrant(&self, latency: Duration) {
        self.qdrant_count.fetch_add(1, Ordering::Relaxed);
        self.qdrant_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
        if let Some(metrics) = self.metrics_arc() {
            metrics.observe_qdrant(latency);
        }
    }

    pub fn record_points(&self, count: u64) {
        self.points_indexed.fetch_add(count, Ordering::Relaxed);
        if let Some(metrics) = self.metrics_arc() {
            metrics.record_points(count);
        }
    }

    pub fn record_search(&self, mode: RetrievalMode) {
        self.searches.fetch_add(1, Ordering::Relaxed);
        if let Some(metrics) = self.metrics_arc() {
            metrics.record_search(mode);
        }
    }

    pub fn record_error(&self, error: &VectorError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock() = Some(error.to_string());
        if let Some(metrics) = self.metrics_arc() {
            metrics.record_error(&error.kind);
        }
    }

    pub fn snapshot(&self) -> VectorTelemetrySnapshot {
        let embedding_total = self.embedding_count.load(Ordering::Relaxed);
        let embedding_latency = self.embedding_ns.load(Ordering::Relaxed);
        let qdrant_total = self.qdrant_count.load(Ordering::Relaxed);
        let qdrant_latency = self.qdrant_ns.load(Ordering::Relaxed);
        VectorTelemetrySnapshot {
            embeddings_total: embedding_total,
            avg_embedding_latency_ns: (embedding_total > 0)
                .then(|| embedding_latency / embedding_total),
            qdrant_calls: qdrant_total,
            avg_qdrant_latency_ns: (qdrant_total > 0).then(|| qdrant_latency / qdrant_total),
            points_indexed: self.points_indexed.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            last_error: self.last_error.lock().clone(),
        }
    }

    fn metrics_arc(&self) -> Option<Arc<VectorMetrics>> {
        self.metrics.lock().clone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorTelemetrySnapshot {
    pub embeddings_total: u64,
    pub avg_embedding_latency_ns: Option<u64>,
    pub qdrant_calls: u64,
    pub avg_qdrant_latency_ns: Option<u64>,
    pub points_indexed: u64,
    pub searches: u64,
    pub errors: u64,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
pub struct VectorHealth {
    last_success_ms: AtomicU64,
    last_failure_ms: AtomicU64,
    last_failure_message: Mutex<Option<String>>,
}

impl VectorHealth {
    pub fn record_success(&self) {
        self.last_success_ms.store(now_millis(), Ordering::Relaxed);
    }

    pub fn record_failure(&self, message: String) {
        self.last_failure_ms.store(now_millis(), Ordering::Relaxed);
        *self.last_failure_message.lock() = Some(message);
    }

    pub fn status(&self) -> VectorHealthStatus {
        let success = self.last_success_ms.load(Ordering::Relaxed);
        let failure = self.last_failure_ms.load(Ordering::Relaxed);
        VectorHealthStatus {
            healthy: success >= failure,
            last_success_ms: (success != 0).then_some(success),
            last_failure_ms: (failure != 0).then_some(failure),
            last_failure_message: self.last_failure_message.lock().clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorHealthStatus {
    pub healthy: bool,
    pub last_success_ms: Option<u64>,
    pub last_failure_ms: Option<u64>,
    pub last_failure_message: Option<String>,
}
