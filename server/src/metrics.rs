// Per-relay request counters and latency tracking

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

const MAX_LATENCY_SAMPLES: usize = 1000;

/// Counters for one relay endpoint. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct RelayEndpointMetrics {
    requests: Arc<AtomicU64>,
    errors: Arc<AtomicU64>,
    upstream_errors: Arc<AtomicU64>,
    timed_requests: Arc<AtomicU64>,
    total_latency_ms: Arc<AtomicU64>,
    max_latency_ms: Arc<AtomicU64>,
    samples: Arc<Mutex<VecDeque<u64>>>,
}

impl RelayEndpointMetrics {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(AtomicU64::new(0)),
            errors: Arc::new(AtomicU64::new(0)),
            upstream_errors: Arc::new(AtomicU64::new(0)),
            timed_requests: Arc::new(AtomicU64::new(0)),
            total_latency_ms: Arc::new(AtomicU64::new(0)),
            max_latency_ms: Arc::new(AtomicU64::new(0)),
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LATENCY_SAMPLES))),
        }
    }

    /// Start timing a request. The latency is recorded by [`RequestTimer::finish`].
    pub fn start(&self) -> RequestTimer<'_> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        RequestTimer {
            metrics: self,
            started: Instant::now(),
        }
    }

    pub fn record_latency(&self, latency_ms: u64) {
        self.timed_requests.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.max_latency_ms.fetch_max(latency_ms, Ordering::Relaxed);

        if let Ok(mut samples) = self.samples.lock() {
            if samples.len() == MAX_LATENCY_SAMPLES {
                samples.pop_front();
            }
            samples.push_back(latency_ms);
        }
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// An error reported by the upstream AI service (as opposed to bad input).
    pub fn record_upstream_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        self.upstream_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    fn percentile(&self, p: usize) -> u64 {
        let Ok(samples) = self.samples.lock() else {
            return 0;
        };
        if samples.is_empty() {
            return 0;
        }
        let mut sorted: Vec<u64> = samples.iter().copied().collect();
        sorted.sort_unstable();
        let index = (sorted.len() * p / 100).min(sorted.len() - 1);
        sorted[index]
    }

    pub fn stats(&self) -> EndpointStats {
        let timed = self.timed_requests.load(Ordering::Relaxed);
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        EndpointStats {
            request_count: self.request_count(),
            error_count: self.error_count(),
            upstream_error_count: self.upstream_errors.load(Ordering::Relaxed),
            avg_latency_ms: if timed == 0 { 0.0 } else { total as f64 / timed as f64 },
            max_latency_ms: self.max_latency_ms.load(Ordering::Relaxed),
            p50_latency_ms: self.percentile(50),
            p95_latency_ms: self.percentile(95),
        }
    }
}

impl Default for RelayEndpointMetrics {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RequestTimer<'a> {
    metrics: &'a RelayEndpointMetrics,
    started: Instant,
}

impl RequestTimer<'_> {
    pub fn finish(self) {
        self.metrics
            .record_latency(self.started.elapsed().as_millis() as u64);
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelayMetrics {
    pub chat: RelayEndpointMetrics,
    pub tts: RelayEndpointMetrics,
    pub stt: RelayEndpointMetrics,
    tts_audio_bytes: Arc<AtomicU64>,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tts_audio(&self, bytes: usize) {
        self.tts_audio_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.chat.request_count() + self.tts.request_count() + self.stt.request_count()
    }

    pub fn snapshot(&self, system: SystemMetrics) -> MetricsResponse {
        MetricsResponse {
            timestamp: Utc::now(),
            system,
            relays: RelayStats {
                chat: self.chat.stats(),
                tts: self.tts.stats(),
                stt: self.stt.stats(),
            },
            tts_audio_bytes: self.tts_audio_bytes.load(Ordering::Relaxed),
        }
    }
}

#[derive(Serialize)]
pub struct MetricsResponse {
    pub timestamp: DateTime<Utc>,
    pub system: SystemMetrics,
    pub relays: RelayStats,
    pub tts_audio_bytes: u64,
}

#[derive(Serialize)]
pub struct SystemMetrics {
    pub cpu_usage_percent: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub memory_usage_percent: f32,
    pub request_count: u64,
    pub uptime_seconds: u64,
    pub system_load: Option<f64>,
}

#[derive(Serialize)]
pub struct RelayStats {
    pub chat: EndpointStats,
    pub tts: EndpointStats,
    pub stt: EndpointStats,
}

#[derive(Debug, Serialize)]
pub struct EndpointStats {
    pub request_count: u64,
    pub error_count: u64,
    pub upstream_error_count: u64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: u64,
    pub p50_latency_ms: u64,
    pub p95_latency_ms: u64,
}
