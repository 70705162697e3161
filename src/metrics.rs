use crate::step::StepKind;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const LATENCY_WINDOW: usize = 256;

/// Sliding window of step execution times
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples: Arc<Mutex<VecDeque<u64>>>,
    capacity: usize,
}

impl LatencyWindow {
    /// Create a window holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    /// Record one execution time
    pub fn record(&self, elapsed: Duration) {
        let mut samples = self.samples.lock();
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(elapsed.as_nanos().min(u64::MAX as u128) as u64);
    }

    /// Latency at quantile `q` (0.0..=1.0) in microseconds
    pub fn quantile_us(&self, q: f64) -> f64 {
        let samples = self.samples.lock();
        if samples.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<u64> = samples.iter().copied().collect();
        sorted.sort_unstable();
        let rank = ((sorted.len() as f64 * q.clamp(0.0, 1.0)).ceil() as usize).saturating_sub(1);
        sorted[rank] as f64 / 1000.0
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }
}

/// Counters for one queued step, shared by every run of the queue
#[derive(Debug, Clone)]
pub struct StepMetrics {
    kind: StepKind,
    runs: Arc<AtomicU64>,
    skipped: Arc<AtomicU64>,
    elements_in: Arc<AtomicU64>,
    elements_out: Arc<AtomicU64>,
    latency: LatencyWindow,
}

impl StepMetrics {
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            runs: Arc::new(AtomicU64::new(0)),
            skipped: Arc::new(AtomicU64::new(0)),
            elements_in: Arc::new(AtomicU64::new(0)),
            elements_out: Arc::new(AtomicU64::new(0)),
            latency: LatencyWindow::new(LATENCY_WINDOW),
        }
    }

    /// Record one execution of the step
    pub fn record_run(&self, input_len: usize, output_len: usize, elapsed: Duration) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        self.elements_in.fetch_add(input_len as u64, Ordering::Relaxed);
        self.elements_out.fetch_add(output_len as u64, Ordering::Relaxed);
        self.latency.record(elapsed);
    }

    /// Record a run where the step was skipped by the empty-sequence short-circuit
    pub fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }

    pub fn total_runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    pub fn total_skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn total_in(&self) -> u64 {
        self.elements_in.load(Ordering::Relaxed)
    }

    pub fn total_out(&self) -> u64 {
        self.elements_out.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            kind: self.kind,
            runs: self.total_runs(),
            skipped: self.total_skipped(),
            elements_in: self.total_in(),
            elements_out: self.total_out(),
            latency_p50_us: self.latency.quantile_us(0.50),
            latency_p95_us: self.latency.quantile_us(0.95),
            latency_p99_us: self.latency.quantile_us(0.99),
        }
    }
}

/// Point-in-time copy of a step's counters
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub kind: StepKind,
    pub runs: u64,
    pub skipped: u64,
    pub elements_in: u64,
    pub elements_out: u64,
    pub latency_p50_us: f64,
    pub latency_p95_us: f64,
    pub latency_p99_us: f64,
}

impl MetricsSnapshot {
    /// Format as a single human-readable line
    pub fn format(&self) -> String {
        format!(
            "{}: Runs: {}, Skipped: {}, In: {}, Out: {}, \
             Latency P50: {:.2}µs, P95: {:.2}µs, P99: {:.2}µs",
            self.kind,
            self.runs,
            self.skipped,
            self.elements_in,
            self.elements_out,
            self.latency_p50_us,
            self.latency_p95_us,
            self.latency_p99_us
        )
    }
}
