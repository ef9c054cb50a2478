//! Performance metrics for the classification pipeline.

use crate::error::PipelineStage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Processing time window kept for percentiles
const MAX_TIMINGS: usize = 10_000;

/// Metrics collector for pipeline performance
pub struct PipelineMetrics {
    /// Successful classifications
    pub classifications: AtomicU64,
    /// Failed classifications
    pub failures: AtomicU64,
    /// Failures by pipeline stage
    failures_by_stage: RwLock<HashMap<&'static str, u64>>,
    /// Predictions by label
    predictions_by_label: RwLock<HashMap<String, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            classifications: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            failures_by_stage: RwLock::new(HashMap::new()),
            predictions_by_label: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a successful classification
    pub fn record_classification(&self, processing_time: Duration, label: &str) {
        self.classifications.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            if times.len() > MAX_TIMINGS {
                times.drain(0..MAX_TIMINGS / 2);
            }
        }

        if let Ok(mut by_label) = self.predictions_by_label.write() {
            *by_label.entry(label.to_string()).or_insert(0) += 1;
        }
    }

    /// Record a failed classification
    pub fn record_failure(&self, stage: PipelineStage) {
        self.failures.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_stage) = self.failures_by_stage.write() {
            *by_stage.entry(stage.as_str()).or_insert(0) += 1;
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = match self.processing_times.read() {
            Ok(times) => times.clone(),
            Err(_) => return ProcessingStats::default(),
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted = times;
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (classifications per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.classifications.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get predictions by label
    pub fn get_predictions_by_label(&self) -> HashMap<String, u64> {
        self.predictions_by_label
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Get failures by stage
    pub fn get_failures_by_stage(&self) -> HashMap<&'static str, u64> {
        self.failures_by_stage
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let ok = self.classifications.load(Ordering::Relaxed);
        let failed = self.failures.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();

        info!(
            classifications = ok,
            failures = failed,
            throughput = format!("{:.2}/s", self.get_throughput()),
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            "Pipeline metrics"
        );

        let mut by_label: Vec<(String, u64)> = self.get_predictions_by_label().into_iter().collect();
        by_label.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        for (label, count) in by_label {
            let pct = if ok > 0 {
                count as f64 / ok as f64 * 100.0
            } else {
                0.0
            };
            info!(label = %label, count = count, share = format!("{:.1}%", pct), "Predictions by label");
        }

        for (stage, count) in self.get_failures_by_stage() {
            info!(stage = stage, count = count, "Failures by stage");
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: std::sync::Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: std::sync::Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
