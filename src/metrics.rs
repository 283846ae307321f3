//! Prometheus metrics and periodic statistics for the prediction service.
//!
//! Every collector lives in a per-instance registry so the service facade
//! owns its counters; nothing is registered globally.

use crate::types::prediction::{PredictionResult, NEGATIVE_LABEL, POSITIVE_LABEL};
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Content type of the text exposition format
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Metrics collector for the prediction service
pub struct ServiceMetrics {
    registry: Registry,
    /// Requests by method, endpoint and HTTP status
    requests_total: IntCounterVec,
    /// Request latency by method and endpoint
    request_duration_seconds: HistogramVec,
    /// Predictions by predicted label
    predictions_total: IntCounterVec,
    /// Time spent validating and scoring a batch
    prediction_duration_seconds: Histogram,
    /// Distribution of positive-class probabilities
    prediction_probability: Histogram,
    /// Records per prediction request
    prediction_batch_size: Histogram,
    /// 1 when the model is ready, 0 otherwise
    model_loaded: IntGauge,
    /// Requests currently in flight
    active_requests: IntGauge,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    /// Create a new metrics collector with all collectors registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("api_requests_total", "Total API requests"),
            &["method", "endpoint", "status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("api_request_duration_seconds", "Request latency in seconds")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["method", "endpoint"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        let predictions_total = IntCounterVec::new(
            Opts::new("predictions_total", "Total predictions made"),
            &["label"],
        )?;
        registry.register(Box::new(predictions_total.clone()))?;

        let prediction_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("prediction_duration_seconds", "Prediction latency in seconds")
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5]),
        )?;
        registry.register(Box::new(prediction_duration_seconds.clone()))?;

        let prediction_probability = Histogram::with_opts(
            HistogramOpts::new(
                "prediction_probability",
                "Distribution of prediction probabilities",
            )
            .buckets(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]),
        )?;
        registry.register(Box::new(prediction_probability.clone()))?;

        let prediction_batch_size = Histogram::with_opts(
            HistogramOpts::new("prediction_batch_size", "Size of prediction batches").buckets(
                vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0],
            ),
        )?;
        registry.register(Box::new(prediction_batch_size.clone()))?;

        let model_loaded = IntGauge::with_opts(Opts::new(
            "model_loaded",
            "Whether the model is loaded (1) or not (0)",
        ))?;
        registry.register(Box::new(model_loaded.clone()))?;

        let active_requests = IntGauge::with_opts(Opts::new(
            "active_requests",
            "Number of requests currently being processed",
        ))?;
        registry.register(Box::new(active_requests.clone()))?;

        // Pre-create both label series so they render as 0 before traffic
        for label in [NEGATIVE_LABEL, POSITIVE_LABEL] {
            predictions_total.with_label_values(&[label.to_string().as_str()]);
        }

        Ok(Self {
            registry,
            requests_total,
            request_duration_seconds,
            predictions_total,
            prediction_duration_seconds,
            prediction_probability,
            prediction_batch_size,
            model_loaded,
            active_requests,
            start_time: Instant::now(),
        })
    }

    /// Record a finished request
    pub fn record_request(&self, method: &str, endpoint: &str, status: u16, duration: Duration) {
        let status = status.to_string();
        self.requests_total
            .with_label_values(&[method, endpoint, status.as_str()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration.as_secs_f64());
    }

    /// Record the submitted size of a prediction batch
    pub fn record_batch_size(&self, size: usize) {
        self.prediction_batch_size.observe(size as f64);
    }

    /// Record a successfully scored batch
    pub fn record_predictions(&self, predictions: &[PredictionResult], duration: Duration) {
        self.prediction_duration_seconds.observe(duration.as_secs_f64());

        for prediction in predictions {
            self.predictions_total
                .with_label_values(&[prediction.label.to_string().as_str()])
                .inc();
            self.prediction_probability.observe(prediction.probability);
        }
    }

    /// Update the model-loaded gauge
    pub fn set_model_loaded(&self, loaded: bool) {
        self.model_loaded.set(i64::from(loaded));
    }

    /// Count a request as in flight until the guard drops
    pub fn track_active(self: &Arc<Self>) -> ActiveRequestGuard {
        self.active_requests.inc();
        ActiveRequestGuard {
            metrics: Arc::clone(self),
        }
    }

    /// Requests recorded for one method/endpoint/status combination
    pub fn request_count(&self, method: &str, endpoint: &str, status: u16) -> u64 {
        let status = status.to_string();
        self.requests_total
            .with_label_values(&[method, endpoint, status.as_str()])
            .get()
    }

    /// Predictions recorded for one label
    pub fn prediction_count(&self, label: u8) -> u64 {
        self.predictions_total
            .with_label_values(&[label.to_string().as_str()])
            .get()
    }

    /// Predictions recorded across all labels
    pub fn total_predictions(&self) -> u64 {
        self.prediction_count(NEGATIVE_LABEL) + self.prediction_count(POSITIVE_LABEL)
    }

    pub fn active_requests(&self) -> i64 {
        self.active_requests.get()
    }

    /// Get current throughput (predictions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total_predictions() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Render all metrics in Prometheus text format. Reading never resets anything.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        match encoder.encode_to_string(&metric_families) {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Failed to encode metrics");
                String::new()
            }
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let positive = self.prediction_count(POSITIVE_LABEL);
        let negative = self.prediction_count(NEGATIVE_LABEL);
        let total = positive + negative;
        let positive_rate = if total > 0 {
            (positive as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        let batches = self.prediction_duration_seconds.get_sample_count();
        let mean_batch_ms = if batches > 0 {
            self.prediction_duration_seconds.get_sample_sum() / batches as f64 * 1000.0
        } else {
            0.0
        };

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║          HEART DISEASE API - METRICS SUMMARY                 ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Predictions: {:>8}  │  Throughput: {:>8.2} pred/s         ║",
            total,
            self.get_throughput()
        );
        info!(
            "║ Positive: {:>8} ({:>5.1}%)  │  Negative: {:>8}            ║",
            positive, positive_rate, negative
        );
        info!(
            "║ Batches: {:>8}  │  Mean batch latency: {:>8.3} ms         ║",
            batches, mean_batch_ms
        );
        info!(
            "║ Model loaded: {:>3}  │  Active requests: {:>4}                 ║",
            if self.model_loaded.get() == 1 { "yes" } else { "no" },
            self.active_requests()
        );
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

/// Decrements the active-request gauge on drop
pub struct ActiveRequestGuard {
    metrics: Arc<ServiceMetrics>,
}

impl Drop for ActiveRequestGuard {
    fn drop(&mut self) {
        self.metrics.active_requests.dec();
    }
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // first tick fires immediately; skip it so the first summary has data
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
