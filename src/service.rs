//! Service facade: the single boundary the HTTP transport calls into.
//!
//! The facade owns the model handle and the metrics registry, and it is the
//! only place where error kinds become status codes and counter updates.

use crate::config::ModelConfig;
use crate::error::{BatchError, ModelError, PredictError};
use crate::metrics::ServiceMetrics;
use crate::models::classifier::Classifier;
use crate::models::handle::{ModelHandle, ModelInfo, ModelState};
use crate::models::inference::InferenceEngine;
use crate::models::loader::ModelLoader;
use crate::types::prediction::{PredictResponse, PredictionMetadata};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Route recorded for prediction requests
pub const PREDICT_ENDPOINT: &str = "/predict";

/// Health status of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub model_loaded: bool,
    pub model_state: ModelState,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Readiness probe response
#[derive(Debug, Clone, Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub timestamp: DateTime<Utc>,
}

/// Prediction service: health, readiness, model info, predict and metrics
pub struct ServiceFacade {
    model: Arc<ModelHandle>,
    engine: InferenceEngine,
    metrics: Arc<ServiceMetrics>,
    started_at: Instant,
    version: String,
}

impl ServiceFacade {
    pub fn new(model: Arc<ModelHandle>, metrics: Arc<ServiceMetrics>) -> anyhow::Result<Self> {
        let engine = InferenceEngine::new(Arc::clone(&model))?;
        metrics.set_model_loaded(model.is_ready());

        Ok(Self {
            model,
            engine,
            metrics,
            started_at: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Load the ONNX artifact at the handle's path. Blocking.
    pub fn load_model(&self, config: &ModelConfig) -> ModelState {
        self.load_model_with(|path| {
            let loader = ModelLoader::with_threads(config.onnx_threads)?;
            let classifier = loader.load_classifier(path, config)?;
            let classifier: Arc<dyn Classifier> = Arc::new(classifier);
            Ok(classifier)
        })
    }

    /// Load the model with a custom loader and publish the outcome to metrics
    pub fn load_model_with<F>(&self, load: F) -> ModelState
    where
        F: FnOnce(&Path) -> anyhow::Result<Arc<dyn Classifier>>,
    {
        let state = self.model.load_with(load);
        self.metrics.set_model_loaded(state == ModelState::Ready);
        state
    }

    /// Healthy iff the model is ready. Never runs inference.
    pub fn health(&self) -> HealthReport {
        let model_state = self.model.state();
        let model_loaded = model_state == ModelState::Ready;

        HealthReport {
            status: if model_loaded {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            timestamp: Utc::now(),
            model_loaded,
            model_state,
            version: self.version.clone(),
            uptime_seconds: self.uptime_seconds(),
        }
    }

    pub fn readiness(&self) -> Readiness {
        Readiness {
            ready: self.model.is_ready(),
            timestamp: Utc::now(),
        }
    }

    pub fn model_info(&self) -> Result<ModelInfo, ModelError> {
        self.model.info().ok_or(ModelError::NotLoaded)
    }

    /// Validate and score a batch, updating request and prediction counters.
    pub fn predict(&self, records: &[Value]) -> Result<PredictResponse, PredictError> {
        let start = Instant::now();
        self.metrics.record_batch_size(records.len());

        match self.engine.infer(records) {
            Ok(predictions) => {
                let duration = start.elapsed();
                self.metrics.record_predictions(&predictions, duration);
                self.metrics
                    .record_request("POST", PREDICT_ENDPOINT, 200, duration);

                let response = PredictResponse {
                    metadata: PredictionMetadata {
                        count: predictions.len(),
                        duration_seconds: duration.as_secs_f64(),
                        timestamp: Utc::now(),
                        model_version: self.version.clone(),
                    },
                    predictions,
                };

                let positive = response.positive_count();
                info!(
                    num_samples = response.predictions.len(),
                    positive = positive,
                    negative = response.predictions.len() - positive,
                    mean_probability = response.mean_probability(),
                    duration_ms = duration.as_secs_f64() * 1000.0,
                    "Prediction completed"
                );

                Ok(response)
            }
            Err(e) => {
                let status = e.status_code();
                self.metrics
                    .record_request("POST", PREDICT_ENDPOINT, status, start.elapsed());

                if e.is_client_error() {
                    warn!(
                        num_samples = records.len(),
                        status = status,
                        error = %e,
                        "Prediction request rejected"
                    );
                } else {
                    error!(
                        num_samples = records.len(),
                        status = status,
                        error = %e,
                        "Prediction failed"
                    );
                }

                Err(e)
            }
        }
    }

    /// Count a prediction request whose body could not be decoded
    pub fn reject_malformed(&self, detail: impl Into<String>) -> PredictError {
        let err = PredictError::Batch(BatchError::MalformedBody(detail.into()));
        self.metrics
            .record_request("POST", PREDICT_ENDPOINT, err.status_code(), Default::default());
        warn!(error = %err, "Malformed prediction request");
        err
    }

    /// Prometheus text exposition of all counters
    pub fn metrics(&self) -> String {
        self.metrics.render()
    }

    pub fn service_metrics(&self) -> &Arc<ServiceMetrics> {
        &self.metrics
    }

    pub fn model(&self) -> &Arc<ModelHandle> {
        &self.model
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
