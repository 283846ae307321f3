//! Prediction request and response data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Positive (disease present) class label.
pub const POSITIVE_LABEL: u8 = 1;
/// Negative (no disease) class label.
pub const NEGATIVE_LABEL: u8 = 0;

/// Prediction request body: `{"data": [ {...}, ... ]}`
///
/// Records are kept as raw JSON so the validator can report missing
/// fields and bad types per record instead of failing the whole body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub data: Vec<Value>,
}

/// Prediction for one record of a batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Position of the record in the submitted batch
    pub record_index: usize,
    /// Predicted class (0 or 1)
    #[serde(rename = "prediction")]
    pub label: u8,
    /// Probability of the positive class (0.0 - 1.0)
    pub probability: f64,
}

impl PredictionResult {
    pub fn is_positive(&self) -> bool {
        self.label == POSITIVE_LABEL
    }
}

/// Batch-level information returned next to the predictions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionMetadata {
    /// Number of predictions returned
    pub count: usize,
    /// Wall time spent validating and scoring the batch
    pub duration_seconds: f64,
    /// Response generation timestamp
    pub timestamp: DateTime<Utc>,
    /// Service version that produced the predictions
    pub model_version: String,
}

/// Prediction response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<PredictionResult>,
    pub metadata: PredictionMetadata,
}

impl PredictResponse {
    pub fn positive_count(&self) -> usize {
        self.predictions.iter().filter(|p| p.is_positive()).count()
    }

    pub fn mean_probability(&self) -> f64 {
        if self.predictions.is_empty() {
            return 0.0;
        }
        self.predictions.iter().map(|p| p.probability).sum::<f64>() / self.predictions.len() as f64
    }
}
