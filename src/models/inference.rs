//! Batch inference engine for heart disease prediction

use crate::error::{BatchError, PredictError};
use crate::models::classifier::FeatureMatrix;
use crate::models::handle::ModelHandle;
use crate::types::prediction::PredictionResult;
use crate::types::record::ValidatedRecord;
use crate::validator::FeatureValidator;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Validates a batch and scores it with a single model call.
///
/// Batches are all-or-nothing: the first invalid record fails the whole
/// batch and the model is never invoked.
pub struct InferenceEngine {
    validator: FeatureValidator,
    model: Arc<ModelHandle>,
}

impl InferenceEngine {
    /// Create an engine whose validator follows the model's feature order
    pub fn new(model: Arc<ModelHandle>) -> anyhow::Result<Self> {
        let names: Vec<&str> = model.feature_order().iter().map(|f| f.as_str()).collect();
        let validator = FeatureValidator::with_order(&names)?;
        Ok(Self { validator, model })
    }

    pub fn validator(&self) -> &FeatureValidator {
        &self.validator
    }

    /// Validate every record, stopping at the first failure.
    pub fn validate_batch(&self, records: &[Value]) -> Result<Vec<ValidatedRecord>, BatchError> {
        if records.is_empty() {
            return Err(BatchError::EmptyBatch);
        }

        records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                self.validator
                    .validate(record)
                    .map_err(|source| BatchError::InvalidRecord { index, source })
            })
            .collect()
    }

    /// Run inference on a batch of raw records
    pub fn infer(&self, records: &[Value]) -> Result<Vec<PredictionResult>, PredictError> {
        let validated = self.validate_batch(records)?;

        let rows: Vec<&[f64]> = validated.iter().map(|r| r.values()).collect();
        let matrix = FeatureMatrix::from_rows(&rows)?;
        let scores = self.model.predict_batch(&matrix)?;

        let results: Vec<PredictionResult> = scores
            .labels
            .iter()
            .zip(&scores.probabilities)
            .enumerate()
            .map(|(record_index, (&label, &probability))| PredictionResult {
                record_index,
                label,
                probability,
            })
            .collect();

        debug!(
            rows = results.len(),
            positive = results.iter().filter(|r| r.is_positive()).count(),
            "Batch inference complete"
        );

        Ok(results)
    }
}
