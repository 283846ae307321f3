//! Type definitions for the prediction service

pub mod prediction;
pub mod record;

pub use prediction::{PredictRequest, PredictResponse, PredictionMetadata, PredictionResult};
pub use record::{FeatureName, FeatureRecord, ValidatedRecord};
