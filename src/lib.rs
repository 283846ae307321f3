//! Heart Disease Prediction API Library
//!
//! Validates clinical feature records, scores them in batches with a
//! pre-trained binary classifier, and serves the results over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod service;
pub mod types;
pub mod validator;

#[cfg(test)]
mod testing;

pub use config::AppConfig;
pub use error::{BatchError, ModelError, PredictError, ValidationError};
pub use metrics::ServiceMetrics;
pub use models::{InferenceEngine, ModelHandle, ModelState};
pub use service::ServiceFacade;
pub use types::{FeatureName, FeatureRecord, PredictRequest, PredictResponse, PredictionResult};
pub use validator::FeatureValidator;
