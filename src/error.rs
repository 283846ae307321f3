//! Error taxonomy for the prediction service
//!
//! Client-input errors (`ValidationError`, `BatchError`) never reach the
//! model. Server faults (`ModelError`) mean the service itself is broken.

use thiserror::Error;

/// A single record failed schema validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("record must be a JSON object")]
    NotAnObject,

    #[error("record is empty")]
    EmptyRecord,

    #[error("missing required fields: {}", .fields.join(", "))]
    MissingFields { fields: Vec<String> },

    #[error("field `{field}` must be numeric")]
    InvalidType { field: String },
}

impl ValidationError {
    /// Fields named by the error, if any.
    pub fn fields(&self) -> Vec<String> {
        match self {
            ValidationError::MissingFields { fields } => fields.clone(),
            ValidationError::InvalidType { field } => vec![field.clone()],
            ValidationError::NotAnObject | ValidationError::EmptyRecord => Vec::new(),
        }
    }
}

/// A submitted batch was rejected before inference
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BatchError {
    #[error("batch contains no records")]
    EmptyBatch,

    #[error("record {index}: {source}")]
    InvalidRecord {
        index: usize,
        #[source]
        source: ValidationError,
    },

    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

impl BatchError {
    /// Index of the offending record, if the error is record-specific.
    pub fn record_index(&self) -> Option<usize> {
        match self {
            BatchError::InvalidRecord { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            BatchError::EmptyBatch => "empty_batch",
            BatchError::MalformedBody(_) => "malformed_body",
            BatchError::InvalidRecord { source, .. } => match source {
                ValidationError::NotAnObject => "not_an_object",
                ValidationError::EmptyRecord => "empty_record",
                ValidationError::MissingFields { .. } => "missing_fields",
                ValidationError::InvalidType { .. } => "invalid_type",
            },
        }
    }
}

/// Model load or inference fault
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("model is not loaded")]
    NotLoaded,

    #[error("failed to load model: {0}")]
    Load(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Anything `predict` can fail with
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictError {
    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl PredictError {
    /// "Fix your request" as opposed to "the service is broken".
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::Batch(_))
    }

    /// HTTP status code this error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            PredictError::Batch(_) => 400,
            PredictError::Model(ModelError::NotLoaded) => 503,
            PredictError::Model(_) => 500,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::Batch(e) => e.kind(),
            PredictError::Model(ModelError::NotLoaded) => "model_not_loaded",
            PredictError::Model(ModelError::Load(_)) => "model_load_failed",
            PredictError::Model(ModelError::Inference(_)) => "inference_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let empty: PredictError = BatchError::EmptyBatch.into();
        assert_eq!(empty.status_code(), 400);
        assert!(empty.is_client_error());

        let not_loaded: PredictError = ModelError::NotLoaded.into();
        assert_eq!(not_loaded.status_code(), 503);
        assert!(!not_loaded.is_client_error());

        let fault: PredictError = ModelError::Inference("shape".to_string()).into();
        assert_eq!(fault.status_code(), 500);
    }

    #[test]
    fn test_invalid_record_message_names_fields() {
        let err = BatchError::InvalidRecord {
            index: 1,
            source: ValidationError::MissingFields {
                fields: vec!["age".to_string(), "chol".to_string()],
            },
        };

        assert_eq!(err.to_string(), "record 1: missing required fields: age, chol");
        assert_eq!(err.record_index(), Some(1));
        assert_eq!(err.kind(), "missing_fields");
    }
}
