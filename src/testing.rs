//! Deterministic classifier and fixtures for unit tests

use crate::error::ModelError;
use crate::models::classifier::{ClassScores, Classifier, FeatureMatrix};
use serde_json::{json, Value};
use std::sync::Arc;

/// Logistic score over a fixed weighted sum of the row.
pub(crate) struct StubClassifier {
    fail: bool,
}

impl StubClassifier {
    pub(crate) fn shared() -> Arc<dyn Classifier> {
        Arc::new(Self { fail: false })
    }

    /// Classifier whose every call fails like a broken runtime would.
    pub(crate) fn failing() -> Arc<dyn Classifier> {
        Arc::new(Self { fail: true })
    }
}

impl Classifier for StubClassifier {
    fn predict_batch(&self, matrix: &FeatureMatrix) -> Result<ClassScores, ModelError> {
        if self.fail {
            return Err(ModelError::Inference("stub runtime failure".to_string()));
        }

        let probabilities = (0..matrix.rows())
            .map(|i| {
                let row = matrix.row(i);
                // age, cp, oldpeak, ca push risk up; thalach pulls it down
                let z = 0.06 * (row[0] as f64 - 55.0) + 0.4 * row[2] as f64
                    + 0.5 * row[9] as f64
                    + 0.6 * row[11] as f64
                    - 0.03 * (row[7] as f64 - 150.0)
                    - 1.0;
                1.0 / (1.0 + (-z).exp())
            })
            .collect();

        Ok(ClassScores::from_probabilities(probabilities, 0.5))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// The single-record example from the API docs.
pub(crate) fn sample_record() -> Value {
    json!({
        "age": 55, "sex": 1, "cp": 3, "trestbps": 140, "chol": 230,
        "fbs": 0, "restecg": 0, "thalach": 150, "exang": 0,
        "oldpeak": 1.0, "slope": 0, "ca": 0, "thal": 3
    })
}

/// A valid record with a distinct age, so batches can be told apart.
pub(crate) fn record_with_age(age: u32) -> Value {
    let mut record = sample_record();
    record["age"] = json!(age);
    record
}
