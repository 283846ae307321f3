//! Classifier interface shared by all model backends

use crate::error::ModelError;

/// Row-major matrix of feature values, one row per record
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    /// Stack rows into a matrix. All rows must have the same width.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, ModelError> {
        let cols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);

        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(ModelError::Inference(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    cols
                )));
            }
            data.extend(row.iter().map(|&v| v as f32));
        }

        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// One row of the matrix.
    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.cols..(index + 1) * self.cols]
    }

    /// Flat row-major values.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Raw model output for a batch, aligned with the input rows
#[derive(Debug, Clone, PartialEq)]
pub struct ClassScores {
    /// Predicted class per row (0 or 1)
    pub labels: Vec<u8>,
    /// Positive-class probability per row
    pub probabilities: Vec<f64>,
}

impl ClassScores {
    /// Derive labels from probabilities with a decision threshold.
    ///
    /// A row is positive only when its probability is strictly above the
    /// threshold, matching argmax on a two-class probability vector.
    pub fn from_probabilities(probabilities: Vec<f64>, threshold: f64) -> Self {
        let labels = probabilities.iter().map(|&p| u8::from(p > threshold)).collect();
        Self {
            labels,
            probabilities,
        }
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Check the output lines up with `rows` inputs and holds valid values.
    pub fn check(&self, rows: usize) -> Result<(), ModelError> {
        if self.labels.len() != rows || self.probabilities.len() != rows {
            return Err(ModelError::Inference(format!(
                "model returned {} labels and {} probabilities for {} rows",
                self.labels.len(),
                self.probabilities.len(),
                rows
            )));
        }
        if let Some(label) = self.labels.iter().find(|&&l| l > 1) {
            return Err(ModelError::Inference(format!(
                "model returned non-binary label {}",
                label
            )));
        }
        if let Some(p) = self
            .probabilities
            .iter()
            .find(|p| !(0.0..=1.0).contains(*p))
        {
            return Err(ModelError::Inference(format!(
                "model returned probability {} outside [0, 1]",
                p
            )));
        }
        Ok(())
    }
}

/// Interface for binary classifiers
///
/// Implementations must be deterministic and must not change observable
/// state across calls: the same matrix always yields the same scores.
pub trait Classifier: Send + Sync {
    /// Score every row of the matrix.
    fn predict_batch(&self, matrix: &FeatureMatrix) -> Result<ClassScores, ModelError>;

    /// Backend name (e.g. "onnx")
    fn name(&self) -> &str;
}
