//! ONNX Runtime classifier backend

use crate::error::ModelError;
use crate::models::classifier::{ClassScores, Classifier, FeatureMatrix};
use crate::models::loader::LoadedSession;
use anyhow::{anyhow, bail, Result};
use ort::memory::Allocator;
use ort::session::SessionOutputs;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Binary classifier backed by a pool of ONNX Runtime sessions.
///
/// `Session::run` needs exclusive access, so each session sits behind its
/// own mutex and requests spread across the pool round-robin.
pub struct OnnxClassifier {
    sessions: Vec<Mutex<LoadedSession>>,
    next: AtomicUsize,
    /// Decision threshold used when the model exposes no label output
    threshold: f64,
}

impl OnnxClassifier {
    pub fn new(sessions: Vec<LoadedSession>, threshold: f64) -> Result<Self> {
        if sessions.is_empty() {
            bail!("ONNX classifier needs at least one session");
        }
        Ok(Self {
            sessions: sessions.into_iter().map(Mutex::new).collect(),
            next: AtomicUsize::new(0),
            threshold,
        })
    }

    /// Number of pooled sessions
    pub fn pool_size(&self) -> usize {
        self.sessions.len()
    }

    fn acquire(&self) -> Result<MutexGuard<'_, LoadedSession>, ModelError> {
        let start = self.next.fetch_add(1, Ordering::Relaxed);
        let count = self.sessions.len();

        for offset in 0..count {
            if let Ok(guard) = self.sessions[(start + offset) % count].try_lock() {
                return Ok(guard);
            }
        }

        // Every session busy: wait on our round-robin slot
        self.sessions[start % count]
            .lock()
            .map_err(|_| ModelError::Inference("ONNX session lock poisoned".to_string()))
    }
}

impl Classifier for OnnxClassifier {
    fn predict_batch(&self, matrix: &FeatureMatrix) -> Result<ClassScores, ModelError> {
        let rows = matrix.rows();
        let shape = vec![rows as i64, matrix.cols() as i64];
        let input_tensor = Tensor::from_array((shape, matrix.as_slice().to_vec()))
            .map_err(|e| ModelError::Inference(format!("failed to create input tensor: {}", e)))?;

        let mut guard = self.acquire()?;
        let LoadedSession {
            session,
            input_name,
            probability_output,
            label_output,
        } = &mut *guard;

        let outputs = session
            .run(ort::inputs![input_name.as_str() => input_tensor])
            .map_err(|e| ModelError::Inference(e.to_string()))?;

        let probabilities = extract_probabilities(&outputs, probability_output, rows)?;

        let scores = match label_output
            .as_deref()
            .and_then(|name| extract_labels(&outputs, name, rows))
        {
            Some(labels) => ClassScores {
                labels,
                probabilities,
            },
            None => ClassScores::from_probabilities(probabilities, self.threshold),
        };

        debug!(rows = rows, "ONNX batch inference complete");
        Ok(scores)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

/// Extract positive-class probabilities for every row.
/// Handles tensor outputs (XGBoost, RandomForest) and seq(map) outputs (scikit-learn zipmap).
fn extract_probabilities(
    outputs: &SessionOutputs,
    output_name: &str,
    rows: usize,
) -> Result<Vec<f64>, ModelError> {
    if let Some(output) = outputs.get(output_name) {
        if let Some(probabilities) = probabilities_from_value(output, rows) {
            return Ok(probabilities);
        }
    }

    // Fallback: first non-label output that yields one probability per row
    for (name, output) in outputs.iter() {
        if name.contains("label") {
            continue;
        }
        if let Some(probabilities) = probabilities_from_value(&output, rows) {
            debug!(output = %name, "Extracted probabilities (fallback)");
            return Ok(probabilities);
        }
    }

    Err(ModelError::Inference(format!(
        "could not extract {} probabilities from model outputs",
        rows
    )))
}

fn probabilities_from_value(output: &DynValue, rows: usize) -> Option<Vec<f64>> {
    let dtype = output.dtype();

    if let Ok(tensor) = output.try_extract_tensor::<f32>() {
        let (shape, data) = tensor;
        let dims: Vec<i64> = shape.iter().copied().collect();
        return positive_class_column(&dims, data, rows);
    }

    if DynSequenceValueType::can_downcast(&dtype) {
        return sequence_map_probabilities(output, rows).ok();
    }

    None
}

/// Pick the positive-class column out of a probability tensor
fn positive_class_column(dims: &[i64], data: &[f32], rows: usize) -> Option<Vec<f64>> {
    match dims {
        // [batch, num_classes]: class 1 is column 1
        [batch, classes] if *batch as usize == rows && *classes >= 2 => {
            let classes = *classes as usize;
            if data.len() < rows * classes {
                return None;
            }
            Some((0..rows).map(|i| data[i * classes + 1] as f64).collect())
        }
        // [batch, 1] or [batch]: one probability per row
        [batch, 1] | [batch] if *batch as usize == rows && data.len() >= rows => {
            Some(data[..rows].iter().map(|&v| v as f64).collect())
        }
        _ => None,
    }
}

/// Extract probabilities from seq(map(int64, float)), one map per row
fn sequence_map_probabilities(output: &DynValue, rows: usize) -> Result<Vec<f64>> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow!("Failed to downcast to sequence: {}", e))?;
    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

    if maps.len() != rows {
        bail!("expected {} probability maps, got {}", rows, maps.len());
    }

    maps.iter()
        .map(|map_value| {
            let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

            if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 1) {
                return Ok(*prob as f64);
            }
            // Only class 0 present: invert it
            if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 0) {
                return Ok(1.0 - *prob as f64);
            }
            Err(anyhow!("No probability found in map"))
        })
        .collect()
}

/// Read the int64 label output, if it lines up with the batch
fn extract_labels(outputs: &SessionOutputs, output_name: &str, rows: usize) -> Option<Vec<u8>> {
    let output = outputs.get(output_name)?;
    let (_, data) = output.try_extract_tensor::<i64>().ok()?;
    binary_labels(data, rows)
}

/// Labels are usable only if there is one per row and each is 0 or 1
fn binary_labels(data: &[i64], rows: usize) -> Option<Vec<u8>> {
    if data.len() != rows {
        return None;
    }
    data.iter().map(|&label| u8::try_from(label).ok().filter(|l| *l <= 1)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_class_tensor_takes_column_one() {
        let data = [0.9, 0.1, 0.3, 0.7, 0.5, 0.5];
        let probs = positive_class_column(&[3, 2], &data, 3).unwrap();
        assert_eq!(probs, vec![0.1f32 as f64, 0.7f32 as f64, 0.5]);
    }

    #[test]
    fn test_multi_class_tensor_takes_column_one() {
        let data = [0.2, 0.6, 0.2, 0.1, 0.1, 0.8];
        let probs = positive_class_column(&[2, 3], &data, 2).unwrap();
        assert_eq!(probs, vec![0.6f32 as f64, 0.1f32 as f64]);
    }

    #[test]
    fn test_single_column_and_flat_tensors() {
        let data = [0.25, 0.75];
        assert_eq!(positive_class_column(&[2, 1], &data, 2), Some(vec![0.25, 0.75]));
        assert_eq!(positive_class_column(&[2], &data, 2), Some(vec![0.25, 0.75]));
    }

    #[test]
    fn test_tensor_shape_mismatch_rejected() {
        // wrong batch dimension
        assert!(positive_class_column(&[3, 2], &[0.5; 6], 2).is_none());
        // data shorter than the declared shape
        assert!(positive_class_column(&[2, 2], &[0.5; 3], 2).is_none());
        assert!(positive_class_column(&[2], &[0.5], 2).is_none());
        // unsupported rank
        assert!(positive_class_column(&[1, 2, 2], &[0.5; 4], 1).is_none());
    }

    #[test]
    fn test_binary_labels() {
        assert_eq!(binary_labels(&[0, 1, 1], 3), Some(vec![0, 1, 1]));
        assert_eq!(binary_labels(&[0, 1], 3), None);
        assert_eq!(binary_labels(&[0, 2], 2), None);
        assert_eq!(binary_labels(&[-1], 1), None);
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert!(OnnxClassifier::new(Vec::new(), 0.5).is_err());
    }
}
