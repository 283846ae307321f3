//! ONNX model loader

use crate::config::ModelConfig;
use crate::models::onnx::OnnxClassifier;
use anyhow::{bail, Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::info;

/// Loaded ONNX session with the names of its inputs/outputs
pub struct LoadedSession {
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the feature tensor
    pub input_name: String,
    /// Output name for probabilities
    pub probability_output: String,
    /// Output name for predicted labels, if the model exposes one
    pub label_output: Option<String>,
}

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        // Initialize ONNX Runtime
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a single ONNX session from file
    pub fn load_session<P: AsRef<Path>>(&self, path: P) -> Result<LoadedSession> {
        let path = path.as_ref();

        if !path.exists() {
            bail!("model file not found: {}", path.display());
        }

        info!(path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        // Get input/output names
        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_names: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
        let probability_output = probability_output_name(&output_names);
        let label_output = output_names
            .iter()
            .find(|name| name.contains("label"))
            .map(|name| name.to_string());

        info!(
            input = %input_name,
            probabilities = %probability_output,
            label = ?label_output,
            "Model loaded successfully"
        );

        Ok(LoadedSession {
            session,
            input_name,
            probability_output,
            label_output,
        })
    }

    /// Load the classifier at `path`, one session per pool slot
    pub fn load_classifier(&self, path: &Path, config: &ModelConfig) -> Result<OnnxClassifier> {
        let pool_size = config.session_pool_size.max(1);
        let sessions = (0..pool_size)
            .map(|_| self.load_session(path))
            .collect::<Result<Vec<_>>>()?;

        let classifier = OnnxClassifier::new(sessions, config.decision_threshold)?;
        info!(
            path = %path.display(),
            sessions = classifier.pool_size(),
            "ONNX session pool ready"
        );
        Ok(classifier)
    }
}

/// Pick the probability output: a `prob` name first, then any output that
/// is not the label, then the last output.
fn probability_output_name(names: &[&str]) -> String {
    names
        .iter()
        .find(|name| name.contains("prob") && !name.contains("label"))
        .or_else(|| names.iter().find(|name| !name.contains("label")))
        .or_else(|| names.last())
        .map(|name| name.to_string())
        .unwrap_or_else(|| "probabilities".to_string())
}
