//! Shared, read-only handle to the loaded classifier

use crate::error::ModelError;
use crate::models::classifier::{ClassScores, Classifier, FeatureMatrix};
use crate::types::record::FeatureName;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{error, info};

/// Model lifecycle: `Unloaded -> Loading -> Ready | Failed`.
///
/// `Ready` and `Failed` are terminal for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelState {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

impl ModelState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ModelState::Unloaded,
            1 => ModelState::Loading,
            2 => ModelState::Ready,
            _ => ModelState::Failed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ModelState::Unloaded => 0,
            ModelState::Loading => 1,
            ModelState::Ready => 2,
            ModelState::Failed => 3,
        }
    }
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModelState::Unloaded => "unloaded",
            ModelState::Loading => "loading",
            ModelState::Ready => "ready",
            ModelState::Failed => "failed",
        };
        f.write_str(s)
    }
}

struct LoadedArtifact {
    classifier: Arc<dyn Classifier>,
    loaded_at: DateTime<Utc>,
}

/// Introspection data for `/model/info`
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub path: PathBuf,
    pub feature_order: Vec<&'static str>,
    pub n_features: usize,
    pub loaded_at: DateTime<Utc>,
    pub state: ModelState,
}

/// Owns the classifier artifact once loaded.
///
/// The artifact is written exactly once; every later read is lock-free.
pub struct ModelHandle {
    path: PathBuf,
    feature_order: Vec<FeatureName>,
    state: AtomicU8,
    artifact: OnceLock<LoadedArtifact>,
    failure: OnceLock<String>,
}

impl ModelHandle {
    /// Create an unloaded handle for the artifact at `path`
    pub fn new<P: Into<PathBuf>>(path: P, feature_order: Vec<FeatureName>) -> Self {
        Self {
            path: path.into(),
            feature_order,
            state: AtomicU8::new(ModelState::Unloaded.as_u8()),
            artifact: OnceLock::new(),
            failure: OnceLock::new(),
        }
    }

    /// Create a handle that is already `Ready` with the given classifier
    pub fn with_classifier<P: Into<PathBuf>>(
        path: P,
        feature_order: Vec<FeatureName>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        let handle = Self::new(path, feature_order);
        handle.load_with(|_| Ok(classifier));
        handle
    }

    /// Load the artifact using `load`. Only the first call does any work;
    /// later calls return the current state without loading again.
    pub fn load_with<F>(&self, load: F) -> ModelState
    where
        F: FnOnce(&Path) -> anyhow::Result<Arc<dyn Classifier>>,
    {
        if self
            .state
            .compare_exchange(
                ModelState::Unloaded.as_u8(),
                ModelState::Loading.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return self.state();
        }

        info!(model_path = %self.path.display(), "Loading model artifact");

        match load(&self.path) {
            Ok(classifier) => {
                let backend = classifier.name().to_string();
                let _ = self.artifact.set(LoadedArtifact {
                    classifier,
                    loaded_at: Utc::now(),
                });
                self.state.store(ModelState::Ready.as_u8(), Ordering::Release);
                info!(model_path = %self.path.display(), backend = %backend, "Model ready");
                ModelState::Ready
            }
            Err(e) => {
                let _ = self.failure.set(format!("{:#}", e));
                self.state.store(ModelState::Failed.as_u8(), Ordering::Release);
                error!(model_path = %self.path.display(), error = %format!("{:#}", e), "Model load failed");
                ModelState::Failed
            }
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ModelState {
        ModelState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ModelState::Ready
    }

    /// Why loading failed, if it did
    pub fn failure(&self) -> Option<&str> {
        self.failure.get().map(String::as_str)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn feature_order(&self) -> &[FeatureName] {
        &self.feature_order
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.ready_artifact().map(|a| a.loaded_at)
    }

    fn ready_artifact(&self) -> Option<&LoadedArtifact> {
        if self.is_ready() {
            self.artifact.get()
        } else {
            None
        }
    }

    /// Score a matrix whose columns follow `feature_order`.
    pub fn predict_batch(&self, matrix: &FeatureMatrix) -> Result<ClassScores, ModelError> {
        let artifact = self.ready_artifact().ok_or(ModelError::NotLoaded)?;

        if matrix.cols() != self.feature_order.len() {
            return Err(ModelError::Inference(format!(
                "matrix has {} columns, model expects {}",
                matrix.cols(),
                self.feature_order.len()
            )));
        }

        let scores = artifact.classifier.predict_batch(matrix)?;
        scores.check(matrix.rows())?;
        Ok(scores)
    }

    /// Model metadata; `None` until the model is ready
    pub fn info(&self) -> Option<ModelInfo> {
        let artifact = self.ready_artifact()?;
        Some(ModelInfo {
            model_type: artifact.classifier.name().to_string(),
            path: self.path.clone(),
            feature_order: self.feature_order.iter().map(|f| f.as_str()).collect(),
            n_features: self.feature_order.len(),
            loaded_at: artifact.loaded_at,
            state: self.state(),
        })
    }
}
