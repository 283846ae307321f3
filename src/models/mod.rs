//! Classifier model components

pub mod classifier;
pub mod handle;
pub mod inference;
pub mod loader;
pub mod onnx;

pub use classifier::{ClassScores, Classifier, FeatureMatrix};
pub use handle::{ModelHandle, ModelInfo, ModelState};
pub use inference::InferenceEngine;
pub use loader::ModelLoader;
pub use onnx::OnnxClassifier;
