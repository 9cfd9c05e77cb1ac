//! handsoff-core — Frame embedding and touch classification engine.
//!
//! Uses MobileNetV2 via ONNX Runtime for feature extraction and an
//! in-memory k-nearest-neighbor classifier over the resulting embeddings.

pub mod embedder;
pub mod knn;
pub mod types;

pub use embedder::{EmbedderError, ImageEmbedder, MobileNetEmbedder};
pub use knn::{Classifier, ClassifierError, KnnClassifier, DEFAULT_K};
pub use types::{Embedding, Example, Label, Prediction};

use std::path::PathBuf;

/// Default directory searched for the MobileNet ONNX model.
pub fn default_model_dir() -> PathBuf {
    PathBuf::from("/usr/share/handsoff/models")
}
