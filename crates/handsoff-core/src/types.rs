use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Classification label for a frame: hands away from the face, or touching it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    NotTouching,
    Touched,
}

impl Label {
    /// Wire form used on D-Bus and in status payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::NotTouching => "not_touch",
            Label::Touched => "touched",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_touch" | "not-touch" | "idle" => Ok(Label::NotTouching),
            "touched" | "touch" => Ok(Label::Touched),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown label: {0} (expected \"not_touch\" or \"touched\")")]
pub struct UnknownLabel(pub String);

/// Image embedding vector (1280-dimensional for MobileNetV2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "mobilenet_v2_224").
    pub model_version: Option<String>,
}

impl Embedding {
    /// Compute cosine similarity between two embeddings.
    ///
    /// Returns a value in [-1, 1]. Higher = more similar.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 { dot / denom } else { 0.0 }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }
}

/// A labeled embedding accumulated during a training pass.
///
/// Examples are append-only for the process lifetime; insertion order is
/// preserved for diagnostics even though nearest-neighbor lookup ignores it.
#[derive(Debug, Clone)]
pub struct Example {
    pub embedding: Embedding,
    pub label: Label,
}

/// Result of classifying one frame: the winning label plus the confidence
/// the classifier assigns to each known label, in [0, 1].
#[derive(Debug, Clone)]
pub struct Prediction {
    pub label: Label,
    pub confidences: HashMap<Label, f32>,
}

impl Prediction {
    /// Confidence for a specific label; 0.0 if the label has no examples yet.
    pub fn confidence_for(&self, label: Label) -> f32 {
        self.confidences.get(&label).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = Embedding { values: vec![1.0, 0.0, 0.0], model_version: None };
        let b = Embedding { values: vec![1.0, 0.0, 0.0], model_version: None };
        assert!((a.similarity(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = Embedding { values: vec![1.0, 0.0], model_version: None };
        let b = Embedding { values: vec![0.0, 1.0], model_version: None };
        assert!(a.similarity(&b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = Embedding { values: vec![0.0, 0.0], model_version: None };
        let b = Embedding { values: vec![1.0, 0.0], model_version: None };
        assert_eq!(a.similarity(&b), 0.0);
    }

    #[test]
    fn test_label_round_trip() {
        for label in [Label::NotTouching, Label::Touched] {
            assert_eq!(label.as_str().parse::<Label>().unwrap(), label);
        }
    }

    #[test]
    fn test_label_unknown() {
        assert!("waving".parse::<Label>().is_err());
    }

    #[test]
    fn test_confidence_for_missing_label() {
        let p = Prediction {
            label: Label::NotTouching,
            confidences: HashMap::from([(Label::NotTouching, 1.0)]),
        };
        assert_eq!(p.confidence_for(Label::Touched), 0.0);
    }
}
