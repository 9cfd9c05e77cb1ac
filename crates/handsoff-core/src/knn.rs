//! In-memory k-nearest-neighbor classifier over labeled embeddings.
//!
//! Examples accumulate for the process lifetime; classification takes the
//! k most cosine-similar stored examples and votes by label.

use crate::types::{Embedding, Example, Label, Prediction};
use std::collections::HashMap;
use thiserror::Error;

/// Number of neighbors consulted per prediction (clamped to the store size).
pub const DEFAULT_K: usize = 3;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("classifier has no training examples yet")]
    NotReady,
    #[error("embedding width mismatch: store holds {expected}-dim vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Strategy interface for the example store, so the control loop can be
/// exercised with a scripted fake in tests.
pub trait Classifier {
    fn add_example(&mut self, embedding: Embedding, label: Label) -> Result<(), ClassifierError>;
    fn predict(&self, embedding: &Embedding) -> Result<Prediction, ClassifierError>;
    /// Total stored examples across all labels.
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Example count per label, for status reporting.
    fn counts(&self) -> HashMap<Label, usize>;
}

/// Cosine-similarity k-NN over an append-only in-memory example store.
pub struct KnnClassifier {
    examples: Vec<Example>,
    k: usize,
}

impl KnnClassifier {
    pub fn new() -> Self {
        Self::with_k(DEFAULT_K)
    }

    pub fn with_k(k: usize) -> Self {
        Self {
            examples: Vec::new(),
            k: k.max(1),
        }
    }

    fn check_dim(&self, embedding: &Embedding) -> Result<(), ClassifierError> {
        if let Some(first) = self.examples.first() {
            let expected = first.embedding.dim();
            if embedding.dim() != expected {
                return Err(ClassifierError::DimensionMismatch {
                    expected,
                    actual: embedding.dim(),
                });
            }
        }
        Ok(())
    }
}

impl Default for KnnClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for KnnClassifier {
    fn add_example(&mut self, embedding: Embedding, label: Label) -> Result<(), ClassifierError> {
        self.check_dim(&embedding)?;
        self.examples.push(Example { embedding, label });
        Ok(())
    }

    /// Vote among the k most similar stored examples.
    ///
    /// Confidence per label = vote fraction, so confidences sum to 1 and
    /// each lies in [0, 1]. Ties break toward the more similar neighbor set
    /// because neighbors are taken in descending similarity order.
    fn predict(&self, embedding: &Embedding) -> Result<Prediction, ClassifierError> {
        if self.examples.is_empty() {
            return Err(ClassifierError::NotReady);
        }
        self.check_dim(embedding)?;

        let mut scored: Vec<(f32, Label)> = self
            .examples
            .iter()
            .map(|ex| (embedding.similarity(&ex.embedding), ex.label))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let k = self.k.min(scored.len());
        let mut votes: HashMap<Label, usize> = HashMap::new();
        for (_, label) in &scored[..k] {
            *votes.entry(*label).or_insert(0) += 1;
        }

        let confidences: HashMap<Label, f32> = votes
            .iter()
            .map(|(&label, &count)| (label, count as f32 / k as f32))
            .collect();

        // Winner = most votes; on a tie, the label of the single most
        // similar neighbor wins.
        let best_label = votes
            .iter()
            .max_by(|a, b| match a.1.cmp(b.1) {
                std::cmp::Ordering::Equal => {
                    let first = scored[..k].iter().position(|(_, l)| l == a.0);
                    let second = scored[..k].iter().position(|(_, l)| l == b.0);
                    second.cmp(&first)
                }
                ord => ord,
            })
            .map(|(&label, _)| label)
            .unwrap_or(scored[0].1);

        Ok(Prediction {
            label: best_label,
            confidences,
        })
    }

    fn len(&self) -> usize {
        self.examples.len()
    }

    fn counts(&self) -> HashMap<Label, usize> {
        let mut counts = HashMap::new();
        for ex in &self.examples {
            *counts.entry(ex.label).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(values: &[f32]) -> Embedding {
        Embedding {
            values: values.to_vec(),
            model_version: None,
        }
    }

    #[test]
    fn test_empty_store_not_ready() {
        let knn = KnnClassifier::new();
        let err = knn.predict(&emb(&[1.0, 0.0])).unwrap_err();
        assert!(matches!(err, ClassifierError::NotReady));
    }

    #[test]
    fn test_add_grows_store_by_one_each() {
        let mut knn = KnnClassifier::new();
        for i in 0..50 {
            knn.add_example(emb(&[i as f32, 1.0]), Label::NotTouching).unwrap();
            assert_eq!(knn.len(), i + 1);
        }
    }

    #[test]
    fn test_dimension_mismatch_on_add() {
        let mut knn = KnnClassifier::new();
        knn.add_example(emb(&[1.0, 0.0, 0.0]), Label::Touched).unwrap();
        let err = knn.add_example(emb(&[1.0, 0.0]), Label::Touched).unwrap_err();
        assert!(matches!(
            err,
            ClassifierError::DimensionMismatch { expected: 3, actual: 2 }
        ));
    }

    #[test]
    fn test_dimension_mismatch_on_predict() {
        let mut knn = KnnClassifier::new();
        knn.add_example(emb(&[1.0, 0.0, 0.0]), Label::Touched).unwrap();
        assert!(knn.predict(&emb(&[1.0])).is_err());
    }

    #[test]
    fn test_single_class_predicts_with_full_confidence() {
        let mut knn = KnnClassifier::new();
        for _ in 0..5 {
            knn.add_example(emb(&[0.0, 1.0]), Label::Touched).unwrap();
        }
        let p = knn.predict(&emb(&[0.1, 0.9])).unwrap();
        assert_eq!(p.label, Label::Touched);
        assert_eq!(p.confidence_for(Label::Touched), 1.0);
        assert_eq!(p.confidence_for(Label::NotTouching), 0.0);
    }

    #[test]
    fn test_majority_vote_wins() {
        let mut knn = KnnClassifier::with_k(3);
        // Two touched examples near the probe, one not-touching far away.
        knn.add_example(emb(&[1.0, 0.0]), Label::Touched).unwrap();
        knn.add_example(emb(&[0.9, 0.1]), Label::Touched).unwrap();
        knn.add_example(emb(&[0.0, 1.0]), Label::NotTouching).unwrap();

        let p = knn.predict(&emb(&[1.0, 0.05])).unwrap();
        assert_eq!(p.label, Label::Touched);
        assert!((p.confidence_for(Label::Touched) - 2.0 / 3.0).abs() < 1e-6);
        assert!((p.confidence_for(Label::NotTouching) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_k_clamped_to_store_size() {
        let mut knn = KnnClassifier::with_k(3);
        knn.add_example(emb(&[1.0, 0.0]), Label::NotTouching).unwrap();
        let p = knn.predict(&emb(&[1.0, 0.0])).unwrap();
        assert_eq!(p.label, Label::NotTouching);
        assert_eq!(p.confidence_for(Label::NotTouching), 1.0);
    }

    #[test]
    fn test_confidences_sum_to_one() {
        let mut knn = KnnClassifier::with_k(3);
        knn.add_example(emb(&[1.0, 0.0]), Label::Touched).unwrap();
        knn.add_example(emb(&[0.0, 1.0]), Label::NotTouching).unwrap();
        knn.add_example(emb(&[0.7, 0.7]), Label::Touched).unwrap();

        let p = knn.predict(&emb(&[0.5, 0.5])).unwrap();
        let total: f32 = p.confidences.values().sum();
        assert!((total - 1.0).abs() < 1e-6);
        for &c in p.confidences.values() {
            assert!((0.0..=1.0).contains(&c));
        }
    }

    #[test]
    fn test_counts_per_label() {
        let mut knn = KnnClassifier::new();
        for _ in 0..4 {
            knn.add_example(emb(&[1.0]), Label::NotTouching).unwrap();
        }
        for _ in 0..2 {
            knn.add_example(emb(&[0.5]), Label::Touched).unwrap();
        }
        let counts = knn.counts();
        assert_eq!(counts[&Label::NotTouching], 4);
        assert_eq!(counts[&Label::Touched], 2);
    }

    #[test]
    fn test_tie_breaks_toward_most_similar_neighbor() {
        let mut knn = KnnClassifier::with_k(2);
        knn.add_example(emb(&[1.0, 0.0]), Label::Touched).unwrap();
        knn.add_example(emb(&[0.0, 1.0]), Label::NotTouching).unwrap();

        // Probe closest to the touched example; 1-1 vote splits the pair.
        let p = knn.predict(&emb(&[0.9, 0.2])).unwrap();
        assert_eq!(p.label, Label::Touched);
    }
}
