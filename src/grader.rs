//! Similarity grading: embed two answers, compare, map to a feedback tier.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::FeedbackTier;
use crate::embeddings::{cosine_similarity, Embedder};
use crate::error::Result;

/// Scores strictly above this are `Correct`.
pub const CORRECT_THRESHOLD: f64 = 0.8;
/// Scores strictly above this (and not `Correct`) are `Partial`.
pub const PARTIAL_THRESHOLD: f64 = 0.5;

/// Map a similarity score to its tier. Thresholds are checked high to low.
pub fn tier_for(score: f64) -> FeedbackTier {
  if score > CORRECT_THRESHOLD {
    FeedbackTier::Correct
  } else if score > PARTIAL_THRESHOLD {
    FeedbackTier::Partial
  } else {
    FeedbackTier::Incorrect
  }
}

#[derive(Clone)]
pub struct SimilarityGrader {
  embedder: Arc<dyn Embedder>,
}

impl SimilarityGrader {
  pub fn new(embedder: Arc<dyn Embedder>) -> Self {
    Self { embedder }
  }

  #[instrument(level = "debug", skip(self, a, b), fields(model = %self.embedder.model_name(), a_len = a.len(), b_len = b.len()))]
  pub async fn score(&self, a: &str, b: &str) -> Result<f64> {
    let (va, vb) = tokio::try_join!(self.embedder.embed(a), self.embedder.embed(b))?;
    let score = cosine_similarity(&va, &vb);
    debug!(score, "Similarity computed");
    Ok(score)
  }

  pub async fn grade(&self, user_answer: &str, reference_answer: &str) -> Result<(f64, FeedbackTier)> {
    let score = self.score(user_answer, reference_answer).await?;
    Ok((score, tier_for(score)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::FakeEmbedder;

  #[test]
  fn tiers_use_strict_thresholds() {
    for s in [0.95, 0.8001] {
      assert_eq!(tier_for(s), FeedbackTier::Correct, "score {s}");
    }
    for s in [0.8, 0.51] {
      assert_eq!(tier_for(s), FeedbackTier::Partial, "score {s}");
    }
    for s in [0.5, 0.0, -1.0] {
      assert_eq!(tier_for(s), FeedbackTier::Incorrect, "score {s}");
    }
  }

  #[tokio::test]
  async fn grade_compares_both_embeddings() {
    let embedder = FakeEmbedder::new()
      .with("blue sky", vec![1.0, 0.0])
      .with("Rayleigh scattering", vec![0.6, 0.8]);
    let grader = SimilarityGrader::new(Arc::new(embedder));

    let (score, tier) = grader.grade("blue sky", "Rayleigh scattering").await.unwrap();
    assert!((score - 0.6).abs() < 1e-6);
    assert_eq!(tier, FeedbackTier::Partial);

    let (same, tier) = grader.grade("blue sky", "blue sky").await.unwrap();
    assert!((same - 1.0).abs() < 1e-9);
    assert_eq!(tier, FeedbackTier::Correct);
  }

  #[tokio::test]
  async fn embedding_failures_propagate() {
    let grader = SimilarityGrader::new(Arc::new(FakeEmbedder::new()));
    let err = grader.grade("unknown", "text").await.unwrap_err();
    assert_eq!(err.kind(), "embedding_service_error");
  }
}
