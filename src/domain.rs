//! Domain models: the active document, challenge items and their graded results.

use serde::Serialize;

use crate::util::take_chars;

/// Hard guard on how much of a document is sent to the completion service.
/// Measured in characters, not bytes.
pub const CONTEXT_CHAR_LIMIT: usize = 4000;

/// The document currently grounding a session's generative calls.
#[derive(Clone, Debug)]
pub struct DocumentContext {
  pub id: String,
  pub raw_text: String,
  pub truncated_context: String,
}

impl DocumentContext {
  pub fn new(id: impl Into<String>, raw_text: impl Into<String>) -> Self {
    let raw_text = raw_text.into();
    let truncated_context = take_chars(&raw_text, CONTEXT_CHAR_LIMIT).to_string();
    Self { id: id.into(), raw_text, truncated_context }
  }

  /// The context is always a prefix of the raw text, so any length difference means a cut.
  pub fn is_truncated(&self) -> bool {
    self.truncated_context.len() != self.raw_text.len()
  }
}

/// A generated comprehension question, pinned to the context it was generated from.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeItem {
  pub index: usize,
  pub question_text: String,
  pub source_context: String,
}

/// Discrete grade derived from a similarity score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackTier {
  Correct,
  Partial,
  Incorrect,
}

impl FeedbackTier {
  /// Human-readable feedback shown next to the grade.
  pub fn message(self) -> &'static str {
    match self {
      FeedbackTier::Correct => "Correct! Your answer is very similar to the information in the document.",
      FeedbackTier::Partial => "Partially correct. Your answer is on the right track but could be more precise.",
      FeedbackTier::Incorrect => "Incorrect. Your answer does not seem to align with the information in the document.",
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResult {
  pub item_index: usize,
  pub user_answer: String,
  pub reference_answer: String,
  pub similarity_score: f64,
  pub feedback_tier: FeedbackTier,
}

/// Grounded answer returned by `ask`.
#[derive(Clone, Debug, PartialEq)]
pub struct GroundedAnswer {
  pub answer: String,
  /// Sentence of the grounding context quoted by the answer, if any.
  pub justification: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UploadOutcome {
  pub document_id: String,
  pub summary: String,
}
