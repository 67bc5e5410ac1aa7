//! Error taxonomy for the assistant core.
//!
//! Every failure coming from an external collaborator (text extraction,
//! completion service, embedding service) is surfaced as one of these
//! variants, wrapped with context but never replaced by a default value.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssistantError {
  #[error("No document has been uploaded yet. Please upload a document first.")]
  NoActiveDocument,

  #[error("Unsupported file type: {0}. Upload a .pdf or .txt file.")]
  UnsupportedFileType(String),

  #[error("Could not extract text from the document. It might be empty or scanned.")]
  EmptyExtraction,

  #[error("Failed to read the document: {0}")]
  ExtractionFailed(String),

  #[error("Completion service returned HTTP {status_code}: {body}")]
  CompletionServiceError { status_code: u16, body: String },

  #[error("Completion service unreachable: {0}")]
  CompletionTransport(String),

  #[error("Completion service returned an unreadable response: {0}")]
  CompletionMalformed(String),

  #[error("Failed to generate questions: {0}")]
  GenerationFailed(#[source] Box<AssistantError>),

  #[error("Embedding service error: {0}")]
  EmbeddingServiceError(String),

  #[error("Unknown challenge item: {0}")]
  UnknownChallengeItem(usize),

  #[error("Your answer is empty. Please write an answer before submitting.")]
  EmptyAnswer,

  #[error("No question provided.")]
  EmptyQuestion,

  #[error("The document was replaced while this request was in progress.")]
  StaleDocument,

  #[error("The challenge was regenerated while this answer was being graded.")]
  StaleChallenge,

  #[error("Too many open sessions (limit {0}). Close a session or try again later.")]
  TooManySessions(usize),

  #[error("Unknown session: {0}")]
  UnknownSession(String),

  #[error("Configuration error: {0}")]
  Configuration(String),
}

impl AssistantError {
  /// Stable machine-readable name, used in HTTP error bodies and logs.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::NoActiveDocument => "no_active_document",
      Self::UnsupportedFileType(_) => "unsupported_file_type",
      Self::EmptyExtraction => "empty_extraction",
      Self::ExtractionFailed(_) => "extraction_failed",
      Self::CompletionServiceError { .. } => "completion_service_error",
      Self::CompletionTransport(_) => "completion_transport",
      Self::CompletionMalformed(_) => "completion_malformed",
      Self::GenerationFailed(_) => "generation_failed",
      Self::EmbeddingServiceError(_) => "embedding_service_error",
      Self::UnknownChallengeItem(_) => "unknown_challenge_item",
      Self::EmptyAnswer => "empty_answer",
      Self::EmptyQuestion => "empty_question",
      Self::StaleDocument => "stale_document",
      Self::StaleChallenge => "stale_challenge",
      Self::TooManySessions(_) => "too_many_sessions",
      Self::UnknownSession(_) => "unknown_session",
      Self::Configuration(_) => "configuration",
    }
  }
}

pub type Result<T> = std::result::Result<T, AssistantError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generation_failure_keeps_the_completion_error_as_source() {
    let inner = AssistantError::CompletionServiceError { status_code: 503, body: "overloaded".into() };
    let err = AssistantError::GenerationFailed(Box::new(inner));

    let source = std::error::Error::source(&err).map(|s| s.to_string());
    assert_eq!(source.as_deref(), Some("Completion service returned HTTP 503: overloaded"));
    assert!(err.to_string().contains("HTTP 503"));
    assert_eq!(err.kind(), "generation_failed");
  }

  #[test]
  fn every_kind_has_a_distinct_message() {
    let errs = [
      AssistantError::NoActiveDocument,
      AssistantError::UnsupportedFileType("docx".into()),
      AssistantError::EmptyExtraction,
      AssistantError::UnknownChallengeItem(7),
      AssistantError::EmptyAnswer,
      AssistantError::EmptyQuestion,
      AssistantError::StaleDocument,
      AssistantError::StaleChallenge,
      AssistantError::TooManySessions(2),
    ];
    let mut messages: Vec<String> = errs.iter().map(|e| e.to_string()).collect();
    messages.sort();
    messages.dedup();
    assert_eq!(messages.len(), errs.len());
  }
}
