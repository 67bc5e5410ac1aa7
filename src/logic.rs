//! Core operations behind the HTTP handlers: upload, ask, and challenge mode.
//!
//! Handlers resolve the session, then call into these. Every error from the
//! extractor or the completion/embedding services is returned as is.

use tracing::{debug, info, instrument};

use crate::challenge::{self, ChallengeSnapshot};
use crate::domain::{ChallengeItem, ChallengeResult, GroundedAnswer, UploadOutcome};
use crate::error::{AssistantError, Result};
use crate::extract::{self, FileKind};
use crate::prompts;
use crate::session::Session;
use crate::state::AppState;
use crate::util::split_sentences;

/// Shortest context sentence accepted as a quoted justification.
const MIN_JUSTIFICATION_CHARS: usize = 12;

/// Extract text from an uploaded file, then install it as the session's document.
#[instrument(level = "info", skip(state, session, bytes), fields(session = %session.id, bytes_len = bytes.len()))]
pub async fn upload_file(state: &AppState, session: &Session, filename: &str, bytes: Vec<u8>) -> Result<UploadOutcome> {
  let kind = FileKind::from_filename(filename)?;
  let text = tokio::task::spawn_blocking(move || extract::extract(&bytes, kind))
    .await
    .map_err(|e| AssistantError::ExtractionFailed(format!("extraction task failed: {e}")))??;
  upload(state, session, filename, text).await
}

/// Replace the session's document and summarize it.
///
/// The document stays active even when summarization fails; the completion
/// error is still returned.
#[instrument(level = "info", skip(state, session, text), fields(session = %session.id, text_len = text.len()))]
pub async fn upload(state: &AppState, session: &Session, id: &str, text: String) -> Result<UploadOutcome> {
  if text.trim().is_empty() {
    return Err(AssistantError::EmptyExtraction);
  }
  let doc = session.replace_document(id, text).await;
  let summary = state.completion.complete(&prompts::summarize(&doc.truncated_context)).await?;
  info!(target: "docent_backend", document = %doc.id, summary_len = summary.len(), "Document uploaded and summarized");
  Ok(UploadOutcome { document_id: doc.id.clone(), summary })
}

/// Answer a free-form question grounded in the session's document.
#[instrument(level = "info", skip(state, session, question), fields(session = %session.id, question_len = question.len()))]
pub async fn ask(state: &AppState, session: &Session, question: &str) -> Result<GroundedAnswer> {
  if question.trim().is_empty() {
    return Err(AssistantError::EmptyQuestion);
  }
  let (doc, _) = session.current_document().await?;
  let answer = state.completion.complete(&prompts::answer(&doc.truncated_context, question)).await?;
  let justification = find_justification(&answer, &doc.truncated_context);
  debug!(target: "docent_backend", has_justification = justification.is_some(), "Question answered");
  Ok(GroundedAnswer { answer, justification })
}

pub async fn generate_challenge(state: &AppState, session: &Session) -> Result<Vec<ChallengeItem>> {
  challenge::generate(state.completion.as_ref(), session).await
}

pub async fn evaluate_challenge(state: &AppState, session: &Session, index: usize, answer: &str) -> Result<ChallengeResult> {
  challenge::evaluate(state.completion.as_ref(), &state.grader, session, index, answer).await
}

pub async fn challenge_snapshot(session: &Session) -> ChallengeSnapshot {
  session.challenge_snapshot().await
}

/// The longest sentence of `context` that `answer` quotes verbatim (ignoring
/// whitespace differences), if any.
pub fn find_justification(answer: &str, context: &str) -> Option<String> {
  let answer = collapse_whitespace(answer);
  split_sentences(context)
    .into_iter()
    .map(collapse_whitespace)
    .filter(|s| s.chars().count() >= MIN_JUSTIFICATION_CHARS && answer.contains(s.as_str()))
    .max_by_key(|s| s.len())
}

fn collapse_whitespace(s: &str) -> String {
  s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::grader::SimilarityGrader;
  use crate::prompts::TaskKind;
  use crate::testing::{FakeCompletion, FakeEmbedder};

  const DOC: &str = "The sky is blue because of Rayleigh scattering.";

  fn state_with(completion: Arc<FakeCompletion>) -> AppState {
    AppState::with_services(completion, SimilarityGrader::new(Arc::new(FakeEmbedder::new())), 1024)
  }

  #[tokio::test]
  async fn ask_keeps_the_question_verbatim() {
    let completion = Arc::new(FakeCompletion::new().default_reply("Rayleigh scattering."));
    let state = state_with(Arc::clone(&completion));
    let session = Session::new();
    upload(&state, &session, "sky.txt", DOC.into()).await.unwrap();

    ask(&state, &session, " Why is the sky blue?\n").await.unwrap();

    let sent = completion.requests();
    assert_eq!(sent[1].task_kind, TaskKind::Answer);
    assert_eq!(
      sent[1].instruction_text,
      format!("Answer the following question based on the document below:\n\nQuestion:  Why is the sky blue?\n\n\nDocument:\n{DOC}\n\nAlso include the sentence that supports your answer.")
    );
  }

  #[tokio::test]
  async fn ask_requires_an_upload() {
    let completion = Arc::new(FakeCompletion::new().default_reply("answer"));
    let state = state_with(Arc::clone(&completion));
    let session = Session::new();

    let err = ask(&state, &session, "Why is the sky blue?").await.unwrap_err();
    assert_eq!(err.kind(), "no_active_document");

    upload(&state, &session, "sky.txt", DOC.into()).await.unwrap();
    assert!(ask(&state, &session, "Why is the sky blue?").await.is_ok());
  }

  #[tokio::test]
  async fn ask_sends_the_templated_prompt() {
    let completion = Arc::new(
      FakeCompletion::new()
        .reply("A short summary.")
        .reply("Because of scattering. Supporting sentence: The sky is blue because of Rayleigh scattering."),
    );
    let state = state_with(Arc::clone(&completion));
    let session = Session::new();

    let outcome = upload(&state, &session, "sky.txt", DOC.into()).await.unwrap();
    assert_eq!(outcome.document_id, "sky.txt");
    assert_eq!(outcome.summary, "A short summary.");

    let answer = ask(&state, &session, "Why is the sky blue?").await.unwrap();
    assert_eq!(answer.justification.as_deref(), Some(DOC));

    let sent = completion.requests();
    assert_eq!(sent[0].task_kind, TaskKind::Summarize);
    assert_eq!(sent[0].instruction_text, format!("Summarize the following document in under 150 words:\n\n{DOC}"));
    assert_eq!(
      sent[1].instruction_text,
      format!("Answer the following question based on the document below:\n\nQuestion: Why is the sky blue?\n\nDocument:\n{DOC}\n\nAlso include the sentence that supports your answer.")
    );
  }

  #[tokio::test]
  async fn blank_questions_and_documents_are_rejected() {
    let state = state_with(Arc::new(FakeCompletion::new().default_reply("x")));
    let session = Session::new();
    assert_eq!(upload(&state, &session, "a.txt", "   ".into()).await.unwrap_err().kind(), "empty_extraction");
    upload(&state, &session, "a.txt", DOC.into()).await.unwrap();
    assert_eq!(ask(&state, &session, " \n").await.unwrap_err().kind(), "empty_question");
  }

  #[tokio::test]
  async fn second_upload_replaces_document_and_challenge() {
    let completion = Arc::new(FakeCompletion::new().default_reply("Q1?\nQ2?"));
    let state = state_with(Arc::clone(&completion));
    let session = Session::new();

    upload(&state, &session, "first.txt", "First document text.".into()).await.unwrap();
    generate_challenge(&state, &session).await.unwrap();
    assert_eq!(challenge_snapshot(&session).await.items.len(), 2);

    upload(&state, &session, "second.txt", DOC.into()).await.unwrap();
    let (doc, _) = session.current_document().await.unwrap();
    assert_eq!(doc.id, "second.txt");
    assert!(challenge_snapshot(&session).await.items.is_empty());
    let err = evaluate_challenge(&state, &session, 0, "anything").await.unwrap_err();
    assert_eq!(err.kind(), "unknown_challenge_item");
  }

  #[tokio::test]
  async fn summary_failure_keeps_the_document() {
    let state = state_with(Arc::new(FakeCompletion::new().fail(401, "Invalid API Key")));
    let session = Session::new();

    let err = upload(&state, &session, "sky.txt", DOC.into()).await.unwrap_err();
    assert!(matches!(err, AssistantError::CompletionServiceError { status_code: 401, .. }));
    assert_eq!(session.current_document().await.unwrap().0.id, "sky.txt");
  }

  #[tokio::test]
  async fn upload_file_checks_the_extension() {
    let state = state_with(Arc::new(FakeCompletion::new().default_reply("summary")));
    let session = Session::new();

    let err = upload_file(&state, &session, "sky.docx", DOC.as_bytes().to_vec()).await.unwrap_err();
    assert_eq!(err.kind(), "unsupported_file_type");

    let outcome = upload_file(&state, &session, "sky.txt", DOC.as_bytes().to_vec()).await.unwrap();
    assert_eq!(outcome.summary, "summary");
  }

  #[test]
  fn justification_is_the_longest_quoted_sentence() {
    let ctx = "Cats sleep a lot. Most cats sleep up to sixteen hours a day. Dogs bark.";
    let answer = "They sleep much.  Most cats sleep up to\nsixteen hours a day.";
    assert_eq!(find_justification(answer, ctx).as_deref(), Some("Most cats sleep up to sixteen hours a day."));
    assert_eq!(find_justification("Dogs bark.", ctx), None);
    assert_eq!(find_justification("No quote here", ctx), None);
  }
}
