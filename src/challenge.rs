//! Challenge mode: generate grounded comprehension questions and grade answers.
//!
//! Items live in a dense array indexed by generation order; results sit in a
//! parallel array of slots, one per item. An item moves from generated to
//! answered on its first successful evaluation and stays answered; later
//! submissions overwrite the slot. Every install or reset starts a new board
//! generation; a result graded against an older generation is never stored.

use serde::Serialize;
use tracing::{info, instrument};

use crate::completion::CompletionService;
use crate::domain::{ChallengeItem, ChallengeResult};
use crate::error::{AssistantError, Result};
use crate::grader::SimilarityGrader;
use crate::prompts;
use crate::session::Session;

#[derive(Debug, Default)]
pub struct ChallengeBoard {
  items: Vec<ChallengeItem>,
  results: Vec<Option<ChallengeResult>>,
  generation: u64,
}

/// Read-only copy of a board, items in order plus the results recorded so far.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ChallengeSnapshot {
  pub items: Vec<ChallengeItem>,
  pub results: Vec<ChallengeResult>,
}

impl ChallengeBoard {
  pub fn reset(&mut self) {
    self.items.clear();
    self.results.clear();
    self.generation += 1;
  }

  /// Replace the whole item list; prior results go with it.
  pub fn install(&mut self, items: Vec<ChallengeItem>) {
    self.results = vec![None; items.len()];
    self.items = items;
    self.generation += 1;
  }

  pub fn generation(&self) -> u64 {
    self.generation
  }

  pub fn item(&self, index: usize) -> Result<&ChallengeItem> {
    self.items.get(index).ok_or(AssistantError::UnknownChallengeItem(index))
  }

  pub fn record(&mut self, result: ChallengeResult) -> Result<()> {
    let slot = self.results
      .get_mut(result.item_index)
      .ok_or(AssistantError::UnknownChallengeItem(result.item_index))?;
    *slot = Some(result);
    Ok(())
  }

  pub fn snapshot(&self) -> ChallengeSnapshot {
    ChallengeSnapshot {
      items: self.items.clone(),
      results: self.results.iter().flatten().cloned().collect(),
    }
  }
}

/// One item per non-empty trimmed line, in emission order.
pub fn parse_questions(text: &str, source_context: &str) -> Vec<ChallengeItem> {
  text.lines()
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .enumerate()
    .map(|(index, q)| ChallengeItem {
      index,
      question_text: q.to_string(),
      source_context: source_context.to_string(),
    })
    .collect()
}

/// Generate questions for the session's active document and install them.
/// An empty list means the service produced no usable lines; it is not an error.
#[instrument(level = "info", skip_all, fields(session = %session.id))]
pub async fn generate(completion: &dyn CompletionService, session: &Session) -> Result<Vec<ChallengeItem>> {
  let (doc, epoch) = session.current_document().await?;
  let text = completion
    .complete(&prompts::generate_questions(&doc.truncated_context))
    .await
    .map_err(|e| AssistantError::GenerationFailed(Box::new(e)))?;

  let items = parse_questions(&text, &doc.truncated_context);
  session.install_challenge(epoch, items.clone()).await?;
  info!(target: "challenge", document = %doc.id, count = items.len(), "Challenge generated");
  Ok(items)
}

/// Grade `user_answer` for item `index` against a freshly generated reference answer.
#[instrument(level = "info", skip(completion, grader, session, user_answer), fields(session = %session.id, answer_len = user_answer.len()))]
pub async fn evaluate(
  completion: &dyn CompletionService,
  grader: &SimilarityGrader,
  session: &Session,
  index: usize,
  user_answer: &str,
) -> Result<ChallengeResult> {
  let (item, ticket) = session.challenge_item(index).await?;
  if user_answer.trim().is_empty() {
    return Err(AssistantError::EmptyAnswer);
  }

  let reference_answer = completion
    .complete(&prompts::answer_for_grading(&item.source_context, &item.question_text))
    .await?;
  let (similarity_score, feedback_tier) = grader.grade(user_answer, &reference_answer).await?;

  let result = ChallengeResult {
    item_index: index,
    user_answer: user_answer.to_string(),
    reference_answer,
    similarity_score,
    feedback_tier,
  };
  session.record_result(ticket, result.clone()).await?;
  info!(target: "challenge", index, score = similarity_score, tier = ?feedback_tier, "Challenge answer evaluated");
  Ok(result)
}
