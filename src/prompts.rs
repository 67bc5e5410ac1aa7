//! Prompt construction for every generative call.
//!
//! This is the only place prompt wording lives. Live-document prompts are
//! grounded in the first `CONTEXT_CHAR_LIMIT` characters of the context;
//! grading prompts reuse the item's pinned context verbatim.

use serde::Serialize;

use crate::domain::CONTEXT_CHAR_LIMIT;
use crate::util::take_chars;

const DEFAULT_TEMPERATURE: f32 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
  Summarize,
  Answer,
  GenerateQuestions,
  AnswerForGrading,
}

impl TaskKind {
  pub fn max_output_tokens(self) -> u32 {
    match self {
      TaskKind::GenerateQuestions => 250,
      TaskKind::Summarize | TaskKind::Answer | TaskKind::AnswerForGrading => 500,
    }
  }

  pub fn temperature(self) -> f32 {
    DEFAULT_TEMPERATURE
  }
}

/// A single instruction for the completion service. Built per call, never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct PromptRequest {
  pub task_kind: TaskKind,
  pub instruction_text: String,
  pub max_output_tokens: u32,
  pub sampling_temperature: f32,
}

impl PromptRequest {
  fn new(task_kind: TaskKind, instruction_text: String) -> Self {
    Self {
      task_kind,
      instruction_text,
      max_output_tokens: task_kind.max_output_tokens(),
      sampling_temperature: task_kind.temperature(),
    }
  }
}

pub fn summarize(context: &str) -> PromptRequest {
  let context = take_chars(context, CONTEXT_CHAR_LIMIT);
  PromptRequest::new(
    TaskKind::Summarize,
    format!("Summarize the following document in under 150 words:\n\n{context}"),
  )
}

pub fn answer(context: &str, question: &str) -> PromptRequest {
  let context = take_chars(context, CONTEXT_CHAR_LIMIT);
  PromptRequest::new(
    TaskKind::Answer,
    format!(
      "Answer the following question based on the document below:\n\nQuestion: {question}\n\nDocument:\n{context}\n\nAlso include the sentence that supports your answer."
    ),
  )
}

pub fn generate_questions(context: &str) -> PromptRequest {
  let context = take_chars(context, CONTEXT_CHAR_LIMIT);
  PromptRequest::new(
    TaskKind::GenerateQuestions,
    format!("Generate 3 reasoning and inference questions based on the following text:\n{context}"),
  )
}

/// `source_context` is the item's pinned snapshot and is passed through as is.
pub fn answer_for_grading(source_context: &str, question: &str) -> PromptRequest {
  PromptRequest::new(
    TaskKind::AnswerForGrading,
    format!("Answer this question based on the following document:\n\nQuestion: {question}\nDocument:\n{source_context}"),
  )
}
