//! In-process fakes for the completion and embedding services.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::completion::CompletionService;
use crate::embeddings::Embedder;
use crate::error::{AssistantError, Result};
use crate::prompts::PromptRequest;

/// Lets a test pause a completion call mid-flight.
#[derive(Default)]
pub struct Gate {
  pub entered: Notify,
  pub release: Notify,
}

/// Replies from a script, in order; falls back to `default_reply` when the script runs out.
#[derive(Default)]
pub struct FakeCompletion {
  script: Mutex<VecDeque<Result<String>>>,
  default: Option<String>,
  seen: Mutex<Vec<PromptRequest>>,
  gate: Option<Arc<Gate>>,
}

impl FakeCompletion {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn reply(self, text: &str) -> Self {
    self.script.lock().unwrap().push_back(Ok(text.to_string()));
    self
  }

  pub fn fail(self, status_code: u16, body: &str) -> Self {
    self.script.lock().unwrap().push_back(Err(AssistantError::CompletionServiceError {
      status_code,
      body: body.to_string(),
    }));
    self
  }

  pub fn default_reply(mut self, text: &str) -> Self {
    self.default = Some(text.to_string());
    self
  }

  pub fn gated(mut self) -> (Self, Arc<Gate>) {
    let gate = Arc::new(Gate::default());
    self.gate = Some(Arc::clone(&gate));
    (self, gate)
  }

  /// Every request received so far, in call order.
  pub fn requests(&self) -> Vec<PromptRequest> {
    self.seen.lock().unwrap().clone()
  }
}

#[async_trait]
impl CompletionService for FakeCompletion {
  async fn complete(&self, request: &PromptRequest) -> Result<String> {
    self.seen.lock().unwrap().push(request.clone());
    let next = self.script.lock().unwrap().pop_front();
    if let Some(gate) = &self.gate {
      gate.entered.notify_one();
      gate.release.notified().await;
    }
    match next {
      Some(reply) => reply,
      None => self
        .default
        .clone()
        .ok_or_else(|| AssistantError::CompletionTransport("fake completion has no scripted reply".into())),
    }
  }
}

/// Looks vectors up by exact text; unknown text is an embedding error.
#[derive(Default)]
pub struct FakeEmbedder {
  vectors: HashMap<String, Vec<f32>>,
}

impl FakeEmbedder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
    self.vectors.insert(text.to_string(), vector);
    self
  }
}

#[async_trait]
impl Embedder for FakeEmbedder {
  async fn embed(&self, text: &str) -> Result<Vec<f32>> {
    self.vectors
      .get(text)
      .cloned()
      .ok_or_else(|| AssistantError::EmbeddingServiceError(format!("no vector for '{text}'")))
  }

  fn model_name(&self) -> &str {
    "fake"
  }
}
