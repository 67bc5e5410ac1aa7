//! Completion gateway: one blocking chat.completions call per prompt.
//!
//! Speaks the OpenAI-compatible chat API (Groq by default). A non-success
//! status is returned to the caller as `CompletionServiceError` with the
//! status and body; there is no retry or backoff.
//! Calls log model names, latencies, and token usage (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::CompletionConfig;
use crate::error::{AssistantError, Result};
use crate::prompts::PromptRequest;
use crate::util::trunc_for_log;

/// Prompt in, text out. Implementations must be safe to share across requests.
#[async_trait]
pub trait CompletionService: Send + Sync {
  async fn complete(&self, request: &PromptRequest) -> Result<String>;
}

#[derive(Clone)]
pub struct ChatCompletionClient {
  client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub model: String,
  system_message: String,
}

impl ChatCompletionClient {
  pub fn new(cfg: &CompletionConfig) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(cfg.request_timeout_secs))
      .build()
      .map_err(|e| AssistantError::Configuration(format!("HTTP client: {e}")))?;

    Ok(Self {
      client,
      api_key: cfg.api_key.clone(),
      base_url: cfg.base_url.trim_end_matches('/').to_string(),
      model: cfg.model.clone(),
      system_message: cfg.system_message.clone(),
    })
  }

  fn build_request(&self, request: &PromptRequest) -> ChatCompletionRequest {
    ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: self.system_message.clone() },
        ChatMessageReq { role: "user".into(), content: request.instruction_text.clone() },
      ],
      temperature: request.sampling_temperature,
      max_tokens: request.max_output_tokens,
    }
  }
}

#[async_trait]
impl CompletionService for ChatCompletionClient {
  #[instrument(
    level = "info",
    skip(self, request),
    fields(model = %self.model, task = ?request.task_kind, prompt_len = request.instruction_text.len())
  )]
  async fn complete(&self, request: &PromptRequest) -> Result<String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = self.build_request(request);
    let start = Instant::now();

    let res = self.client.post(&url)
      .header(USER_AGENT, "docent-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| {
        error!(elapsed = ?start.elapsed(), error = %e, "Completion request failed");
        AssistantError::CompletionTransport(e.to_string())
      })?;

    if !res.status().is_success() {
      let status_code = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_api_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      error!(elapsed = ?start.elapsed(), status_code, %message, "Completion service returned an error");
      return Err(AssistantError::CompletionServiceError { status_code, body });
    }

    let body: ChatCompletionResponse = res.json().await
      .map_err(|e| AssistantError::CompletionMalformed(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Completion usage");
    }
    let text = first_message(body)?;

    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Completion received");
    Ok(text)
  }
}

/// Content of the first choice, exactly as the service returned it.
fn first_message(body: ChatCompletionResponse) -> Result<String> {
  body.choices.into_iter().next()
    .and_then(|c| c.message.content)
    .ok_or_else(|| AssistantError::CompletionMalformed("response has no message content".into()))
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  max_tokens: u32,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI-style error body, for logging.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::prompts;

  fn client() -> ChatCompletionClient {
    ChatCompletionClient::new(&CompletionConfig {
      api_key: "secret".into(),
      base_url: "http://localhost:9/v1/".into(),
      model: "llama3-8b-8192".into(),
      system_message: "You are a helpful assistant.".into(),
      request_timeout_secs: 1,
    })
    .unwrap()
  }

  #[test]
  fn request_body_carries_prompt_and_sampling() {
    let c = client();
    let req = c.build_request(&prompts::generate_questions("doc"));
    let json = serde_json::to_value(&req).unwrap();

    assert_eq!(json["model"], "llama3-8b-8192");
    assert_eq!(json["max_tokens"], 250);
    assert!((json["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    assert_eq!(json["messages"][0]["role"], "system");
    assert_eq!(json["messages"][0]["content"], "You are a helpful assistant.");
    assert_eq!(json["messages"][1]["role"], "user");
    assert_eq!(
      json["messages"][1]["content"],
      "Generate 3 reasoning and inference questions based on the following text:\ndoc"
    );
    assert_eq!(c.base_url, "http://localhost:9/v1");
  }

  #[test]
  fn api_error_message_is_unwrapped() {
    let body = r#"{"error":{"message":"Rate limit reached","type":"tokens"}}"#;
    assert_eq!(extract_api_error(body).as_deref(), Some("Rate limit reached"));
    assert_eq!(extract_api_error("<html>bad gateway</html>"), None);
  }

  #[test]
  fn message_content_is_returned_untrimmed() {
    let body: ChatCompletionResponse = serde_json::from_str(
      r#"{"choices":[{"message":{"role":"assistant","content":"  Rayleigh scattering\n"}}],"usage":{"total_tokens":12}}"#,
    )
    .unwrap();
    assert_eq!(first_message(body).unwrap(), "  Rayleigh scattering\n");

    let empty: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
    assert_eq!(first_message(empty).unwrap_err().kind(), "completion_malformed");
  }

  #[tokio::test]
  async fn unreachable_service_is_a_transport_error() {
    let err = client().complete(&prompts::summarize("doc")).await.unwrap_err();
    assert_eq!(err.kind(), "completion_transport");
  }
}
