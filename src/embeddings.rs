//! Sentence embeddings for answer grading.
//!
//! Two providers: a remote OpenAI-compatible `/embeddings` endpoint, and an
//! in-process fastembed model (`local-embeddings` feature). Both are
//! deterministic for identical input.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::error::{AssistantError, Result};

/// Text in, fixed-dimension dense vector out.
#[async_trait]
pub trait Embedder: Send + Sync {
  async fn embed(&self, text: &str) -> Result<Vec<f32>>;

  fn model_name(&self) -> &str;
}

/// Build the embedder selected by configuration.
pub async fn from_config(cfg: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
  match cfg.provider {
    EmbeddingProvider::Remote => Ok(Arc::new(RemoteEmbedder::new(cfg)?)),
    EmbeddingProvider::Local => local_embedder(cfg).await,
  }
}

#[cfg(feature = "local-embeddings")]
async fn local_embedder(cfg: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
  Ok(Arc::new(local::LocalEmbedder::new(&cfg.model).await?))
}

#[cfg(not(feature = "local-embeddings"))]
async fn local_embedder(_cfg: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
  Err(AssistantError::Configuration(
    "local embeddings require building with the `local-embeddings` feature".into(),
  ))
}

/// Cosine similarity between two vectors, clamped to [-1, 1].
/// Returns 0.0 for mismatched lengths or zero-magnitude vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
  if a.len() != b.len() || a.is_empty() {
    return 0.0;
  }
  let (mut dot, mut mag_a, mut mag_b) = (0.0f64, 0.0f64, 0.0f64);
  for (x, y) in a.iter().zip(b.iter()) {
    let (x, y) = (*x as f64, *y as f64);
    dot += x * y;
    mag_a += x * x;
    mag_b += y * y;
  }
  let denom = mag_a.sqrt() * mag_b.sqrt();
  if denom < f64::EPSILON {
    0.0
  } else {
    (dot / denom).clamp(-1.0, 1.0)
  }
}

pub struct RemoteEmbedder {
  client: reqwest::Client,
  api_key: Option<String>,
  base_url: String,
  model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
  model: &'a str,
  input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
  data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
  embedding: Vec<f32>,
}

impl RemoteEmbedder {
  pub fn new(cfg: &EmbeddingConfig) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(cfg.request_timeout_secs))
      .build()
      .map_err(|e| AssistantError::Configuration(format!("HTTP client: {e}")))?;
    Ok(Self {
      client,
      api_key: cfg.api_key.clone(),
      base_url: cfg.base_url.trim_end_matches('/').to_string(),
      model: cfg.model.clone(),
    })
  }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
  #[instrument(level = "debug", skip(self, text), fields(model = %self.model, text_len = text.len()))]
  async fn embed(&self, text: &str) -> Result<Vec<f32>> {
    let url = format!("{}/embeddings", self.base_url);
    let mut req = self.client.post(&url)
      .header(USER_AGENT, "docent-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&EmbeddingRequest { model: &self.model, input: vec![text] });
    if let Some(key) = &self.api_key {
      req = req.header(AUTHORIZATION, format!("Bearer {key}"));
    }

    let res = req.send().await.map_err(|e| AssistantError::EmbeddingServiceError(e.to_string()))?;
    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      return Err(AssistantError::EmbeddingServiceError(format!("HTTP {status}: {body}")));
    }

    let body: EmbeddingResponse = res.json().await
      .map_err(|e| AssistantError::EmbeddingServiceError(format!("unreadable response: {e}")))?;
    let vector = body.data.into_iter().next()
      .map(|d| d.embedding)
      .ok_or_else(|| AssistantError::EmbeddingServiceError("response has no embedding".into()))?;
    debug!(dimensions = vector.len(), "Embedding received");
    Ok(vector)
  }

  fn model_name(&self) -> &str {
    &self.model
  }
}

#[cfg(feature = "local-embeddings")]
mod local {
  use std::sync::{Arc, Mutex};

  use async_trait::async_trait;
  use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
  use tokio::task;
  use tracing::info;

  use super::Embedder;
  use crate::error::{AssistantError, Result};

  /// fastembed model run on the blocking pool.
  pub struct LocalEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    name: String,
  }

  impl LocalEmbedder {
    /// Loads (and on first use downloads) the model.
    pub async fn new(model_name: &str) -> Result<Self> {
      let model = match model_name {
        "all-MiniLM-L6-v2" => EmbeddingModel::AllMiniLML6V2,
        "all-MiniLM-L12-v2" => EmbeddingModel::AllMiniLML12V2,
        "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        other => return Err(AssistantError::Configuration(format!("unsupported local embedding model '{other}'"))),
      };
      let options = InitOptions::new(model);
      let loaded = task::spawn_blocking(move || TextEmbedding::try_new(options))
        .await
        .map_err(|e| AssistantError::EmbeddingServiceError(format!("task join error: {e}")))?
        .map_err(|e| AssistantError::EmbeddingServiceError(format!("failed to load model: {e}")))?;
      info!(target: "docent_backend", model = model_name, "Local embedding model loaded");
      Ok(Self { model: Arc::new(Mutex::new(loaded)), name: model_name.to_string() })
    }
  }

  #[async_trait]
  impl Embedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
      let model = Arc::clone(&self.model);
      let texts = vec![text.to_string()];
      let mut out = task::spawn_blocking(move || {
        let mut guard = model.lock().map_err(|e| format!("mutex poisoned: {e}"))?;
        guard.embed(texts, None).map_err(|e| format!("embedding failed: {e}"))
      })
      .await
      .map_err(|e| AssistantError::EmbeddingServiceError(format!("task join error: {e}")))?
      .map_err(AssistantError::EmbeddingServiceError)?;
      out.pop().ok_or_else(|| AssistantError::EmbeddingServiceError("no embedding returned".into()))
    }

    fn model_name(&self) -> &str {
      &self.name
    }
  }
}
