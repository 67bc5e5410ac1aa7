//! Service configuration: environment variables for endpoints and secrets,
//! plus an optional TOML file for tunables.
//!
//! Env variables:
//!   PORT                   : u16 (default 3000)
//!   COMPLETION_API_KEY     : completion service key (falls back to GROQ_API_KEY)
//!   COMPLETION_BASE_URL    : default "https://api.groq.com/openai/v1"
//!   COMPLETION_MODEL       : default "llama3-8b-8192"
//!   EMBEDDING_PROVIDER     : "remote" (default) or "local"
//!   EMBEDDING_API_KEY      : remote embedding key (falls back to OPENAI_API_KEY)
//!   EMBEDDING_BASE_URL     : default "https://api.openai.com/v1"
//!   EMBEDDING_MODEL        : default "text-embedding-3-small" (remote) / "all-MiniLM-L6-v2" (local)
//!   ASSISTANT_CONFIG_PATH  : path to TOML overrides (see `FileConfig`)

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::error::{AssistantError, Result};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
pub const DEFAULT_MAX_SESSIONS: usize = 1000;
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 3600;

#[derive(Clone, Debug)]
pub struct Settings {
  pub port: u16,
  pub max_upload_bytes: usize,
  pub sessions: SessionLimits,
  pub completion: CompletionConfig,
  pub embedding: EmbeddingConfig,
}

/// Bounds on the in-memory session registry. Idle sessions are evicted when a new one is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionLimits {
  pub max_sessions: usize,
  pub idle_timeout: Duration,
}

impl Default for SessionLimits {
  fn default() -> Self {
    Self {
      max_sessions: DEFAULT_MAX_SESSIONS,
      idle_timeout: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
    }
  }
}

#[derive(Clone, Debug)]
pub struct CompletionConfig {
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub system_message: String,
  pub request_timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
  Remote,
  Local,
}

#[derive(Clone, Debug)]
pub struct EmbeddingConfig {
  pub provider: EmbeddingProvider,
  pub api_key: Option<String>,
  pub base_url: String,
  pub model: String,
  pub request_timeout_secs: u64,
}

/// Optional TOML overrides. Every field may be omitted.
///
/// ```toml
/// max_upload_bytes = 10485760
/// max_sessions = 200
/// session_idle_secs = 900
///
/// [completion]
/// model = "llama3-70b-8192"
/// request_timeout_secs = 30
///
/// [embedding]
/// provider = "local"
/// model = "all-MiniLM-L6-v2"
/// ```
#[derive(Clone, Debug, Deserialize, Default)]
pub struct FileConfig {
  #[serde(default)] pub max_upload_bytes: Option<usize>,
  #[serde(default)] pub max_sessions: Option<usize>,
  #[serde(default)] pub session_idle_secs: Option<u64>,
  #[serde(default)] pub completion: CompletionFileConfig,
  #[serde(default)] pub embedding: EmbeddingFileConfig,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct CompletionFileConfig {
  #[serde(default)] pub base_url: Option<String>,
  #[serde(default)] pub model: Option<String>,
  #[serde(default)] pub system_message: Option<String>,
  #[serde(default)] pub request_timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct EmbeddingFileConfig {
  #[serde(default)] pub provider: Option<EmbeddingProvider>,
  #[serde(default)] pub base_url: Option<String>,
  #[serde(default)] pub model: Option<String>,
  #[serde(default)] pub request_timeout_secs: Option<u64>,
}

impl Settings {
  /// Build settings from the process environment and `ASSISTANT_CONFIG_PATH`.
  pub fn from_env() -> Result<Self> {
    let file = load_file_config_from_env().unwrap_or_default();
    Self::resolve(|key| std::env::var(key).ok(), file)
  }

  /// Resolve settings with env taking precedence over the file, the file over defaults.
  pub fn resolve<F>(env: F, file: FileConfig) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let port = env("PORT")
      .and_then(|p| p.parse::<u16>().ok())
      .unwrap_or(DEFAULT_PORT);

    let api_key = env("COMPLETION_API_KEY")
      .or_else(|| env("GROQ_API_KEY"))
      .filter(|k| !k.trim().is_empty())
      .ok_or_else(|| AssistantError::Configuration("COMPLETION_API_KEY (or GROQ_API_KEY) is not set".into()))?;

    let completion = CompletionConfig {
      api_key,
      base_url: env("COMPLETION_BASE_URL")
        .or(file.completion.base_url)
        .unwrap_or_else(|| "https://api.groq.com/openai/v1".into()),
      model: env("COMPLETION_MODEL")
        .or(file.completion.model)
        .unwrap_or_else(|| "llama3-8b-8192".into()),
      system_message: file.completion.system_message
        .unwrap_or_else(|| "You are a helpful assistant.".into()),
      request_timeout_secs: file.completion.request_timeout_secs.unwrap_or(60),
    };

    let provider = match env("EMBEDDING_PROVIDER").as_deref() {
      Some("local") => EmbeddingProvider::Local,
      Some("remote") => EmbeddingProvider::Remote,
      Some(other) => {
        return Err(AssistantError::Configuration(format!("EMBEDDING_PROVIDER must be 'remote' or 'local', got '{other}'")))
      }
      None => file.embedding.provider.unwrap_or(EmbeddingProvider::Remote),
    };
    let default_model = match provider {
      EmbeddingProvider::Remote => "text-embedding-3-small",
      EmbeddingProvider::Local => "all-MiniLM-L6-v2",
    };
    let embedding = EmbeddingConfig {
      api_key: env("EMBEDDING_API_KEY").or_else(|| env("OPENAI_API_KEY")),
      base_url: env("EMBEDDING_BASE_URL")
        .or(file.embedding.base_url)
        .unwrap_or_else(|| "https://api.openai.com/v1".into()),
      model: env("EMBEDDING_MODEL")
        .or(file.embedding.model)
        .unwrap_or_else(|| default_model.into()),
      request_timeout_secs: file.embedding.request_timeout_secs.unwrap_or(30),
      provider,
    };

    Ok(Self {
      port,
      max_upload_bytes: file.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
      sessions: SessionLimits {
        max_sessions: file.max_sessions.unwrap_or(DEFAULT_MAX_SESSIONS),
        idle_timeout: Duration::from_secs(file.session_idle_secs.unwrap_or(DEFAULT_SESSION_IDLE_SECS)),
      },
      completion,
      embedding,
    })
  }
}

/// Attempt to load `FileConfig` from ASSISTANT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_file_config_from_env() -> Option<FileConfig> {
  let path = std::env::var("ASSISTANT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<FileConfig>(&s) {
      Ok(cfg) => {
        info!(target: "docent_backend", %path, "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "docent_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "docent_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |k| map.get(k).cloned()
  }

  #[test]
  fn defaults_follow_groq_setup() {
    let s = Settings::resolve(env_of(&[("GROQ_API_KEY", "gsk")]), FileConfig::default()).unwrap();
    assert_eq!(s.port, DEFAULT_PORT);
    assert_eq!(s.completion.api_key, "gsk");
    assert_eq!(s.completion.base_url, "https://api.groq.com/openai/v1");
    assert_eq!(s.completion.model, "llama3-8b-8192");
    assert_eq!(s.completion.system_message, "You are a helpful assistant.");
    assert_eq!(s.embedding.provider, EmbeddingProvider::Remote);
    assert_eq!(s.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    assert_eq!(s.sessions, SessionLimits::default());
  }

  #[test]
  fn missing_completion_key_is_a_configuration_error() {
    let err = Settings::resolve(env_of(&[]), FileConfig::default()).unwrap_err();
    assert_eq!(err.kind(), "configuration");
  }

  #[test]
  fn env_overrides_file_and_file_overrides_defaults() {
    let file: FileConfig = toml::from_str(
      r#"
      max_upload_bytes = 1024
      max_sessions = 10
      session_idle_secs = 60
      [completion]
      model = "from-file"
      request_timeout_secs = 5
      [embedding]
      provider = "local"
      "#,
    )
    .unwrap();
    let s = Settings::resolve(
      env_of(&[("COMPLETION_API_KEY", "k"), ("COMPLETION_MODEL", "from-env"), ("PORT", "8080")]),
      file,
    )
    .unwrap();
    assert_eq!(s.port, 8080);
    assert_eq!(s.completion.model, "from-env");
    assert_eq!(s.completion.request_timeout_secs, 5);
    assert_eq!(s.max_upload_bytes, 1024);
    assert_eq!(s.sessions.max_sessions, 10);
    assert_eq!(s.sessions.idle_timeout, Duration::from_secs(60));
    assert_eq!(s.embedding.provider, EmbeddingProvider::Local);
    assert_eq!(s.embedding.model, "all-MiniLM-L6-v2");
  }

  #[test]
  fn unknown_embedding_provider_is_rejected() {
    let err = Settings::resolve(
      env_of(&[("COMPLETION_API_KEY", "k"), ("EMBEDDING_PROVIDER", "magic")]),
      FileConfig::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("magic"));
  }
}
