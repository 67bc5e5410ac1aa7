//! Application state: the external services and the session registry.
//!
//! Each session owns its own document slot and challenge board, so
//! concurrent users never see each other's document. The registry is
//! bounded: idle sessions are evicted when a new one is created, and creation
//! fails once `max_sessions` live sessions remain.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::completion::{ChatCompletionClient, CompletionService};
use crate::config::{SessionLimits, Settings};
use crate::embeddings;
use crate::error::{AssistantError, Result};
use crate::grader::SimilarityGrader;
use crate::session::Session;

#[derive(Clone)]
pub struct AppState {
    pub completion: Arc<dyn CompletionService>,
    pub grader: SimilarityGrader,
    pub sessions: Arc<RwLock<HashMap<Uuid, Arc<Session>>>>,
    pub max_upload_bytes: usize,
    pub session_limits: SessionLimits,
}

impl AppState {
    /// Build state from settings: completion client and embedding provider.
    #[instrument(level = "info", skip_all)]
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let client = ChatCompletionClient::new(&settings.completion)?;
        info!(target: "docent_backend", base_url = %client.base_url, model = %client.model, timeout_secs = settings.completion.request_timeout_secs, "Completion service configured.");

        let embedder = embeddings::from_config(&settings.embedding).await?;
        info!(target: "docent_backend", provider = ?settings.embedding.provider, model = %embedder.model_name(), "Embedding service configured.");

        Ok(Self::with_services(
            Arc::new(client),
            SimilarityGrader::new(embedder),
            settings.max_upload_bytes,
        )
        .with_session_limits(settings.sessions))
    }

    pub fn with_services(
        completion: Arc<dyn CompletionService>,
        grader: SimilarityGrader,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            completion,
            grader,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_upload_bytes,
            session_limits: SessionLimits::default(),
        }
    }

    pub fn with_session_limits(mut self, limits: SessionLimits) -> Self {
        self.session_limits = limits;
        self
    }

    /// Register a new session after evicting idle ones.
    #[instrument(level = "info", skip(self))]
    pub async fn create_session(&self) -> Result<Arc<Session>> {
        let limits = self.session_limits;
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, s| s.idle_for() < limits.idle_timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(target: "session", evicted, "Idle sessions evicted");
        }

        if sessions.len() >= limits.max_sessions {
            warn!(target: "session", live = sessions.len(), max = limits.max_sessions, "Session limit reached");
            return Err(AssistantError::TooManySessions(limits.max_sessions));
        }

        let session = Arc::new(Session::new());
        sessions.insert(session.id, Arc::clone(&session));
        info!(target: "session", id = %session.id, live = sessions.len(), "Session created");
        Ok(session)
    }

    pub async fn session(&self, id: &str) -> Result<Arc<Session>> {
        let uuid = Uuid::parse_str(id).map_err(|_| AssistantError::UnknownSession(id.to_string()))?;
        let session = self.sessions
            .read()
            .await
            .get(&uuid)
            .cloned()
            .ok_or_else(|| AssistantError::UnknownSession(id.to_string()))?;
        session.touch();
        Ok(session)
    }

    /// Drop a session and everything it holds.
    #[instrument(level = "info", skip(self), fields(%id))]
    pub async fn close_session(&self, id: &str) -> Result<()> {
        let session = self.session(id).await?;
        self.sessions.write().await.remove(&session.id);
        info!(target: "session", %id, "Session closed");
        Ok(())
    }
}
