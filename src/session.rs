//! A session owns one document slot and the challenge board tied to it.
//!
//! Both live behind a single lock so replacing the document and clearing the
//! board happen together. The lock is never held across a network call;
//! callers snapshot what they need, call out, then commit with the epoch they
//! started from. Graded answers also carry the board generation they were
//! read from, so a regenerated question list never receives an old result.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::challenge::{ChallengeBoard, ChallengeSnapshot};
use crate::context::ContextStore;
use crate::domain::{ChallengeItem, ChallengeResult, DocumentContext};
use crate::error::{AssistantError, Result};

#[derive(Default)]
struct SessionState {
  context: ContextStore,
  board: ChallengeBoard,
}

/// Where a challenge item was read from: the document epoch and the board generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChallengeTicket {
  pub epoch: u64,
  pub generation: u64,
}

pub struct Session {
  pub id: Uuid,
  state: RwLock<SessionState>,
  last_used: Mutex<Instant>,
}

impl Session {
  pub fn new() -> Self {
    Self {
      id: Uuid::new_v4(),
      state: RwLock::new(SessionState::default()),
      last_used: Mutex::new(Instant::now()),
    }
  }

  /// Mark the session as used now; idle eviction measures from here.
  pub fn touch(&self) {
    if let Ok(mut t) = self.last_used.lock() {
      *t = Instant::now();
    }
  }

  pub fn idle_for(&self) -> Duration {
    self.last_used.lock().map(|t| t.elapsed()).unwrap_or_default()
  }

  /// Install a new document and drop every challenge item and result of the previous one.
  #[instrument(level = "info", skip(self, text), fields(session = %self.id, text_len = text.len()))]
  pub async fn replace_document(&self, id: &str, text: String) -> Arc<DocumentContext> {
    let mut state = self.state.write().await;
    let doc = state.context.set(id, text);
    state.board.reset();
    info!(target: "session", epoch = state.context.epoch(), truncated = doc.is_truncated(), "Active document replaced");
    doc
  }

  /// The active document and the epoch it was installed at.
  pub async fn current_document(&self) -> Result<(Arc<DocumentContext>, u64)> {
    let state = self.state.read().await;
    let doc = state.context.get()?;
    Ok((doc, state.context.epoch()))
  }

  /// Atomically install a freshly generated item list, unless the document changed meanwhile.
  pub async fn install_challenge(&self, epoch: u64, items: Vec<ChallengeItem>) -> Result<()> {
    let mut state = self.state.write().await;
    if state.context.epoch() != epoch {
      warn!(target: "challenge", session = %self.id, "Document replaced during generation; discarding items");
      return Err(AssistantError::StaleDocument);
    }
    state.board.install(items);
    Ok(())
  }

  pub async fn challenge_item(&self, index: usize) -> Result<(ChallengeItem, ChallengeTicket)> {
    let state = self.state.read().await;
    let item = state.board.item(index)?.clone();
    let ticket = ChallengeTicket { epoch: state.context.epoch(), generation: state.board.generation() };
    Ok((item, ticket))
  }

  /// Store a result in its item's slot, replacing any earlier one.
  /// Refused when the document or the question list changed since `ticket` was taken.
  pub async fn record_result(&self, ticket: ChallengeTicket, result: ChallengeResult) -> Result<()> {
    let mut state = self.state.write().await;
    if state.context.epoch() != ticket.epoch {
      warn!(target: "challenge", session = %self.id, index = result.item_index, "Document replaced during evaluation; discarding result");
      return Err(AssistantError::StaleDocument);
    }
    if state.board.generation() != ticket.generation {
      warn!(target: "challenge", session = %self.id, index = result.item_index, "Challenge regenerated during evaluation; discarding result");
      return Err(AssistantError::StaleChallenge);
    }
    state.board.record(result)
  }

  pub async fn challenge_snapshot(&self) -> ChallengeSnapshot {
    self.state.read().await.board.snapshot()
  }
}

impl Default for Session {
  fn default() -> Self {
    Self::new()
  }
}
