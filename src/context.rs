//! Single-slot store for a session's active document.

use std::sync::Arc;

use crate::domain::DocumentContext;
use crate::error::{AssistantError, Result};

/// Holds at most one document. Every `set` bumps the epoch so work started
/// against an older document can detect that it was replaced.
#[derive(Debug, Default)]
pub struct ContextStore {
  active: Option<Arc<DocumentContext>>,
  epoch: u64,
}

impl ContextStore {
  /// Replace the active document unconditionally.
  pub fn set(&mut self, id: impl Into<String>, text: impl Into<String>) -> Arc<DocumentContext> {
    let doc = Arc::new(DocumentContext::new(id, text));
    self.active = Some(Arc::clone(&doc));
    self.epoch += 1;
    doc
  }

  pub fn get(&self) -> Result<Arc<DocumentContext>> {
    self.active.clone().ok_or(AssistantError::NoActiveDocument)
  }

  pub fn epoch(&self) -> u64 {
    self.epoch
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn get_before_set_fails() {
    let store = ContextStore::default();
    assert_eq!(store.get().unwrap_err().kind(), "no_active_document");
    assert_eq!(store.epoch(), 0);
  }

  #[test]
  fn set_overwrites_and_advances_epoch() {
    let mut store = ContextStore::default();
    store.set("a.txt", "alpha");
    let first = store.epoch();
    store.set("b.txt", "beta");
    assert!(store.epoch() > first);

    let doc = store.get().unwrap();
    assert_eq!(doc.id, "b.txt");
    assert_eq!(doc.raw_text, "beta");
  }
}
