//! Docent · Document Q&A Backend
//!
//! - Upload a PDF or text document and get a summary
//! - Ask free-form questions grounded in the document
//! - Challenge mode: generated comprehension questions, graded by embedding similarity
//!
//! Configuration lives in `config.rs` (env variables plus optional TOML).
//! Logging:
//!   LOG_LEVEL    : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT   : "pretty" (default) or "json"

mod challenge;
mod completion;
mod config;
mod context;
mod domain;
mod embeddings;
mod error;
mod extract;
mod grader;
mod logic;
mod prompts;
mod protocol;
mod routes;
mod session;
mod state;
mod telemetry;
#[cfg(test)]
mod testing;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Settings;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let settings = Settings::from_env().map_err(|e| {
    error!(target: "docent_backend", error = %e, "Invalid configuration");
    e
  })?;

  // Completion client, embedding provider, empty session registry.
  let state = Arc::new(AppState::from_settings(&settings).await?);
  let app = build_router(state);

  let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "docent_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "docent_backend", "HTTP server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(target: "docent_backend", error = %e, "Failed to listen for Ctrl-C");
  }
}
