//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;

use axum::{
  extract::{Multipart, Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};

use crate::error::AssistantError;
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;

impl IntoResponse for AssistantError {
  fn into_response(self) -> Response {
    let status = match &self {
      AssistantError::NoActiveDocument
      | AssistantError::UnsupportedFileType(_)
      | AssistantError::EmptyExtraction
      | AssistantError::ExtractionFailed(_)
      | AssistantError::EmptyAnswer
      | AssistantError::EmptyQuestion => StatusCode::BAD_REQUEST,
      AssistantError::UnknownChallengeItem(_) | AssistantError::UnknownSession(_) => StatusCode::NOT_FOUND,
      AssistantError::StaleDocument | AssistantError::StaleChallenge => StatusCode::CONFLICT,
      AssistantError::TooManySessions(_) => StatusCode::SERVICE_UNAVAILABLE,
      AssistantError::CompletionServiceError { .. }
      | AssistantError::CompletionTransport(_)
      | AssistantError::CompletionMalformed(_)
      | AssistantError::GenerationFailed(_)
      | AssistantError::EmbeddingServiceError(_) => StatusCode::BAD_GATEWAY,
      AssistantError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
      warn!(target: "docent_backend", kind = self.kind(), error = %self, "Request failed");
    }
    (status, Json(ErrorOut { error: self.to_string(), kind: self.kind().into() })).into_response()
  }
}

type ApiResult<T> = Result<Json<T>, AssistantError>;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_create_session(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AssistantError> {
  let session = state.create_session().await?;
  Ok((StatusCode::CREATED, Json(SessionOut { session_id: session.id.to_string() })))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_session(
  State(state): State<Arc<AppState>>,
  Path(session_id): Path<String>,
) -> Result<StatusCode, AssistantError> {
  state.close_session(&session_id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(state, multipart))]
pub async fn http_upload(
  State(state): State<Arc<AppState>>,
  Path(session_id): Path<String>,
  mut multipart: Multipart,
) -> ApiResult<UploadOut> {
  let session = state.session(&session_id).await?;

  let mut file: Option<(String, Vec<u8>)> = None;
  while let Some(field) = multipart.next_field().await
    .map_err(|e| AssistantError::ExtractionFailed(format!("multipart: {e}")))?
  {
    if field.name() != Some("file") { continue; }
    let name = field.file_name().unwrap_or_default().to_string();
    let bytes = field.bytes().await
      .map_err(|e| AssistantError::ExtractionFailed(format!("multipart: {e}")))?;
    file = Some((name, bytes.to_vec()));
    break;
  }
  let (filename, bytes) = file
    .filter(|(name, _)| !name.is_empty())
    .ok_or_else(|| AssistantError::UnsupportedFileType("no file selected".into()))?;

  let outcome = logic::upload_file(&state, &session, &filename, bytes).await?;
  info!(target: "docent_backend", session = %session.id, document = %outcome.document_id, "HTTP upload processed");
  Ok(Json(outcome.into()))
}

#[instrument(level = "info", skip(state, body), fields(question_len = body.question.len()))]
pub async fn http_ask(
  State(state): State<Arc<AppState>>,
  Path(session_id): Path<String>,
  Json(body): Json<AskIn>,
) -> ApiResult<AskOut> {
  let session = state.session(&session_id).await?;
  let answer = logic::ask(&state, &session, &body.question).await?;
  Ok(Json(AskOut::new(body.question, answer)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_generate_challenge(
  State(state): State<Arc<AppState>>,
  Path(session_id): Path<String>,
) -> ApiResult<ChallengeOut> {
  let session = state.session(&session_id).await?;
  let items = logic::generate_challenge(&state, &session).await?;
  info!(target: "challenge", session = %session.id, count = items.len(), "HTTP challenge served");
  Ok(Json(ChallengeOut { items: items.into_iter().map(Into::into).collect() }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_challenge(
  State(state): State<Arc<AppState>>,
  Path(session_id): Path<String>,
) -> ApiResult<ChallengeStateOut> {
  let session = state.session(&session_id).await?;
  let snap = logic::challenge_snapshot(&session).await;
  Ok(Json(ChallengeStateOut {
    items: snap.items.into_iter().map(Into::into).collect(),
    results: snap.results.into_iter().map(Into::into).collect(),
  }))
}

#[instrument(level = "info", skip(state, body), fields(answer_len = body.answer.len()))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Path((session_id, index)): Path<(String, usize)>,
  Json(body): Json<AnswerIn>,
) -> ApiResult<ChallengeResultOut> {
  let session = state.session(&session_id).await?;
  let result = logic::evaluate_challenge(&state, &session, index, &body.answer).await?;
  info!(target: "challenge", session = %session.id, index, score = %format!("{:.3}", result.similarity_score), "HTTP answer evaluated");
  Ok(Json(result.into()))
}
