//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("engine error: {0}")]
  Engine(#[source] vouch_core::Error),
}

impl From<vouch_core::Error> for ApiError {
  fn from(err: vouch_core::Error) -> Self {
    use vouch_core::Error as E;
    match err {
      E::ConflictingWeight { .. } => ApiError::Conflict(err.to_string()),
      E::ProfileNotFound(_) | E::HandleNotFound(_) => ApiError::NotFound(err.to_string()),
      E::InvalidQuery(_) => ApiError::BadRequest(err.to_string()),
      e if e.is_validation() => ApiError::BadRequest(e.to_string()),
      e => ApiError::Engine(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Engine(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
