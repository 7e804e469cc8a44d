//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{BytesRejection, PathRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use pipecard_core::{Error, ErrorKind};
use serde_json::json;
use thiserror::Error;

/// Message returned for every storage failure. The underlying error is
/// logged, never sent.
pub const STORAGE_FAILURE: &str = "internal storage error";

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<Error> for ApiError {
  fn from(e: Error) -> Self {
    match e.kind() {
      ErrorKind::Input => ApiError::BadRequest(e.to_string()),
      ErrorKind::NotFound => ApiError::NotFound(e.to_string()),
      ErrorKind::Conflict => ApiError::Conflict(e.to_string()),
      ErrorKind::Storage => match e {
        Error::Store(inner) => ApiError::Store(inner),
        other => ApiError::Store(Box::new(other)),
      },
    }
  }
}

impl From<PathRejection> for ApiError {
  fn from(e: PathRejection) -> Self { ApiError::BadRequest(e.body_text()) }
}

impl From<BytesRejection> for ApiError {
  fn from(e: BytesRejection) -> Self {
    tracing::debug!(status = %e.status(), "request body rejected");
    ApiError::BadRequest(e.body_text())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, STORAGE_FAILURE.to_owned())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
