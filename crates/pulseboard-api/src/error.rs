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

  #[error("service unavailable: {0}")]
  Unavailable(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<pulseboard_stream::Error> for ApiError {
  fn from(err: pulseboard_stream::Error) -> Self {
    use pulseboard_stream::Error as E;
    match err {
      E::Core(e) => ApiError::BadRequest(e.to_string()),
      E::DashboardNotFound(id) => ApiError::NotFound(format!("{id} not found")),
      E::Cancelled | E::ShuttingDown => ApiError::Unavailable(err.to_string()),
      E::Store(e) => ApiError::Store(e),
    }
  }
}

impl From<pulseboard_core::Error> for ApiError {
  fn from(err: pulseboard_core::Error) -> Self { ApiError::BadRequest(err.to_string()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
