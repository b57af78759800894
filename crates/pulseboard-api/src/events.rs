//! `POST /events`: event intake.
//!
//! Checks the payload, persists it, and only then notifies the subscription
//! manager, so every pushed delta is backed by a stored event.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Duration, Utc};
use pulseboard_core::{
  event::Event,
  ids::CheckId,
  status::Status,
  store::{EventStore, TopologySource},
};
use serde::Deserialize;
use tracing::debug;

use crate::{AppState, error::ApiError};

pub const MAX_MESSAGE_LENGTH: usize = 500;

/// How far in the past an event may be stamped and still be accepted.
pub fn max_event_age() -> Duration { Duration::minutes(15) }

/// JSON body accepted by `POST /events`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
  pub check_id:       CheckId,
  pub timestamp:      DateTime<Utc>,
  pub status:         Status,
  pub message:        String,
  pub correlation_id: Option<String>,
}

impl EventBody {
  /// Validate against `now` and convert into an [`Event`].
  pub fn into_event(self, now: DateTime<Utc>) -> Result<Event, ApiError> {
    if self.message.trim().is_empty() {
      return Err(ApiError::BadRequest("message is required".into()));
    }
    if self.message.chars().count() > MAX_MESSAGE_LENGTH {
      return Err(ApiError::BadRequest(format!(
        "message must be at most {MAX_MESSAGE_LENGTH} characters"
      )));
    }
    if self.timestamp > now {
      return Err(ApiError::BadRequest("timestamp is in the future".into()));
    }
    if self.timestamp < now - max_event_age() {
      return Err(ApiError::BadRequest(format!(
        "timestamp is older than {} minutes",
        max_event_age().num_minutes()
      )));
    }

    Ok(Event {
      check_id:       self.check_id,
      timestamp:      self.timestamp,
      status:         self.status,
      message:        self.message,
      correlation_id: self.correlation_id,
    })
  }
}

/// `POST /events`: returns 202 once the event is stored.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<EventBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EventStore + TopologySource + 'static,
{
  let event = body.into_event(Utc::now())?;
  state
    .store
    .record_event(&event)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  debug!(check = %event.check_id, status = %event.status, "event recorded");

  state.manager.on_event_ingested(&event).await;
  Ok(StatusCode::ACCEPTED)
}
