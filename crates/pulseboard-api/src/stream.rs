//! `GET /dashboards/{id}/stream`: the live server-sent-event feed.
//!
//! The first event is `INITIALIZED` with the full snapshot; every later one
//! is `UPDATED` with a delta. The stream ends when the subscription is closed
//! and the subscription is released when the client disconnects.

use std::convert::Infallible;

use axum::{
  extract::{Path, Query, State},
  response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt as _};
use pulseboard_core::{
  ids::DashboardId,
  store::{EventStore, TopologySource},
};
use pulseboard_stream::StreamMessage;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct WindowParams {
  /// ISO-8601 hour duration, e.g. `PT24H`. Defaults to the configured window.
  pub window: Option<String>,
}

/// `GET /dashboards/{id}/stream[?window=PT<n>H]`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  Query(params): Query<WindowParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError>
where
  S: EventStore + TopologySource + 'static,
{
  let dashboard_id = DashboardId(id);
  // Rejected here, before any snapshot work.
  let window = state.manager.parse_window(params.window.as_deref())?;
  let subscription = state.manager.subscribe(dashboard_id, window).await?;
  info!(id = %subscription.id(), dashboard = %dashboard_id, %window, "stream opened");

  let keep_alive = KeepAlive::new().interval(state.manager.config().keep_alive());
  let events = subscription.filter_map(|message| async move { to_sse(&message).map(Ok) });
  Ok(Sse::new(events).keep_alive(keep_alive))
}

fn to_sse(message: &StreamMessage) -> Option<Event> {
  match Event::default().event(message.event_name()).json_data(message) {
    Ok(event) => Some(event),
    Err(err) => {
      warn!(error = %err, "failed to encode stream message");
      None
    }
  }
}
