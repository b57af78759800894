//! Ad-hoc timeline queries: one check, or a whole dashboard.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::Utc;
use pulseboard_core::{
  ids::{CheckId, DashboardId},
  store::{EventStore, TopologySource, fetch_check_timeline},
  timeline::Timeline,
};
use pulseboard_stream::Snapshot;

use crate::{AppState, error::ApiError, stream::WindowParams};

/// `GET /checks/{id}/timeline[?window=PT<n>H]`
pub async fn check<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  Query(params): Query<WindowParams>,
) -> Result<Json<Timeline>, ApiError>
where
  S: EventStore + TopologySource + 'static,
{
  let window = state.manager.parse_window(params.window.as_deref())?;
  let window_start = window.start_from(Utc::now());
  let timeline = fetch_check_timeline(state.store.as_ref(), CheckId(id), window_start)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(timeline))
}

/// `GET /dashboards/{id}/snapshot[?window=PT<n>H]`: the same payload a new
/// stream starts with.
pub async fn dashboard<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  Query(params): Query<WindowParams>,
) -> Result<Json<Snapshot>, ApiError>
where
  S: EventStore + TopologySource + 'static,
{
  let window = state.manager.parse_window(params.window.as_deref())?;
  let snapshot = state.manager.snapshot(DashboardId(id), window).await?;
  Ok(Json(snapshot))
}
