//! The storage seams: `EventStore` and `TopologySource`.
//!
//! Backends (e.g. `pulseboard-store-sqlite`) implement these traits. The
//! stream and API crates depend only on the abstraction.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  event::Event,
  ids::{CheckId, DashboardId},
  status::Status,
  timeline::{self, Timeline},
  topology::Topology,
};

// ─── Events ──────────────────────────────────────────────────────────────────

/// Durable, per-check, time-ordered event log.
///
/// All methods return `Send` futures so the trait can be used from tokio
/// tasks and `axum` handlers.
pub trait EventStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist `event`. A second event with the same `(check_id, timestamp)`
  /// replaces the first.
  fn record_event<'a>(
    &'a self,
    event: &'a Event,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The status of the latest event strictly before `before`, if any.
  fn last_status_before(
    &self,
    check_id: CheckId,
    before: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Status>, Self::Error>> + Send + '_;

  /// Every event at or after `since`, ordered by timestamp.
  fn events_since(
    &self,
    check_id: CheckId,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;
}

// ─── Topology ────────────────────────────────────────────────────────────────

/// Read-only access to dashboard configuration.
pub trait TopologySource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The grouping of `dashboard_id`. Returns `None` if no such dashboard.
  fn dashboard_topology(
    &self,
    dashboard_id: DashboardId,
  ) -> impl Future<Output = Result<Option<Topology>, Self::Error>> + Send + '_;
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Fetch what [`timeline::build`] needs from `store` and build the timeline
/// of `check_id` from `window_start`.
pub async fn fetch_check_timeline<S: EventStore>(
  store: &S,
  check_id: CheckId,
  window_start: DateTime<Utc>,
) -> Result<Timeline, S::Error> {
  let prior = store.last_status_before(check_id, window_start).await?;
  let events = store.events_since(check_id, window_start).await?;
  Ok(timeline::build(check_id, window_start, prior, &events))
}
