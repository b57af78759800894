//! HTTP surface for Pulseboard.
//!
//! Exposes an axum [`Router`] over any store implementing both
//! [`EventStore`] and [`TopologySource`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/dashboards/{id}/stream` | SSE; `?window=PT<n>H` |
//! | `GET`  | `/dashboards/{id}/snapshot` | One-off snapshot; `?window=PT<n>H` |
//! | `GET`  | `/checks/{id}/timeline` | One check's timeline; `?window=PT<n>H` |
//! | `POST` | `/events` | Intake; returns 202 |

pub mod error;
pub mod events;
pub mod stream;
pub mod timelines;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use pulseboard_core::store::{EventStore, TopologySource};
use pulseboard_stream::SubscriptionManager;

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store:   Arc<S>,
  pub manager: SubscriptionManager<S>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), manager: self.manager.clone() }
  }
}

impl<S> AppState<S>
where
  S: EventStore + TopologySource + 'static,
{
  pub fn new(store: Arc<S>, manager: SubscriptionManager<S>) -> Self {
    Self { store, manager }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn router<S>(state: AppState<S>) -> Router<()>
where
  S: EventStore + TopologySource + 'static,
{
  Router::new()
    .route("/dashboards/{id}/stream", get(stream::handler::<S>))
    .route("/dashboards/{id}/snapshot", get(timelines::dashboard::<S>))
    .route("/checks/{id}/timeline", get(timelines::check::<S>))
    .route("/events", post(events::create::<S>))
    .with_state(state)
}
