//! The subscriber-side handle of a live stream.

use std::{
  fmt,
  pin::Pin,
  sync::Weak,
  task::{Context, Poll},
};

use futures::Stream;
use pulseboard_core::{ids::DashboardId, window::Window};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
  feed::{FeedKey, MemberState},
  message::StreamMessage,
  registry::Registry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
  pub(crate) fn new() -> Self { Self(Uuid::new_v4()) }
}

impl fmt::Display for SubscriptionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// `Created → Active → Closed`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
  /// Registered; the snapshot has not been delivered yet.
  Created,
  /// Snapshot delivered; receiving deltas.
  Active,
  Closed,
}

/// A live dashboard stream.
///
/// Yields a [`StreamMessage::Snapshot`] first, then deltas. The stream ends
/// when the subscription is closed by the manager (shutdown, or the
/// subscriber falling too far behind). Dropping the handle unsubscribes.
pub struct Subscription {
  id:       SubscriptionId,
  key:      FeedKey,
  rx:       mpsc::Receiver<StreamMessage>,
  cancel:   CancellationToken,
  registry: Weak<Registry>,
}

impl Subscription {
  pub(crate) fn new(
    id: SubscriptionId,
    key: FeedKey,
    rx: mpsc::Receiver<StreamMessage>,
    cancel: CancellationToken,
    registry: Weak<Registry>,
  ) -> Self {
    Self { id, key, rx, cancel, registry }
  }

  pub fn id(&self) -> SubscriptionId { self.id }

  pub fn dashboard_id(&self) -> DashboardId { self.key.dashboard_id }

  pub fn window(&self) -> Window { self.key.window }

  pub fn state(&self) -> SubscriptionState {
    let state = self
      .registry
      .upgrade()
      .and_then(|registry| registry.member_state(&self.key, self.id));
    match state {
      Some(MemberState::Pending) => SubscriptionState::Created,
      Some(MemberState::Active) => SubscriptionState::Active,
      None => SubscriptionState::Closed,
    }
  }

  /// Resolves once the manager has closed this subscription.
  pub async fn closed(&self) { self.cancel.cancelled().await }

  /// Next message, or `None` once closed and drained.
  pub async fn recv(&mut self) -> Option<StreamMessage> { self.rx.recv().await }

  /// A message if one is already buffered.
  pub fn try_recv(&mut self) -> Option<StreamMessage> { self.rx.try_recv().ok() }

  /// Unsubscribe now. Messages already buffered can still be received.
  pub fn close(&mut self) {
    if let Some(registry) = self.registry.upgrade() {
      registry.leave(&self.key, self.id);
    }
    self.cancel.cancel();
  }
}

impl Stream for Subscription {
  type Item = StreamMessage;

  fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    self.rx.poll_recv(cx)
  }
}

impl Drop for Subscription {
  fn drop(&mut self) { self.close(); }
}

impl fmt::Debug for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription")
      .field("id", &self.id)
      .field("dashboard_id", &self.key.dashboard_id)
      .field("window", &self.key.window)
      .finish_non_exhaustive()
  }
}
