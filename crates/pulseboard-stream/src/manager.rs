//! [`SubscriptionManager`]: owns the live feeds and fans events out to them.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use futures::future::{join_all, try_join_all};
use pulseboard_core::{
  event::Event,
  ids::DashboardId,
  store::{EventStore, TopologySource, fetch_check_timeline},
  window::Window,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  config::StreamConfig,
  feed::{DeliveryFailure, Feed, FeedCache, FeedKey, Member, MemberState},
  message::{Snapshot, StreamMessage},
  registry::Registry,
  retry::RetryPolicy,
  subscription::{Subscription, SubscriptionId},
};

/// Live dashboard subscriptions over a store `S`.
///
/// Cloning is cheap; clones share the same subscriptions.
pub struct SubscriptionManager<S> {
  store:    Arc<S>,
  registry: Arc<Registry>,
  config:   Arc<StreamConfig>,
  retry:    RetryPolicy,
  shutdown: CancellationToken,
}

impl<S> Clone for SubscriptionManager<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      registry: Arc::clone(&self.registry),
      config:   Arc::clone(&self.config),
      retry:    self.retry,
      shutdown: self.shutdown.clone(),
    }
  }
}

impl<S> SubscriptionManager<S>
where
  S: EventStore + TopologySource + 'static,
{
  pub fn new(store: Arc<S>, config: StreamConfig) -> Self {
    Self {
      store,
      registry: Arc::new(Registry::default()),
      retry: RetryPolicy::from_config(&config),
      config: Arc::new(config),
      shutdown: CancellationToken::new(),
    }
  }

  pub fn config(&self) -> &StreamConfig { &self.config }

  /// Parse an optional `PT<n>H` window, falling back to the configured
  /// default when absent.
  pub fn parse_window(&self, raw: Option<&str>) -> Result<Window> {
    match raw {
      None => Ok(self.config.default_window()),
      Some(raw) => Ok(raw.parse()?),
    }
  }

  // ── Subscribe ─────────────────────────────────────────────────────────

  /// Open a stream for `dashboard_id` reaching `window` into the past.
  ///
  /// On success the returned subscription already holds its snapshot. On
  /// error nothing stays registered.
  pub async fn subscribe(
    &self,
    dashboard_id: DashboardId,
    window: Window,
  ) -> Result<Subscription> {
    if self.shutdown.is_cancelled() {
      return Err(Error::ShuttingDown);
    }

    let key = FeedKey { dashboard_id, window };
    let id = SubscriptionId::new();
    let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
    let cancel = self.shutdown.child_token();

    let feed = self.registry.join(key, id, Member {
      tx,
      cancel: cancel.clone(),
      state: MemberState::Pending,
    });
    // From here on, dropping `subscription` (including on an early return)
    // unregisters the member.
    let subscription =
      Subscription::new(id, key, rx, cancel.clone(), Arc::downgrade(&self.registry));
    debug!(%id, dashboard = %dashboard_id, %window, "subscription created");

    let mut cache = tokio::select! {
      _ = cancel.cancelled() => return Err(Error::Cancelled),
      guard = feed.cache.lock() => guard,
    };

    let window_start = window.start_from(Utc::now());
    let fresh = tokio::select! {
      _ = cancel.cancelled() => return Err(Error::Cancelled),
      fresh = self.load(dashboard_id, window_start) => fresh?,
    };

    // Existing members have not seen whatever this refresh picked up beyond
    // their last delta.
    let catch_up = cache.as_ref().map(|old| old.catch_up(&fresh)).unwrap_or_default();
    let snapshot = fresh.snapshot();
    feed.install(&mut cache, fresh);
    for delta in catch_up {
      self.deliver(&feed, StreamMessage::Delta(delta));
    }

    if !feed.activate(id, snapshot) {
      return Err(Error::Cancelled);
    }
    drop(cache);

    info!(%id, dashboard = %dashboard_id, %window, "subscription active");
    Ok(subscription)
  }

  /// A one-off snapshot, without subscribing.
  pub async fn snapshot(&self, dashboard_id: DashboardId, window: Window) -> Result<Snapshot> {
    let window_start = window.start_from(Utc::now());
    Ok(self.load(dashboard_id, window_start).await?.snapshot())
  }

  /// Compute every timeline of a dashboard from scratch.
  async fn load(
    &self,
    dashboard_id: DashboardId,
    window_start: DateTime<Utc>,
  ) -> Result<FeedCache> {
    let store = self.store.as_ref();
    let topology = self
      .retry
      .run("topology fetch", || async {
        store.dashboard_topology(dashboard_id).await.map_err(Error::store)
      })
      .await?
      .ok_or(Error::DashboardNotFound(dashboard_id))?;

    let fetches = topology.all_check_ids().into_iter().map(|check_id| async move {
      let timeline = self
        .retry
        .run("check timeline fetch", || async {
          fetch_check_timeline(store, check_id, window_start)
            .await
            .map_err(Error::store)
        })
        .await?;
      Ok::<_, Error>((check_id, timeline))
    });
    let checks: HashMap<_, _> = try_join_all(fetches).await?.into_iter().collect();

    Ok(FeedCache::new(topology, window_start, checks))
  }

  // ── Events ────────────────────────────────────────────────────────────

  /// Fan a durably stored event out to every feed it affects.
  ///
  /// An event from before a feed's window can still change the status the
  /// window opens with, so it is refetched like any other.
  ///
  /// Failures are contained per feed: a feed whose recomputation fails skips
  /// this delta and the others proceed.
  pub async fn on_event_ingested(&self, event: &Event) {
    let feeds = self.registry.feeds_for(event);
    debug!(
      check = %event.check_id,
      status = %event.status,
      feeds = feeds.len(),
      "routing event"
    );
    join_all(feeds.into_iter().map(|feed| self.update_feed(feed, event))).await;
  }

  async fn update_feed(&self, feed: Arc<Feed>, event: &Event) {
    let mut cache = feed.cache.lock().await;
    // Empty until the first snapshot; that snapshot reads the store after
    // this event was stored.
    let Some(state) = cache.as_mut() else { return };
    // The feed may have been refreshed since routing.
    if !state.topology.contains_check(event.check_id) {
      return;
    }

    let store = self.store.as_ref();
    let window_start = state.window_start;
    let fresh = self
      .retry
      .run("check timeline fetch", || {
        fetch_check_timeline(store, event.check_id, window_start)
      })
      .await;
    let fresh = match fresh {
      Ok(timeline) => timeline,
      Err(err) => {
        warn!(
          dashboard = %feed.key.dashboard_id,
          check = %event.check_id,
          error = %err,
          "skipping delta"
        );
        return;
      }
    };

    match state.apply_check(event.check_id, fresh) {
      Some(delta) => self.deliver(&feed, StreamMessage::Delta(delta)),
      None => debug!(
        dashboard = %feed.key.dashboard_id,
        check = %event.check_id,
        "check timeline unchanged"
      ),
    }
  }

  /// Broadcast on `feed` and tear down whoever could not take the message.
  fn deliver(&self, feed: &Feed, message: StreamMessage) {
    for (id, failure) in feed.broadcast(&message) {
      match failure {
        DeliveryFailure::Full => {
          warn!(%id, dashboard = %feed.key.dashboard_id, "subscriber too slow, disconnecting");
        }
        DeliveryFailure::Closed => debug!(%id, "subscriber gone"),
      }
      self.registry.leave(&feed.key, id);
    }
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────

  /// Remove a subscription by id. Idempotent.
  pub fn unsubscribe(&self, subscription: &mut Subscription) { subscription.close(); }

  /// Close every subscription and refuse new ones.
  pub fn shutdown(&self) {
    self.shutdown.cancel();
    let closed = self.registry.clear();
    info!(closed, "subscription manager shut down");
  }

  pub fn subscriber_count(&self) -> usize { self.registry.subscriber_count() }

  pub fn feed_count(&self) -> usize { self.registry.feed_count() }
}
