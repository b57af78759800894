//! The live feed set, keyed by `(dashboard, window)`.
//!
//! Lock order is always registry, then a feed's member map. Neither lock is
//! ever held across an `.await`.

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use pulseboard_core::event::Event;

use crate::{
  feed::{Feed, FeedKey, Member, MemberState},
  subscription::SubscriptionId,
};

#[derive(Default)]
pub(crate) struct Registry {
  feeds: RwLock<HashMap<FeedKey, Arc<Feed>>>,
}

impl Registry {
  /// Add `member` to the feed for `key`, creating the feed if needed.
  pub fn join(&self, key: FeedKey, id: SubscriptionId, member: Member) -> Arc<Feed> {
    let mut feeds = self.feeds.write();
    let feed = feeds.entry(key).or_insert_with(|| Arc::new(Feed::new(key)));
    feed.members.lock().insert(id, member);
    Arc::clone(feed)
  }

  /// Remove a member, dropping its feed once empty. Idempotent; returns
  /// whether anything was removed.
  pub fn leave(&self, key: &FeedKey, id: SubscriptionId) -> bool {
    let mut feeds = self.feeds.write();
    let Some(feed) = feeds.get(key) else { return false };
    let (removed, now_empty) = {
      let mut members = feed.members.lock();
      let removed = members.remove(&id);
      (removed, members.is_empty())
    };
    if now_empty {
      feeds.remove(key);
    }
    match removed {
      Some(member) => {
        member.cancel.cancel();
        true
      }
      None => false,
    }
  }

  /// Feeds whose dashboard contains the event's check, plus any still
  /// loading their first snapshot.
  pub fn feeds_for(&self, event: &Event) -> Vec<Arc<Feed>> {
    self
      .feeds
      .read()
      .values()
      .filter(|feed| feed.wants(event))
      .cloned()
      .collect()
  }

  pub fn member_state(&self, key: &FeedKey, id: SubscriptionId) -> Option<MemberState> {
    let feeds = self.feeds.read();
    let feed = feeds.get(key)?;
    feed.members.lock().get(&id).map(|m| m.state)
  }

  /// Close every member of every feed. Returns how many were closed.
  pub fn clear(&self) -> usize {
    let drained: Vec<Arc<Feed>> = self.feeds.write().drain().map(|(_, f)| f).collect();
    let mut closed = 0;
    for feed in drained {
      for (_, member) in feed.members.lock().drain() {
        member.cancel.cancel();
        closed += 1;
      }
    }
    closed
  }

  pub fn feed_count(&self) -> usize { self.feeds.read().len() }

  pub fn subscriber_count(&self) -> usize {
    self.feeds.read().values().map(|f| f.members.lock().len()).sum()
  }
}
