//! Per-(dashboard, window) feeds and the timeline cache behind them.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use pulseboard_core::{
  aggregate::aggregate,
  event::Event,
  ids::{CheckId, DashboardId, GroupId, SubjectId},
  timeline::{Timeline, TimelineInterval},
  topology::{Group, Topology},
  window::Window,
};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
  message::{CheckSnapshot, Delta, GroupInterval, GroupSnapshot, Snapshot, StreamMessage},
  subscription::SubscriptionId,
};

// ─── Key ─────────────────────────────────────────────────────────────────────

/// Subscribers sharing a dashboard and a window share one feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct FeedKey {
  pub dashboard_id: DashboardId,
  pub window:       Window,
}

// ─── Members ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MemberState {
  /// Registered, waiting for its snapshot. Receives no deltas yet.
  Pending,
  Active,
}

pub(crate) struct Member {
  pub tx:     mpsc::Sender<StreamMessage>,
  pub cancel: CancellationToken,
  pub state:  MemberState,
}

/// Why a member could not be written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeliveryFailure {
  /// The subscriber is not draining its channel.
  Full,
  /// The receiving side is gone.
  Closed,
}

// ─── Feed ────────────────────────────────────────────────────────────────────

pub(crate) struct Feed {
  pub key:     FeedKey,
  pub members: Mutex<HashMap<SubscriptionId, Member>>,
  /// Checks this feed shows; `None` until the first snapshot.
  routing:     RwLock<Option<HashSet<CheckId>>>,
  /// Held across snapshot installation and delta computation so the two
  /// never interleave.
  pub cache:   tokio::sync::Mutex<Option<FeedCache>>,
}

impl Feed {
  pub fn new(key: FeedKey) -> Self {
    Self {
      key,
      members: Mutex::new(HashMap::new()),
      routing: RwLock::new(None),
      cache: tokio::sync::Mutex::new(None),
    }
  }

  /// Whether `event` can change anything this feed has sent.
  ///
  /// A feed still loading its first snapshot takes every event; the update
  /// waits on the cache and filters again once it is installed. Events from
  /// before the window are kept too, since they may change the status the
  /// window opens with.
  pub fn wants(&self, event: &Event) -> bool {
    self
      .routing
      .read()
      .as_ref()
      .is_none_or(|checks| checks.contains(&event.check_id))
  }

  /// Store `fresh` as the feed's cache and update routing to match.
  pub fn install(&self, slot: &mut Option<FeedCache>, fresh: FeedCache) {
    *self.routing.write() = Some(fresh.topology.all_check_ids().into_iter().collect());
    *slot = Some(fresh);
  }

  /// Deliver a snapshot to a pending member and mark it active. Returns
  /// `false` if the member is gone or could not take the message.
  pub fn activate(&self, id: SubscriptionId, snapshot: Snapshot) -> bool {
    let mut members = self.members.lock();
    let Some(member) = members.get_mut(&id) else { return false };
    match member.tx.try_send(StreamMessage::Snapshot(snapshot)) {
      Ok(()) => {
        member.state = MemberState::Active;
        true
      }
      Err(_) => false,
    }
  }

  /// `try_send` `message` to every active member, returning those that
  /// failed.
  pub fn broadcast(
    &self,
    message: &StreamMessage,
  ) -> Vec<(SubscriptionId, DeliveryFailure)> {
    let members = self.members.lock();
    let mut failed = Vec::new();
    for (id, member) in members.iter() {
      if member.state != MemberState::Active {
        continue;
      }
      match member.tx.try_send(message.clone()) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => failed.push((*id, DeliveryFailure::Full)),
        Err(TrySendError::Closed(_)) => failed.push((*id, DeliveryFailure::Closed)),
      }
    }
    debug!(
      dashboard = %self.key.dashboard_id,
      window = %self.key.window,
      failed = failed.len(),
      "broadcast {}",
      message.event_name()
    );
    failed
  }
}

// ─── Cache ───────────────────────────────────────────────────────────────────

/// The timelines a feed last sent, all starting at `window_start`.
#[derive(Debug, Clone)]
pub(crate) struct FeedCache {
  pub topology:     Topology,
  pub window_start: DateTime<Utc>,
  pub checks:       HashMap<CheckId, Timeline>,
  pub groups:       HashMap<GroupId, Timeline>,
  pub dashboard:    Timeline,
}

impl FeedCache {
  /// Derive group and dashboard timelines from a full set of check
  /// timelines.
  pub fn new(
    topology: Topology,
    window_start: DateTime<Utc>,
    checks: HashMap<CheckId, Timeline>,
  ) -> Self {
    let mut checks = checks;
    for check_id in topology.all_check_ids() {
      checks
        .entry(check_id)
        .or_insert_with(|| Timeline::unknown(SubjectId::Check(check_id), window_start));
    }
    for timeline in checks.values_mut() {
      enforce_invariants(timeline);
    }

    let groups: HashMap<GroupId, Timeline> = topology
      .groups
      .iter()
      .map(|g| (g.group_id, group_timeline(g, &checks, window_start)))
      .collect();
    let dashboard = dashboard_timeline(&topology, &checks, &groups, window_start);

    Self { topology, window_start, checks, groups, dashboard }
  }

  pub fn snapshot(&self) -> Snapshot {
    let check = |check_id: CheckId| CheckSnapshot {
      check_id,
      intervals: self
        .checks
        .get(&check_id)
        .map(|t| t.intervals.clone())
        .unwrap_or_default(),
    };

    Snapshot {
      dashboard_id:       self.topology.dashboard_id,
      window_start:       self.window_start,
      groups:             self
        .topology
        .groups
        .iter()
        .map(|g| GroupSnapshot {
          group_id:  g.group_id,
          name:      g.name.clone(),
          intervals: self
            .groups
            .get(&g.group_id)
            .map(|t| t.intervals.clone())
            .unwrap_or_default(),
          checks:    g.check_ids.iter().copied().map(check).collect(),
        })
        .collect(),
      ungrouped_checks:   self
        .topology
        .ungrouped_check_ids
        .iter()
        .copied()
        .map(check)
        .collect(),
      dashboard_interval: self.dashboard.intervals.clone(),
    }
  }

  /// Replace the timeline of `check_id` with `fresh` and recompute the
  /// aggregates above it. Returns every interval that moved, or `None` if
  /// `fresh` matches what was cached.
  pub fn apply_check(&mut self, check_id: CheckId, mut fresh: Timeline) -> Option<Delta> {
    enforce_invariants(&mut fresh);
    let from = self.window_start;
    let check_intervals = changed_intervals(self.checks.get(&check_id), &fresh, from);
    if check_intervals.is_empty() {
      return None;
    }
    self.checks.insert(check_id, fresh);

    let mut group_intervals = Vec::new();
    for group in self.topology.groups_containing(check_id) {
      let timeline = group_timeline(group, &self.checks, from);
      let changed = changed_intervals(self.groups.get(&group.group_id), &timeline, from);
      group_intervals.extend(
        changed
          .into_iter()
          .map(|interval| GroupInterval { group_id: group.group_id, interval }),
      );
      self.groups.insert(group.group_id, timeline);
    }

    let dashboard = dashboard_timeline(&self.topology, &self.checks, &self.groups, from);
    let dashboard_intervals = changed_intervals(Some(&self.dashboard), &dashboard, from);
    self.dashboard = dashboard;

    Some(Delta { check_id, check_intervals, group_intervals, dashboard_intervals })
  }

  /// Deltas that bring a subscriber holding `self` up to `fresh`.
  ///
  /// Used when a new subscriber refreshes a feed that already has active
  /// members: anything the refresh picked up that those members have not
  /// been told about yet is sent to them here. Timelines are compared from
  /// `fresh.window_start` onward, since that is all `fresh` covers.
  pub fn catch_up(&self, fresh: &FeedCache) -> Vec<Delta> {
    let from = fresh.window_start;
    let dashboard_intervals = changed_intervals(Some(&self.dashboard), &fresh.dashboard, from);

    let mut deltas = Vec::new();
    for check_id in fresh.topology.all_check_ids() {
      let Some(new) = fresh.checks.get(&check_id) else { continue };
      let check_intervals = changed_intervals(self.checks.get(&check_id), new, from);
      if check_intervals.is_empty() {
        continue;
      }

      let group_intervals = fresh
        .topology
        .groups_containing(check_id)
        .filter_map(|g| Some((g.group_id, fresh.groups.get(&g.group_id)?)))
        .flat_map(|(group_id, new)| {
          changed_intervals(self.groups.get(&group_id), new, from)
            .into_iter()
            .map(move |interval| GroupInterval { group_id, interval })
        })
        .collect();

      deltas.push(Delta {
        check_id,
        check_intervals,
        group_intervals,
        dashboard_intervals: dashboard_intervals.clone(),
      });
    }
    deltas
  }
}

// ─── Aggregation helpers ─────────────────────────────────────────────────────

fn group_timeline(
  group: &Group,
  checks: &HashMap<CheckId, Timeline>,
  window_start: DateTime<Utc>,
) -> Timeline {
  let inputs = group.check_ids.iter().filter_map(|id| checks.get(id));
  let mut timeline =
    aggregate(SubjectId::Group(group.group_id), inputs).or_unknown(window_start);
  enforce_invariants(&mut timeline);
  timeline
}

/// Group timelines plus ungrouped check timelines, merged.
fn dashboard_timeline(
  topology: &Topology,
  checks: &HashMap<CheckId, Timeline>,
  groups: &HashMap<GroupId, Timeline>,
  window_start: DateTime<Utc>,
) -> Timeline {
  let inputs = topology
    .groups
    .iter()
    .filter_map(|g| groups.get(&g.group_id))
    .chain(topology.ungrouped_check_ids.iter().filter_map(|id| checks.get(id)));
  let mut timeline =
    aggregate(SubjectId::Dashboard(topology.dashboard_id), inputs).or_unknown(window_start);
  enforce_invariants(&mut timeline);
  timeline
}

/// The intervals of `new` from the first instant, at or after `from`, where
/// it disagrees with `old`. Empty when the two agree from `from` onward.
fn changed_intervals(
  old: Option<&Timeline>,
  new: &Timeline,
  from: DateTime<Utc>,
) -> Vec<TimelineInterval> {
  let new = new.clipped_from(from);
  let diverges = match old {
    Some(old) => old.clipped_from(from).first_divergence(&new),
    None => Some(from),
  };
  let Some(at) = diverges else { return Vec::new() };
  new
    .intervals
    .into_iter()
    .filter(|i| i.end_time.is_none_or(|end| end > at))
    .collect()
}

/// Panic on a malformed timeline in debug builds; repair and warn otherwise.
pub(crate) fn enforce_invariants(timeline: &mut Timeline) {
  if let Err(err) = timeline.check_invariants() {
    if cfg!(debug_assertions) {
      panic!("{err}");
    }
    let dropped = timeline.repair();
    warn!(subject = %timeline.subject, dropped, "repaired malformed timeline: {err}");
  }
}
