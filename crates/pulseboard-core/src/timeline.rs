//! Timelines: contiguous, coalesced status intervals for one subject.
//!
//! A check's timeline is built from its event log by temporal run-length
//! encoding ([`build`]). Group and dashboard timelines are derived from check
//! timelines by the sweep in [`crate::aggregate`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  event::Event,
  ids::{CheckId, SubjectId},
  status::Status,
  window::Window,
};

// ─── Interval ────────────────────────────────────────────────────────────────

/// A half-open span `[start_time, end_time)` during which a subject had one
/// status. `end_time = None` means the span is still ongoing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineInterval {
  pub status:     Status,
  pub start_time: DateTime<Utc>,
  pub end_time:   Option<DateTime<Utc>>,
}

impl TimelineInterval {
  pub fn open(status: Status, start_time: DateTime<Utc>) -> Self {
    Self { status, start_time, end_time: None }
  }

  pub fn closed(
    status: Status,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
  ) -> Self {
    Self { status, start_time, end_time: Some(end_time) }
  }

  pub fn is_open(&self) -> bool { self.end_time.is_none() }

  /// Whether `t` falls inside `[start_time, end_time)`.
  pub fn contains(&self, t: DateTime<Utc>) -> bool {
    self.start_time <= t && self.end_time.is_none_or(|end| t < end)
  }
}

// ─── Timeline ────────────────────────────────────────────────────────────────

/// The ordered intervals of one subject.
///
/// Invariants (checked by [`Timeline::check_invariants`]): every interval has
/// positive width, each interval ends where the next begins, only the last
/// may be open, and no two neighbours share a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
  pub subject:   SubjectId,
  pub intervals: Vec<TimelineInterval>,
}

impl Timeline {
  pub fn new(subject: SubjectId, intervals: Vec<TimelineInterval>) -> Self {
    Self { subject, intervals }
  }

  pub fn empty(subject: SubjectId) -> Self { Self::new(subject, Vec::new()) }

  /// A single open `UNKNOWN` interval starting at `start`.
  pub fn unknown(subject: SubjectId, start: DateTime<Utc>) -> Self {
    Self::new(subject, vec![TimelineInterval::open(Status::Unknown, start)])
  }

  pub fn is_empty(&self) -> bool { self.intervals.is_empty() }

  /// Replace an empty timeline with [`Timeline::unknown`] from `start`.
  pub fn or_unknown(self, start: DateTime<Utc>) -> Self {
    if self.is_empty() { Self::unknown(self.subject, start) } else { self }
  }

  /// The interval covering `t`, if any.
  pub fn interval_at(&self, t: DateTime<Utc>) -> Option<&TimelineInterval> {
    // Intervals are ordered, so the candidate is the last one starting at or
    // before `t`.
    let idx = self.intervals.partition_point(|i| i.start_time <= t);
    idx
      .checked_sub(1)
      .map(|i| &self.intervals[i])
      .filter(|interval| interval.contains(t))
  }

  pub fn status_at(&self, t: DateTime<Utc>) -> Option<Status> {
    self.interval_at(t).map(|i| i.status)
  }

  /// The same timeline with everything before `start` cut away.
  pub fn clipped_from(&self, start: DateTime<Utc>) -> Timeline {
    let intervals = self
      .intervals
      .iter()
      .filter(|i| i.end_time.is_none_or(|end| end > start))
      .map(|i| TimelineInterval { start_time: i.start_time.max(start), ..*i })
      .collect();
    Timeline::new(self.subject, intervals)
  }

  /// The earliest instant at which `self` and `other` report different
  /// statuses. `None` when they agree everywhere.
  pub fn first_divergence(&self, other: &Timeline) -> Option<DateTime<Utc>> {
    let mut points: Vec<DateTime<Utc>> = self
      .intervals
      .iter()
      .chain(&other.intervals)
      .flat_map(|i| std::iter::once(i.start_time).chain(i.end_time))
      .collect();
    points.sort_unstable();
    points.dedup();
    points.into_iter().find(|&t| self.status_at(t) != other.status_at(t))
  }

  /// Verify the timeline invariants, reporting the first violation.
  pub fn check_invariants(&self) -> Result<()> {
    let violation = |reason: String| Error::InvariantViolation {
      subject: self.subject.to_string(),
      reason,
    };

    for (idx, interval) in self.intervals.iter().enumerate() {
      if let Some(end) = interval.end_time
        && end <= interval.start_time
      {
        return Err(violation(format!("interval {idx} has non-positive width")));
      }
      let Some(next) = self.intervals.get(idx + 1) else { continue };
      match interval.end_time {
        None => {
          return Err(violation(format!("interval {idx} is open but not last")));
        }
        Some(end) if end != next.start_time => {
          return Err(violation(format!(
            "interval {idx} ends at {end} but interval {} starts at {}",
            idx + 1,
            next.start_time
          )));
        }
        Some(_) => {}
      }
      if interval.status == next.status {
        return Err(violation(format!(
          "intervals {idx} and {} share status {}",
          idx + 1,
          interval.status
        )));
      }
    }
    Ok(())
  }

  /// Drop intervals that break ordering or contiguity, then re-coalesce.
  /// Returns how many intervals were removed.
  pub fn repair(&mut self) -> usize {
    let before = self.intervals.len();
    let mut kept: Vec<TimelineInterval> = Vec::with_capacity(before);
    for interval in self.intervals.drain(..) {
      if interval.end_time.is_some_and(|end| end <= interval.start_time) {
        continue;
      }
      match kept.last() {
        None => kept.push(interval),
        Some(prev) if prev.end_time == Some(interval.start_time) => {
          kept.push(interval)
        }
        Some(_) => {}
      }
    }
    self.intervals = coalesce(kept);
    before - self.intervals.len()
  }
}

/// Merge neighbouring intervals that share a status and touch.
pub fn coalesce(intervals: Vec<TimelineInterval>) -> Vec<TimelineInterval> {
  let mut merged: Vec<TimelineInterval> = Vec::with_capacity(intervals.len());
  for next in intervals {
    if let Some(current) = merged.last_mut()
      && current.status == next.status
      && current.end_time == Some(next.start_time)
    {
      current.end_time = next.end_time;
      continue;
    }
    merged.push(next);
  }
  merged
}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// Build the timeline of `check_id` from `window_start` onward.
///
/// - `prior` is the last status recorded strictly before `window_start`.
/// - `events` are the check's events at or after `window_start`; they are
///   sorted here, so callers may pass them in arrival order.
///
/// The result always covers `[window_start, now)` and ends with an open
/// interval.
pub fn build(
  check_id: CheckId,
  window_start: DateTime<Utc>,
  prior: Option<Status>,
  events: &[Event],
) -> Timeline {
  let mut ordered: Vec<&Event> = events
    .iter()
    .filter(|e| Window::covers(window_start, e.timestamp))
    .collect();
  ordered.sort_by_key(|e| e.timestamp);

  let seed = prior.unwrap_or(Status::Unknown);
  let mut intervals = vec![TimelineInterval::open(seed, window_start)];

  for event in ordered {
    apply(&mut intervals, event.timestamp, event.status);
  }

  Timeline::new(SubjectId::Check(check_id), intervals)
}

/// Fold one status change into an open-ended interval list.
fn apply(intervals: &mut Vec<TimelineInterval>, at: DateTime<Utc>, status: Status) {
  let Some(open) = intervals.last_mut() else {
    intervals.push(TimelineInterval::open(status, at));
    return;
  };

  if open.start_time == at {
    // A zero-width interval: the new status replaces it outright.
    open.status = status;
    let len = intervals.len();
    if len >= 2 && intervals[len - 2].status == status {
      intervals.pop();
      intervals[len - 2].end_time = None;
    }
  } else if open.status != status {
    open.end_time = Some(at);
    intervals.push(TimelineInterval::open(status, at));
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  fn t(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
  }

  fn ev(minutes: i64, status: Status) -> Event {
    Event::new(CheckId(7), t(minutes), status)
  }

  fn statuses(timeline: &Timeline) -> Vec<Status> {
    timeline.intervals.iter().map(|i| i.status).collect()
  }

  #[test]
  fn no_events_at_all_is_a_single_unknown_interval() {
    let timeline = build(CheckId(7), t(0), None, &[]);
    assert_eq!(timeline.intervals, vec![TimelineInterval::open(Status::Unknown, t(0))]);
  }

  #[test]
  fn unknown_prefix_then_events() {
    let timeline = build(
      CheckId(7),
      t(0),
      None,
      &[ev(10, Status::Ok), ev(30, Status::Critical)],
    );
    assert_eq!(timeline.intervals, vec![
      TimelineInterval::closed(Status::Unknown, t(0), t(10)),
      TimelineInterval::closed(Status::Ok, t(10), t(30)),
      TimelineInterval::open(Status::Critical, t(30)),
    ]);
    timeline.check_invariants().unwrap();
  }

  #[test]
  fn prior_status_is_carried_into_the_window() {
    let timeline = build(CheckId(7), t(0), Some(Status::Warning), &[]);
    assert_eq!(timeline.intervals, vec![TimelineInterval::open(Status::Warning, t(0))]);
  }

  #[test]
  fn repeated_status_extends_the_open_interval() {
    let timeline = build(
      CheckId(7),
      t(0),
      Some(Status::Ok),
      &[ev(5, Status::Ok), ev(10, Status::Ok), ev(20, Status::Degraded), ev(25, Status::Degraded)],
    );
    assert_eq!(timeline.intervals, vec![
      TimelineInterval::closed(Status::Ok, t(0), t(20)),
      TimelineInterval::open(Status::Degraded, t(20)),
    ]);
  }

  #[test]
  fn event_at_window_start_replaces_the_seed() {
    let timeline = build(CheckId(7), t(0), Some(Status::Critical), &[ev(0, Status::Ok)]);
    assert_eq!(timeline.intervals, vec![TimelineInterval::open(Status::Ok, t(0))]);
  }

  #[test]
  fn out_of_order_events_are_sorted() {
    let timeline = build(
      CheckId(7),
      t(0),
      Some(Status::Ok),
      &[ev(30, Status::Ok), ev(10, Status::Critical)],
    );
    assert_eq!(statuses(&timeline), vec![Status::Ok, Status::Critical, Status::Ok]);
    assert_eq!(timeline.intervals[1].start_time, t(10));
    assert_eq!(timeline.intervals[1].end_time, Some(t(30)));
    timeline.check_invariants().unwrap();
  }

  #[test]
  fn same_timestamp_collision_coalesces_back() {
    // OK, then two events at t=10: the later one returns to OK, so the
    // zero-width CRITICAL disappears and OK stays open from the start.
    let timeline = build(
      CheckId(7),
      t(0),
      Some(Status::Ok),
      &[ev(10, Status::Critical), ev(10, Status::Ok)],
    );
    assert_eq!(timeline.intervals, vec![TimelineInterval::open(Status::Ok, t(0))]);
  }

  #[test]
  fn events_before_window_are_ignored() {
    let timeline = build(CheckId(7), t(0), None, &[ev(-5, Status::Critical)]);
    assert_eq!(timeline.intervals, vec![TimelineInterval::open(Status::Unknown, t(0))]);
  }

  #[test]
  fn interval_lookup_by_time() {
    let timeline = build(
      CheckId(7),
      t(0),
      None,
      &[ev(10, Status::Ok), ev(30, Status::Critical)],
    );
    assert_eq!(timeline.status_at(t(0)), Some(Status::Unknown));
    assert_eq!(timeline.status_at(t(10)), Some(Status::Ok));
    assert_eq!(timeline.status_at(t(29)), Some(Status::Ok));
    assert_eq!(timeline.status_at(t(500)), Some(Status::Critical));
    assert_eq!(timeline.status_at(t(-1)), None);
  }

  #[test]
  fn invariant_checks_catch_gaps_and_duplicates() {
    let gap = Timeline::new(SubjectId::Check(CheckId(1)), vec![
      TimelineInterval::closed(Status::Ok, t(0), t(5)),
      TimelineInterval::open(Status::Critical, t(6)),
    ]);
    assert!(gap.check_invariants().is_err());

    let duplicate = Timeline::new(SubjectId::Check(CheckId(1)), vec![
      TimelineInterval::closed(Status::Ok, t(0), t(5)),
      TimelineInterval::open(Status::Ok, t(5)),
    ]);
    assert!(duplicate.check_invariants().is_err());

    let open_middle = Timeline::new(SubjectId::Check(CheckId(1)), vec![
      TimelineInterval::open(Status::Ok, t(0)),
      TimelineInterval::open(Status::Critical, t(5)),
    ]);
    assert!(open_middle.check_invariants().is_err());
  }

  #[test]
  fn repair_drops_malformed_intervals() {
    let mut timeline = Timeline::new(SubjectId::Check(CheckId(1)), vec![
      TimelineInterval::closed(Status::Ok, t(0), t(5)),
      TimelineInterval::closed(Status::Warning, t(3), t(8)),
      TimelineInterval::closed(Status::Critical, t(5), t(5)),
      TimelineInterval::open(Status::Critical, t(5)),
    ]);
    assert_eq!(timeline.repair(), 2);
    timeline.check_invariants().unwrap();
    assert_eq!(timeline.intervals, vec![
      TimelineInterval::closed(Status::Ok, t(0), t(5)),
      TimelineInterval::open(Status::Critical, t(5)),
    ]);
  }

  #[test]
  fn divergence_is_where_statuses_first_differ() {
    let before = build(CheckId(7), t(0), Some(Status::Ok), &[]);
    let after = build(CheckId(7), t(0), Some(Status::Ok), &[ev(10, Status::Critical)]);
    assert_eq!(after.first_divergence(&before), Some(t(10)));
    assert_eq!(before.first_divergence(&before.clone()), None);
  }

  #[test]
  fn clipping_moves_the_start_forward() {
    let timeline = build(
      CheckId(7),
      t(0),
      None,
      &[ev(10, Status::Ok), ev(30, Status::Critical)],
    );
    let clipped = timeline.clipped_from(t(20));
    assert_eq!(clipped.intervals, vec![
      TimelineInterval::closed(Status::Ok, t(20), t(30)),
      TimelineInterval::open(Status::Critical, t(30)),
    ]);
    assert_eq!(timeline.clipped_from(t(-5)), timeline);
  }
}
