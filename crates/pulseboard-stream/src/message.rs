//! Messages pushed to subscribers.
//!
//! The first message of every stream is a [`Snapshot`] (SSE event name
//! `INITIALIZED`); every later one is a [`Delta`] (`UPDATED`).

use chrono::{DateTime, Utc};
use pulseboard_core::{
  ids::{CheckId, DashboardId, GroupId},
  timeline::TimelineInterval,
};
use serde::{Deserialize, Serialize};

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Full state of a dashboard over a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
  pub dashboard_id:       DashboardId,
  pub window_start:       DateTime<Utc>,
  pub groups:             Vec<GroupSnapshot>,
  pub ungrouped_checks:   Vec<CheckSnapshot>,
  pub dashboard_interval: Vec<TimelineInterval>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSnapshot {
  pub group_id:  GroupId,
  pub name:      String,
  pub intervals: Vec<TimelineInterval>,
  pub checks:    Vec<CheckSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSnapshot {
  pub check_id:  CheckId,
  pub intervals: Vec<TimelineInterval>,
}

// ─── Delta ───────────────────────────────────────────────────────────────────

/// What changed for one check since the subscriber was last told.
///
/// Each list holds the intervals, in order, from the first instant the
/// timeline moved onward; a subscriber replaces whatever it held over those
/// ranges. Group and dashboard intervals are present only for the aggregates
/// whose timeline actually changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delta {
  pub check_id:            CheckId,
  pub check_intervals:     Vec<TimelineInterval>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub group_intervals:     Vec<GroupInterval>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub dashboard_intervals: Vec<TimelineInterval>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInterval {
  pub group_id: GroupId,
  pub interval: TimelineInterval,
}

// ─── Envelope ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StreamMessage {
  Snapshot(Snapshot),
  Delta(Delta),
}

impl StreamMessage {
  /// The SSE `event:` name for this message.
  pub fn event_name(&self) -> &'static str {
    match self {
      Self::Snapshot(_) => "INITIALIZED",
      Self::Delta(_) => "UPDATED",
    }
  }

  pub fn as_snapshot(&self) -> Option<&Snapshot> {
    match self {
      Self::Snapshot(s) => Some(s),
      Self::Delta(_) => None,
    }
  }

  pub fn as_delta(&self) -> Option<&Delta> {
    match self {
      Self::Delta(d) => Some(d),
      Self::Snapshot(_) => None,
    }
  }
}
