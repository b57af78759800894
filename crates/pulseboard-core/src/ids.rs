//! Identifiers for the three kinds of timeline subject.
//!
//! Checks, groups and dashboards share one timeline shape; what differs is
//! only the tag on [`SubjectId`].

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
  ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
      Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub i64);

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, concat!($prefix, "#{}"), self.0)
      }
    }

    impl From<i64> for $name {
      fn from(raw: i64) -> Self { Self(raw) }
    }
  };
}

id_type!(
  /// A monitored entity; the unit at which raw events are reported.
  CheckId,
  "check"
);
id_type!(
  /// A named group of checks inside one dashboard.
  GroupId,
  "group"
);
id_type!(DashboardId, "dashboard");

/// Whose timeline an interval sequence describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum SubjectId {
  Check(CheckId),
  Group(GroupId),
  Dashboard(DashboardId),
}

impl fmt::Display for SubjectId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Check(id) => id.fmt(f),
      Self::Group(id) => id.fmt(f),
      Self::Dashboard(id) => id.fmt(f),
    }
  }
}

impl From<CheckId> for SubjectId {
  fn from(id: CheckId) -> Self { Self::Check(id) }
}

impl From<GroupId> for SubjectId {
  fn from(id: GroupId) -> Self { Self::Group(id) }
}

impl From<DashboardId> for SubjectId {
  fn from(id: DashboardId) -> Self { Self::Dashboard(id) }
}
