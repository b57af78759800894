//! The ranked status vocabulary and the worst-of reducer.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Health of a check at a point in time.
///
/// Only statuses that are *considered for worst* take part in rollups; the
/// others (`Detached`, `Unknown`) lose every comparison against a considered
/// status.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
  Ok,
  Degraded,
  Maintenance,
  Warning,
  Critical,
  Detached,
  Unknown,
}

impl Status {
  pub const ALL: [Status; 7] = [
    Status::Ok,
    Status::Degraded,
    Status::Maintenance,
    Status::Warning,
    Status::Critical,
    Status::Detached,
    Status::Unknown,
  ];

  /// Display text; carries no meaning for the algorithms.
  pub fn description(self) -> &'static str {
    match self {
      Self::Ok => "Service is responding normally",
      Self::Degraded => "Service is responding slowly",
      Self::Maintenance => "Service is under maintenance",
      Self::Warning => "Service is responding with errors",
      Self::Critical => "Service is not responding",
      Self::Detached => "Service is not attached to the monitoring system",
      Self::Unknown => "The status of the service is unknown",
    }
  }

  pub fn considered_for_worst(self) -> bool {
    !matches!(self, Self::Detached | Self::Unknown)
  }

  /// Rank among considered statuses; higher is worse. Non-considered
  /// statuses report `-1`.
  pub fn severity(self) -> i32 {
    match self {
      Self::Ok => 0,
      Self::Degraded => 1,
      Self::Maintenance => 2,
      Self::Warning => 3,
      Self::Critical => 4,
      Self::Detached | Self::Unknown => -1,
    }
  }

  pub fn is_healthy(self) -> bool { self == Self::Ok }

  /// The worse of `a` and `b`.
  ///
  /// Non-considered statuses never beat a considered one. When neither is
  /// considered, or both share a severity, `a` is returned.
  pub fn worst(a: Status, b: Status) -> Status {
    match (a.considered_for_worst(), b.considered_for_worst()) {
      (true, true) if b.severity() > a.severity() => b,
      (true, _) => a,
      (false, true) => b,
      (false, false) => a,
    }
  }

  /// Fold [`Status::worst`] over `statuses`. Returns `None` only when the
  /// iterator is empty; a set of only non-considered statuses yields the
  /// first of them.
  pub fn worst_of<I>(statuses: I) -> Option<Status>
  where
    I: IntoIterator<Item = Status>,
  {
    statuses.into_iter().reduce(Status::worst)
  }

  /// The wire name, e.g. `"CRITICAL"`.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Ok => "OK",
      Self::Degraded => "DEGRADED",
      Self::Maintenance => "MAINTENANCE",
      Self::Warning => "WARNING",
      Self::Critical => "CRITICAL",
      Self::Detached => "DETACHED",
      Self::Unknown => "UNKNOWN",
    }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Status {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Status::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| Error::UnknownStatus(s.to_owned()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn worst_prefers_higher_severity() {
    assert_eq!(Status::worst(Status::Ok, Status::Critical), Status::Critical);
    assert_eq!(Status::worst(Status::Warning, Status::Degraded), Status::Warning);
  }

  #[test]
  fn worst_is_commutative_over_all_pairs() {
    for a in Status::ALL {
      for b in Status::ALL {
        if a.considered_for_worst() || b.considered_for_worst() {
          assert_eq!(Status::worst(a, b), Status::worst(b, a), "{a} vs {b}");
        }
      }
    }
  }

  #[test]
  fn worst_is_associative_over_considered_statuses() {
    let considered: Vec<_> =
      Status::ALL.into_iter().filter(|s| s.considered_for_worst()).collect();
    for &a in &considered {
      for &b in &considered {
        for &c in &considered {
          assert_eq!(
            Status::worst(Status::worst(a, b), c),
            Status::worst(a, Status::worst(b, c)),
          );
        }
      }
    }
  }

  #[test]
  fn non_considered_never_beats_considered() {
    assert_eq!(Status::worst(Status::Unknown, Status::Ok), Status::Ok);
    assert_eq!(Status::worst(Status::Ok, Status::Detached), Status::Ok);
    assert_eq!(
      Status::worst_of([Status::Unknown, Status::Detached, Status::Degraded]),
      Some(Status::Degraded),
    );
  }

  #[test]
  fn neither_considered_returns_first() {
    assert_eq!(Status::worst(Status::Detached, Status::Unknown), Status::Detached);
    assert_eq!(Status::worst(Status::Unknown, Status::Detached), Status::Unknown);
    assert_eq!(
      Status::worst_of([Status::Unknown, Status::Detached]),
      Some(Status::Unknown),
    );
  }

  #[test]
  fn worst_of_empty_is_none() {
    assert_eq!(Status::worst_of(Vec::<Status>::new()), None);
  }

  #[test]
  fn only_ok_is_healthy() {
    for status in Status::ALL {
      assert_eq!(status.is_healthy(), status == Status::Ok);
    }
  }

  #[test]
  fn parses_wire_names() {
    assert_eq!("MAINTENANCE".parse::<Status>().unwrap(), Status::Maintenance);
    assert!("maintenance".parse::<Status>().is_err());
    assert_eq!(
      serde_json::to_string(&Status::Critical).unwrap(),
      "\"CRITICAL\""
    );
  }
}
