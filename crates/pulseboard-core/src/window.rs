//! Look-back windows, written as ISO-8601 hour durations (`PT2H`).

use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// How far back a snapshot reaches, in whole hours (at least one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Window {
  hours: u32,
}

impl Window {
  pub const DEFAULT: Window = Window { hours: 2 };

  pub fn from_hours(hours: u32) -> crate::Result<Self> {
    if hours == 0 {
      return Err(Error::WindowTooShort);
    }
    Ok(Self { hours })
  }

  pub fn hours(self) -> u32 { self.hours }

  pub fn duration(self) -> Duration { Duration::hours(i64::from(self.hours)) }

  /// The first instant covered by this window when viewed at `now`.
  pub fn start_from(self, now: DateTime<Utc>) -> DateTime<Utc> {
    now
      .checked_sub_signed(self.duration())
      .unwrap_or(DateTime::<Utc>::MIN_UTC)
  }

  /// Whether an event at `t` falls inside a window that starts at
  /// `window_start`.
  pub fn covers(window_start: DateTime<Utc>, t: DateTime<Utc>) -> bool {
    t >= window_start
  }
}

impl Default for Window {
  fn default() -> Self { Self::DEFAULT }
}

impl fmt::Display for Window {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "PT{}H", self.hours)
  }
}

impl FromStr for Window {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let not_hours = || Error::WindowNotInHours(s.to_owned());
    let digits = s
      .strip_prefix("PT")
      .and_then(|rest| rest.strip_suffix('H'))
      .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
      .ok_or_else(not_hours)?;
    let hours: u32 = digits.parse().map_err(|_| not_hours())?;
    Self::from_hours(hours)
  }
}

impl Serialize for Window {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for Window {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
  }
}
