//! Encoding and decoding helpers between Pulseboard domain types and the
//! column representations stored in SQLite.
//!
//! Timestamps are stored as integer microseconds since the Unix epoch so that
//! range scans order numerically. Statuses are stored by their wire name.

use chrono::{DateTime, Utc};
use pulseboard_core::{event::Event, ids::CheckId, status::Status};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_ts(dt: DateTime<Utc>) -> i64 { dt.timestamp_micros() }

pub fn decode_ts(micros: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp_micros(micros).ok_or(Error::TimestampRange(micros))
}

// ─── Status ──────────────────────────────────────────────────────────────────

pub fn encode_status(status: Status) -> &'static str { status.as_str() }

pub fn decode_status(s: &str) -> Result<Status> { Ok(s.parse()?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from an `events` row.
pub struct RawEvent {
  pub check_id:       i64,
  pub ts_micros:      i64,
  pub status:         String,
  pub message:        String,
  pub correlation_id: Option<String>,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      check_id:       row.get(0)?,
      ts_micros:      row.get(1)?,
      status:         row.get(2)?,
      message:        row.get(3)?,
      correlation_id: row.get(4)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      check_id:       CheckId(self.check_id),
      timestamp:      decode_ts(self.ts_micros)?,
      status:         decode_status(&self.status)?,
      message:        self.message,
      correlation_id: self.correlation_id,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_keep_microsecond_precision() {
    let dt = Utc.timestamp_micros(1_714_550_400_123_456).unwrap();
    assert_eq!(decode_ts(encode_ts(dt)).unwrap(), dt);
  }

  #[test]
  fn unknown_status_text_is_an_error() {
    assert!(matches!(decode_status("FINE"), Err(Error::Core(_))));
  }
}
