//! Status events: the immutable input to every timeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ids::CheckId, status::Status};

/// A status reported by a check at a point in time.
///
/// Identity is `(check_id, timestamp)`; a second event with the same pair
/// replaces the first in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
  pub check_id:       CheckId,
  pub timestamp:      DateTime<Utc>,
  pub status:         Status,
  pub message:        String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub correlation_id: Option<String>,
}

impl Event {
  /// Convenience constructor with an empty message and no correlation id.
  pub fn new(check_id: CheckId, timestamp: DateTime<Utc>, status: Status) -> Self {
    Self {
      check_id,
      timestamp,
      status,
      message: String::new(),
      correlation_id: None,
    }
  }

  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.message = message.into();
    self
  }
}
