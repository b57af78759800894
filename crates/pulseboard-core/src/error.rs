//! Error types for `pulseboard-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown status: {0:?}")]
  UnknownStatus(String),

  #[error("window must be specified in hours (e.g. 'PT24H'), got {0:?}")]
  WindowNotInHours(String),

  #[error("window must be at least 1 hour")]
  WindowTooShort,

  #[error("timeline for {subject} violates its invariants: {reason}")]
  InvariantViolation { subject: String, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
