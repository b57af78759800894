//! Error type for `pulseboard-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] pulseboard_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("timestamp out of range: {0} microseconds")]
  TimestampRange(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
