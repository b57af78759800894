//! Error type for `pulseboard-stream`.

use pulseboard_core::ids::DashboardId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] pulseboard_core::Error),

  /// A backend read failed after every retry.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("dashboard not found: {0}")]
  DashboardNotFound(DashboardId),

  /// The subscription was closed before its snapshot was delivered.
  #[error("subscription cancelled")]
  Cancelled,

  #[error("subscription manager is shutting down")]
  ShuttingDown,
}

impl Error {
  pub(crate) fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
