//! Tunables for the subscription manager.

use std::time::Duration;

use pulseboard_core::window::Window;
use serde::Deserialize;

/// Stream settings, usually read from the `[stream]` table of the server
/// configuration. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
  /// Window used when a subscriber does not ask for one.
  pub default_window_hours: u32,
  /// Messages buffered per subscriber before it is dropped as too slow.
  pub channel_capacity:     usize,
  /// Store reads attempted per snapshot or delta before giving up.
  pub retry_attempts:       u32,
  /// First retry delay; doubles after each failure.
  pub retry_base_delay_ms:  u64,
  /// Interval between SSE keep-alive comments.
  pub keep_alive_secs:      u64,
}

impl Default for StreamConfig {
  fn default() -> Self {
    Self {
      default_window_hours: 2,
      channel_capacity:     64,
      retry_attempts:       3,
      retry_base_delay_ms:  100,
      keep_alive_secs:      15,
    }
  }
}

impl StreamConfig {
  /// The configured default window, falling back to `PT2H` if the
  /// configured value is not a valid window.
  pub fn default_window(&self) -> Window {
    Window::from_hours(self.default_window_hours).unwrap_or_default()
  }

  pub fn retry_base_delay(&self) -> Duration {
    Duration::from_millis(self.retry_base_delay_ms)
  }

  pub fn keep_alive(&self) -> Duration { Duration::from_secs(self.keep_alive_secs) }
}
