//! Bounded exponential backoff for store reads.

use std::{fmt::Display, future::Future, time::Duration};

use tokio::time::sleep;
use tracing::warn;

use crate::config::StreamConfig;

const MAX_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
  attempts:   u32,
  base_delay: Duration,
}

impl RetryPolicy {
  pub(crate) fn from_config(config: &StreamConfig) -> Self {
    Self {
      attempts:   config.retry_attempts.max(1),
      base_delay: config.retry_base_delay(),
    }
  }

  /// Delay before retry number `attempt` (1-based).
  pub(crate) fn backoff_for_attempt(&self, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(8);
    self.base_delay.saturating_mul(2u32.saturating_pow(exponent)).min(MAX_DELAY)
  }

  /// Run `op` until it succeeds or the attempts are exhausted, returning the
  /// last error in the latter case.
  pub(crate) async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, E>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
  {
    let mut attempt = 1;
    loop {
      match op().await {
        Ok(value) => return Ok(value),
        Err(err) if attempt < self.attempts => {
          let delay = self.backoff_for_attempt(attempt);
          warn!(attempt, ?delay, error = %err, "{what} failed, retrying");
          sleep(delay).await;
          attempt += 1;
        }
        Err(err) => return Err(err),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};

  use super::*;

  fn policy(attempts: u32) -> RetryPolicy {
    RetryPolicy { attempts, base_delay: Duration::from_millis(1) }
  }

  #[test]
  fn backoff_doubles_and_caps() {
    let p = RetryPolicy { attempts: 3, base_delay: Duration::from_millis(100) };
    assert_eq!(p.backoff_for_attempt(1), Duration::from_millis(100));
    assert_eq!(p.backoff_for_attempt(2), Duration::from_millis(200));
    assert_eq!(p.backoff_for_attempt(30), MAX_DELAY);
  }

  #[tokio::test]
  async fn succeeds_after_transient_failures() {
    let calls = AtomicU32::new(0);
    let result: Result<u32, String> = policy(3)
      .run("probe", || async {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n < 3 { Err(format!("failure {n}")) } else { Ok(n) }
      })
      .await;
    assert_eq!(result, Ok(3));
  }

  #[tokio::test]
  async fn gives_up_after_the_last_attempt() {
    let calls = AtomicU32::new(0);
    let result: Result<(), String> = policy(2)
      .run("probe", || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Err("down".to_owned())
      })
      .await;
    assert_eq!(result, Err("down".to_owned()));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }
}
