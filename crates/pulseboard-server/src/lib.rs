//! Wiring for the Pulseboard server binary: configuration and app assembly.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use pulseboard_api::AppState;
use pulseboard_core::store::{EventStore, TopologySource};
use pulseboard_stream::{StreamConfig, SubscriptionManager};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered with
/// `PULSEBOARD_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub stream:     StreamConfig,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("pulseboard.db") }

impl ServerConfig {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("PULSEBOARD")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── App ─────────────────────────────────────────────────────────────────────

/// The full HTTP app for `store`, plus the manager so the caller can shut it
/// down.
pub fn app<S>(store: Arc<S>, config: &ServerConfig) -> (Router, SubscriptionManager<S>)
where
  S: EventStore + TopologySource + 'static,
{
  let manager = SubscriptionManager::new(Arc::clone(&store), config.stream.clone());
  let state = AppState::new(store, manager.clone());
  let router = pulseboard_api::router(state).layer(TraceLayer::new_for_http());
  (router, manager)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn from_toml(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.store_path, PathBuf::from("pulseboard.db"));
    assert_eq!(cfg.stream.channel_capacity, 64);
    assert_eq!(cfg.stream.default_window().to_string(), "PT2H");
  }

  #[test]
  fn stream_table_overrides_individual_fields() {
    let cfg = from_toml(
      r#"
        port = 9000

        [stream]
        default_window_hours = 24
        keep_alive_secs = 5
      "#,
    );
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.stream.default_window().hours(), 24);
    assert_eq!(cfg.stream.keep_alive_secs, 5);
    assert_eq!(cfg.stream.retry_attempts, 3);
  }

  #[test]
  fn tilde_expands_to_home() {
    if let Ok(home) = std::env::var("HOME") {
      let path = expand_tilde(Path::new("~/pulse/data.db"));
      assert_eq!(path, PathBuf::from(home).join("pulse/data.db"));
    }
    let absolute = expand_tilde(Path::new("/var/lib/pulseboard.db"));
    assert_eq!(absolute, PathBuf::from("/var/lib/pulseboard.db"));
  }
}
