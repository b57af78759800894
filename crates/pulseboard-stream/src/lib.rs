//! Live dashboard subscriptions for Pulseboard.
//!
//! [`SubscriptionManager`] keeps one [`feed`] per `(dashboard, window)` pair
//! with at least one subscriber. A feed caches the check, group and
//! dashboard timelines it last sent, so each ingested event only rebuilds
//! what it touches and turns the difference into a [`Delta`].
//!
//! Every subscriber receives exactly one [`Snapshot`] first, then deltas in
//! the order they were computed, over a bounded channel.

mod feed;
mod registry;
mod retry;

pub mod config;
pub mod error;
pub mod manager;
pub mod message;
pub mod subscription;

pub use config::StreamConfig;
pub use error::{Error, Result};
pub use manager::SubscriptionManager;
pub use message::{Delta, Snapshot, StreamMessage};
pub use subscription::{Subscription, SubscriptionId, SubscriptionState};
