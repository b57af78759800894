//! Core types and algorithms for Pulseboard.
//!
//! This crate turns per-check status events into contiguous timelines and
//! rolls them up through a dashboard's group hierarchy. It performs no I/O of
//! its own: storage is reached through the traits in [`store`], which the
//! backend crates implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod aggregate;
pub mod error;
pub mod event;
pub mod ids;
pub mod status;
pub mod store;
pub mod timeline;
pub mod topology;
pub mod window;

pub use error::{Error, Result};
