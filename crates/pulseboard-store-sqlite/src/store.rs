//! [`SqliteStore`]: the SQLite implementation of [`EventStore`] and
//! [`TopologySource`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use pulseboard_core::{
  event::Event,
  ids::{CheckId, DashboardId, GroupId},
  status::Status,
  store::{EventStore, TopologySource},
  topology::{Group, Topology},
};

use crate::{
  Result,
  encode::{RawEvent, decode_status, encode_status, encode_ts},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Events and dashboard topology backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Replace the whole topology of `topology.dashboard_id`.
  ///
  /// Dashboards are edited elsewhere; this exists to seed the store.
  pub async fn put_topology(&self, topology: &Topology) -> Result<()> {
    let topology = topology.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let dashboard_id = topology.dashboard_id.0;

        tx.execute(
          "DELETE FROM dashboards WHERE dashboard_id = ?1",
          rusqlite::params![dashboard_id],
        )?;
        tx.execute(
          "INSERT INTO dashboards (dashboard_id) VALUES (?1)",
          rusqlite::params![dashboard_id],
        )?;

        for (position, group) in topology.groups.iter().enumerate() {
          tx.execute(
            "INSERT INTO dashboard_groups (group_id, dashboard_id, name, position)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![group.group_id.0, dashboard_id, group.name, position as i64],
          )?;
          for (position, check_id) in group.check_ids.iter().enumerate() {
            tx.execute(
              "INSERT OR IGNORE INTO group_checks (group_id, check_id, position)
               VALUES (?1, ?2, ?3)",
              rusqlite::params![group.group_id.0, check_id.0, position as i64],
            )?;
          }
        }

        for (position, check_id) in topology.ungrouped_check_ids.iter().enumerate() {
          tx.execute(
            "INSERT OR IGNORE INTO dashboard_checks (dashboard_id, check_id, position)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![dashboard_id, check_id.0, position as i64],
          )?;
        }

        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── EventStore impl ─────────────────────────────────────────────────────────

impl EventStore for SqliteStore {
  type Error = crate::Error;

  async fn record_event(&self, event: &Event) -> Result<()> {
    let check_id       = event.check_id.0;
    let ts_micros      = encode_ts(event.timestamp);
    let status         = encode_status(event.status);
    let message        = event.message.clone();
    let correlation_id = event.correlation_id.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO events
             (check_id, ts_micros, status, message, correlation_id)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![check_id, ts_micros, status, message, correlation_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn last_status_before(
    &self,
    check_id: CheckId,
    before: DateTime<Utc>,
  ) -> Result<Option<Status>> {
    let check_id = check_id.0;
    let before = encode_ts(before);

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        let status = conn
          .query_row(
            "SELECT status FROM events
             WHERE check_id = ?1 AND ts_micros < ?2
             ORDER BY ts_micros DESC
             LIMIT 1",
            rusqlite::params![check_id, before],
            |r| r.get(0),
          )
          .optional()?;
        Ok(status)
      })
      .await?;

    raw.as_deref().map(decode_status).transpose()
  }

  async fn events_since(
    &self,
    check_id: CheckId,
    since: DateTime<Utc>,
  ) -> Result<Vec<Event>> {
    let check_id = check_id.0;
    let since = encode_ts(since);

    let rows: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT check_id, ts_micros, status, message, correlation_id
           FROM events
           WHERE check_id = ?1 AND ts_micros >= ?2
           ORDER BY ts_micros ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![check_id, since], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows.into_iter().map(RawEvent::into_event).collect()
  }
}

// ─── TopologySource impl ─────────────────────────────────────────────────────

impl TopologySource for SqliteStore {
  type Error = crate::Error;

  async fn dashboard_topology(
    &self,
    dashboard_id: DashboardId,
  ) -> Result<Option<Topology>> {
    let id = dashboard_id.0;

    let topology = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM dashboards WHERE dashboard_id = ?1",
            rusqlite::params![id],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(None);
        }

        let mut groups: Vec<Group> = conn
          .prepare(
            "SELECT group_id, name FROM dashboard_groups
             WHERE dashboard_id = ?1
             ORDER BY position",
          )?
          .query_map(rusqlite::params![id], |r| {
            Ok(Group {
              group_id:  GroupId(r.get(0)?),
              name:      r.get(1)?,
              check_ids: Vec::new(),
            })
          })?
          .collect::<rusqlite::Result<_>>()?;

        let mut members = conn.prepare(
          "SELECT check_id FROM group_checks WHERE group_id = ?1 ORDER BY position",
        )?;
        for group in &mut groups {
          group.check_ids = members
            .query_map(rusqlite::params![group.group_id.0], |r| {
              Ok(CheckId(r.get(0)?))
            })?
            .collect::<rusqlite::Result<_>>()?;
        }

        let ungrouped_check_ids = conn
          .prepare(
            "SELECT check_id FROM dashboard_checks
             WHERE dashboard_id = ?1
             ORDER BY position",
          )?
          .query_map(rusqlite::params![id], |r| Ok(CheckId(r.get(0)?)))?
          .collect::<rusqlite::Result<_>>()?;

        Ok(Some(Topology { dashboard_id, groups, ungrouped_check_ids }))
      })
      .await?;

    Ok(topology)
  }
}
