//! SQL schema for the Pulseboard SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per reported status. Re-reporting the same instant overwrites.
CREATE TABLE IF NOT EXISTS events (
    check_id       INTEGER NOT NULL,
    ts_micros      INTEGER NOT NULL,   -- microseconds since the Unix epoch
    status         TEXT    NOT NULL,   -- 'OK' | 'DEGRADED' | ... | 'UNKNOWN'
    message        TEXT    NOT NULL DEFAULT '',
    correlation_id TEXT,
    PRIMARY KEY (check_id, ts_micros)
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS dashboards (
    dashboard_id INTEGER PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS dashboard_groups (
    group_id     INTEGER PRIMARY KEY,
    dashboard_id INTEGER NOT NULL REFERENCES dashboards(dashboard_id) ON DELETE CASCADE,
    name         TEXT    NOT NULL,
    position     INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS group_checks (
    group_id INTEGER NOT NULL REFERENCES dashboard_groups(group_id) ON DELETE CASCADE,
    check_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (group_id, check_id)
);

-- Checks shown on a dashboard outside any group.
CREATE TABLE IF NOT EXISTS dashboard_checks (
    dashboard_id INTEGER NOT NULL REFERENCES dashboards(dashboard_id) ON DELETE CASCADE,
    check_id     INTEGER NOT NULL,
    position     INTEGER NOT NULL,
    PRIMARY KEY (dashboard_id, check_id)
);

CREATE INDEX IF NOT EXISTS groups_dashboard_idx ON dashboard_groups(dashboard_id);

PRAGMA user_version = 1;
";
