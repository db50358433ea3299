//! Database schema migrations for dailyforge.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{info, warn};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    if current_version < SCHEMA_VERSION {
        info!(from = current_version, to = SCHEMA_VERSION, "database migrated");
    }
    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: the four domain tables.
///
/// Column names match the layout older installs already have on disk, so an
/// existing `bot_data.db` can be opened in place.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS scores (
            date  TEXT PRIMARY KEY,
            score REAL NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS actions_log (
            timestamp TEXT NOT NULL,
            action    TEXT NOT NULL,
            points    REAL NOT NULL,
            type      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS challenges (
            challenge_name TEXT PRIMARY KEY,
            start_date     TEXT NOT NULL,
            end_date       TEXT NOT NULL,
            goal_value     REAL NOT NULL,
            description    TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS daily_plan (
            date         TEXT NOT NULL,
            user_id      TEXT NOT NULL,
            plan_item    TEXT NOT NULL,
            is_completed INTEGER NOT NULL DEFAULT 0,
            status       TEXT NOT NULL DEFAULT 'pending'
        );",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: indexes for the per-day queries.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_actions_log_timestamp ON actions_log(timestamp);
         CREATE INDEX IF NOT EXISTS idx_daily_plan_date_user ON daily_plan(date, user_id);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}
