pub mod challenges;
mod config;
pub mod ledger;
pub mod migrations;
pub mod plan;

pub use challenges::{Challenge, ChallengeStore};
pub use config::{AiConfig, Config, GoalConfig, PlanConfig, ScheduleConfig};
pub use ledger::{ActionLogEntry, Category, ScoreLedger, TotalStats};
pub use plan::{PlanItem, PlanStore};

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::debug;

use crate::error::DatabaseError;

/// Date format used for every `date` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Naive local wall-clock format used for `actions_log.timestamp`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Returns `~/.config/dailyforge[-dev]/` based on DAILYFORGE_ENV.
///
/// Set DAILYFORGE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("DAILYFORGE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("dailyforge-dev")
    } else {
        base_dir.join("dailyforge")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// The single SQLite connection every store shares.
///
/// All access goes through the mutex, so two writers never interleave their
/// statements; multi-statement mutations additionally run inside one
/// `IMMEDIATE` transaction via [`Store::with_tx`].
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database file at `path` and apply migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(Duration::from_secs(5))?;
        debug!(path = %path.display(), "opened database");
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned)
    }

    /// Run read-only or single-statement work against the connection.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, DatabaseError> {
        let conn = self.lock()?;
        Ok(f(&conn)?)
    }

    /// Run `f` inside one immediate transaction; commits only if `f` succeeds.
    pub fn with_tx<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> rusqlite::Result<T>,
    ) -> Result<T, DatabaseError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_transaction_rolls_back() {
        let store = Store::open_memory().unwrap();
        let result: Result<(), DatabaseError> = store.with_tx(|tx| {
            tx.execute(
                "INSERT INTO scores (date, score) VALUES ('2024-01-01', 5)",
                [],
            )?;
            Err(rusqlite::Error::QueryReturnedNoRows)
        });
        assert!(result.is_err());

        let count: i64 = store
            .with_conn(|c| c.query_row("SELECT COUNT(*) FROM scores", [], |r| r.get(0)))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn on_disk_store_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forge.db");
        {
            let store = Store::open(&path).unwrap();
            store
                .with_conn(|c| {
                    c.execute(
                        "INSERT INTO scores (date, score) VALUES ('2024-01-01', 5)",
                        [],
                    )
                })
                .unwrap();
        }
        let store = Store::open(&path).unwrap();
        let score: f64 = store
            .with_conn(|c| c.query_row("SELECT score FROM scores", [], |r| r.get(0)))
            .unwrap();
        assert_eq!(score, 5.0);
    }
}
