//! Score ledger: per-day score totals and the append-only action log.
//!
//! `actions_log` is the source of truth; `scores` is a cached per-day sum of
//! it. Both are written by [`ScoreLedger::record_event`] inside one
//! transaction, and the score update is a single `score = score + delta`
//! statement, so concurrent callers cannot lose each other's deltas.

use std::sync::Arc;

use chrono::{Days, Local, NaiveDate, NaiveDateTime};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Store, DATE_FORMAT, TIMESTAMP_FORMAT};
use crate::catalog::{Catalog, EntryKind};
use crate::error::DatabaseError;

/// Category stored in `actions_log.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Action,
    Failure,
    Undo,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Action => "action",
            Category::Failure => "failure",
            Category::Undo => "undo",
        }
    }

    /// Also accepts the labels older databases were written with.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "action" | "действие" => Some(Category::Action),
            "failure" | "провал" => Some(Category::Failure),
            "undo" | "отмена" => Some(Category::Undo),
            _ => None,
        }
    }
}

impl From<EntryKind> for Category {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Action => Category::Action,
            EntryKind::Failure => Category::Failure,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub timestamp: NaiveDateTime,
    pub action: String,
    pub points: f64,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TotalStats {
    pub total_score: f64,
    pub best_day_score: f64,
    /// `None` when no day has been scored yet.
    pub best_day_date: Option<NaiveDate>,
}

pub struct ScoreLedger {
    store: Arc<Store>,
    catalog: Arc<Catalog>,
}

/// `[day, next day)` as strings comparable against `actions_log.timestamp`.
fn day_bounds(date: NaiveDate) -> (String, String) {
    let next = date.checked_add_days(Days::new(1)).unwrap_or(date);
    (
        date.format(DATE_FORMAT).to_string(),
        next.format(DATE_FORMAT).to_string(),
    )
}

impl ScoreLedger {
    pub fn new(store: Arc<Store>, catalog: Arc<Catalog>) -> Self {
        Self { store, catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Stored score for `date`, 0 when the day has no record.
    pub fn get_score(&self, date: NaiveDate) -> Result<f64, DatabaseError> {
        self.store.with_conn(|conn| {
            conn.query_row(
                "SELECT score FROM scores WHERE date = ?1",
                params![date],
                |row| row.get::<_, f64>(0),
            )
            .optional()
            .map(|score| score.unwrap_or(0.0))
        })
    }

    /// Add `points` to `date` and append the matching log entry.
    ///
    /// The entry is stamped with `date` at the current local time of day.
    /// Returns the score as it stands right after this mutation.
    pub fn record_event(
        &self,
        date: NaiveDate,
        action: &str,
        points: f64,
        category: Category,
    ) -> Result<f64, DatabaseError> {
        let at = date.and_time(Local::now().time());
        self.record_event_at(at, action, points, category)
    }

    /// [`record_event`](Self::record_event) with an explicit timestamp.
    pub fn record_event_at(
        &self,
        at: NaiveDateTime,
        action: &str,
        points: f64,
        category: Category,
    ) -> Result<f64, DatabaseError> {
        let date = at.date();
        let timestamp = at.format(TIMESTAMP_FORMAT).to_string();

        let new_score = self.store.with_tx(|tx| {
            tx.execute(
                "INSERT INTO scores (date, score) VALUES (?1, ?2)
                 ON CONFLICT(date) DO UPDATE SET score = score + excluded.score",
                params![date, points],
            )?;
            tx.execute(
                "INSERT INTO actions_log (timestamp, action, points, type)
                 VALUES (?1, ?2, ?3, ?4)",
                params![timestamp, action, points, category.as_str()],
            )?;
            tx.query_row(
                "SELECT score FROM scores WHERE date = ?1",
                params![date],
                |row| row.get::<_, f64>(0),
            )
        })?;

        info!(
            %date,
            action,
            points,
            category = category.as_str(),
            new_score,
            "score updated"
        );
        Ok(new_score)
    }

    /// Compensate a prior event by name, resolving it action-first.
    ///
    /// Prefer [`undo_as`](Self::undo_as) when the original category is known.
    pub fn undo(&self, date: NaiveDate, name: &str) -> Result<f64, DatabaseError> {
        self.undo_at(date.and_time(Local::now().time()), name)
    }

    /// [`undo`](Self::undo) with an explicit timestamp.
    pub fn undo_at(&self, at: NaiveDateTime, name: &str) -> Result<f64, DatabaseError> {
        let (_, points) = self.catalog.resolve_undo(name);
        self.record_event_at(at, name, -points, Category::Undo)
    }

    /// Compensate a prior event whose catalog table is known.
    pub fn undo_as(
        &self,
        date: NaiveDate,
        name: &str,
        kind: EntryKind,
    ) -> Result<f64, DatabaseError> {
        self.undo_as_at(date.and_time(Local::now().time()), name, kind)
    }

    /// [`undo_as`](Self::undo_as) with an explicit timestamp.
    pub fn undo_as_at(
        &self,
        at: NaiveDateTime,
        name: &str,
        kind: EntryKind,
    ) -> Result<f64, DatabaseError> {
        let points = self.catalog.points_for(name, kind);
        self.record_event_at(at, name, -points, Category::Undo)
    }

    /// `(action, points)` for every log entry of `date`, oldest first.
    pub fn daily_actions(&self, date: NaiveDate) -> Result<Vec<(String, f64)>, DatabaseError> {
        let (from, to) = day_bounds(date);
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT action, points FROM actions_log
                 WHERE timestamp >= ?1 AND timestamp < ?2
                 ORDER BY rowid",
            )?;
            let rows = stmt.query_map(params![from, to], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?;
            rows.collect()
        })
    }

    /// Full log rows of `date`, oldest first.
    pub fn journal(&self, date: NaiveDate) -> Result<Vec<ActionLogEntry>, DatabaseError> {
        let (from, to) = day_bounds(date);
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp, action, points, type FROM actions_log
                 WHERE timestamp >= ?1 AND timestamp < ?2
                 ORDER BY rowid",
            )?;
            let rows = stmt.query_map(params![from, to], |row| {
                let kind: String = row.get(3)?;
                Ok(ActionLogEntry {
                    timestamp: row.get(0)?,
                    action: row.get(1)?,
                    points: row.get(2)?,
                    category: Category::parse(&kind).unwrap_or(Category::Action),
                })
            })?;
            rows.collect()
        })
    }

    /// Sum of all days and the single best day.
    pub fn total_stats(&self) -> Result<TotalStats, DatabaseError> {
        self.store.with_conn(|conn| {
            let total_score: f64 =
                conn.query_row("SELECT COALESCE(SUM(score), 0) FROM scores", [], |row| {
                    row.get(0)
                })?;
            let best = conn
                .query_row(
                    "SELECT date, score FROM scores ORDER BY score DESC, date ASC LIMIT 1",
                    [],
                    |row| Ok((row.get::<_, NaiveDate>(0)?, row.get::<_, f64>(1)?)),
                )
                .optional()?;

            debug!(total_score, ?best, "computed total stats");
            Ok(match best {
                Some((date, score)) => TotalStats {
                    total_score,
                    best_day_score: score,
                    best_day_date: Some(date),
                },
                None => TotalStats::default(),
            })
        })
    }
}
