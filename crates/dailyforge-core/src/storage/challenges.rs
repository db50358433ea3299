//! Named, time-bounded goals.

use std::sync::Arc;

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::Store;
use crate::error::DatabaseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub goal_value: f64,
    pub description: String,
}

impl Challenge {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            start_date: row.get(1)?,
            end_date: row.get(2)?,
            goal_value: row.get(3)?,
            description: row.get(4)?,
        })
    }
}

pub struct ChallengeStore {
    store: Arc<Store>,
}

impl ChallengeStore {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Insert or fully replace the challenge called `challenge.name`.
    pub fn save(&self, challenge: &Challenge) -> Result<(), DatabaseError> {
        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO challenges
                     (challenge_name, start_date, end_date, goal_value, description)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    challenge.name,
                    challenge.start_date,
                    challenge.end_date,
                    challenge.goal_value,
                    challenge.description
                ],
            )
        })?;
        info!(name = %challenge.name, end = %challenge.end_date, "challenge saved");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Option<Challenge>, DatabaseError> {
        self.store.with_conn(|conn| {
            conn.query_row(
                "SELECT challenge_name, start_date, end_date, goal_value, description
                 FROM challenges WHERE challenge_name = ?1",
                params![name],
                Challenge::from_row,
            )
            .optional()
        })
    }

    /// Challenges whose end date is on or after `as_of`, ordered by name.
    ///
    /// Start dates are not filtered: a challenge defined for the future is
    /// already active.
    pub fn active(&self, as_of: NaiveDate) -> Result<Vec<Challenge>, DatabaseError> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT challenge_name, start_date, end_date, goal_value, description
                 FROM challenges WHERE end_date >= ?1
                 ORDER BY challenge_name",
            )?;
            let rows = stmt.query_map(params![as_of], Challenge::from_row)?;
            rows.collect()
        })
    }
}
