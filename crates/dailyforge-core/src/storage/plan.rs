//! Per-day task plan.

use std::sync::Arc;

use chrono::NaiveDate;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Store;
use crate::error::DatabaseError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanItem {
    /// SQLite rowid; stable for the lifetime of the row.
    pub id: i64,
    pub date: NaiveDate,
    pub text: String,
    pub completed: bool,
    pub status: String,
}

/// Plan items of one owner. Completion is monotonic and rows are never
/// deleted.
pub struct PlanStore {
    store: Arc<Store>,
    owner: String,
}

impl PlanStore {
    pub fn new(store: Arc<Store>, owner: impl Into<String>) -> Self {
        Self {
            store,
            owner: owner.into(),
        }
    }

    /// Append one pending item per text. Returns the new ids in order.
    pub fn add_items<S: AsRef<str>>(
        &self,
        date: NaiveDate,
        texts: &[S],
    ) -> Result<Vec<i64>, DatabaseError> {
        let ids = self.store.with_tx(|tx| {
            let mut stmt = tx.prepare(
                "INSERT INTO daily_plan (date, user_id, plan_item) VALUES (?1, ?2, ?3)",
            )?;
            let mut ids = Vec::with_capacity(texts.len());
            for text in texts {
                ids.push(stmt.insert(params![date, self.owner, text.as_ref()])?);
            }
            Ok(ids)
        })?;
        info!(%date, count = ids.len(), "plan items added");
        Ok(ids)
    }

    pub fn items_for(&self, date: NaiveDate) -> Result<Vec<PlanItem>, DatabaseError> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT rowid, date, plan_item, is_completed, status
                 FROM daily_plan WHERE date = ?1 AND user_id = ?2
                 ORDER BY rowid",
            )?;
            let rows = stmt.query_map(params![date, self.owner], |row| {
                Ok(PlanItem {
                    id: row.get(0)?,
                    date: row.get(1)?,
                    text: row.get(2)?,
                    completed: row.get::<_, i64>(3)? != 0,
                    status: row.get(4)?,
                })
            })?;
            rows.collect()
        })
    }

    /// Mark item `id` completed. Returns `true` only if this call flipped it;
    /// already-completed and unknown ids are a no-op.
    pub fn complete(&self, id: i64) -> Result<bool, DatabaseError> {
        let changed = self.store.with_conn(|conn| {
            conn.execute(
                "UPDATE daily_plan SET is_completed = 1, status = 'done'
                 WHERE rowid = ?1 AND user_id = ?2 AND is_completed = 0",
                params![id, self.owner],
            )
        })?;
        debug!(id, flipped = changed == 1, "plan item completion");
        Ok(changed == 1)
    }
}
