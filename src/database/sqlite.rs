//! SQLite-backed fact store, the primary persistence tier.
//!
//! One table keyed by (learner, level, fact). Timestamps are stored as
//! RFC 3339 text so the sub-day precision of due comparisons survives a
//! round trip; history and payload are JSON columns.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use super::FactStore;
use crate::error::Result;
use crate::models::{FactRecord, KnowledgeLevel};

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database file and ensures the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS fact_records (
                learner_id TEXT NOT NULL,
                level_code TEXT NOT NULL,
                fact_id TEXT NOT NULL,
                knowledge_level INTEGER NOT NULL DEFAULT 0,
                success_count INTEGER NOT NULL DEFAULT 0,
                last_reviewed TEXT NOT NULL,
                next_review TEXT NOT NULL,
                history TEXT NOT NULL,
                payload TEXT NOT NULL,
                PRIMARY KEY (learner_id, level_code, fact_id)
            )",
            (),
        )?;

        Ok(Self { conn })
    }
}

fn parse_timestamp(column: &str, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("bad {column} timestamp '{raw}': {e}").into(),
            )
        })
}

fn parse_json<T: serde::de::DeserializeOwned>(column: &str, raw: String) -> rusqlite::Result<T> {
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("bad {column} json: {e}").into(),
        )
    })
}

impl FactStore for SqliteStore {
    fn load_facts_for_scope(
        &mut self,
        learner_id: &str,
        level_code: &str,
    ) -> Result<HashMap<String, FactRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT fact_id, knowledge_level, success_count, last_reviewed, next_review, history, payload
             FROM fact_records
             WHERE learner_id = ?1 AND level_code = ?2",
        )?;

        let records = stmt
            .query_map(params![learner_id, level_code], |row| {
                let rank: u8 = row.get(1)?;
                let level = KnowledgeLevel::from_rank(rank).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Integer,
                        format!("knowledge level rank {rank} out of range").into(),
                    )
                })?;

                Ok(FactRecord {
                    id: row.get(0)?,
                    level,
                    success_count: row.get(2)?,
                    last_reviewed: parse_timestamp("last_reviewed", row.get(3)?)?,
                    next_review: parse_timestamp("next_review", row.get(4)?)?,
                    history: parse_json("history", row.get(5)?)?,
                    payload: parse_json("payload", row.get(6)?)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<FactRecord>>>()?;

        Ok(records.into_iter().map(|r| (r.id.clone(), r)).collect())
    }

    fn save_facts(
        &mut self,
        learner_id: &str,
        level_code: &str,
        facts: &HashMap<String, FactRecord>,
    ) -> Result<()> {
        let tx = self.conn.transaction()?;

        // The engine hands over the full scope map, so the scope is rewritten
        // wholesale; rows purged in memory disappear here too.
        tx.execute(
            "DELETE FROM fact_records WHERE learner_id = ?1 AND level_code = ?2",
            params![learner_id, level_code],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO fact_records
                 (learner_id, level_code, fact_id, knowledge_level, success_count,
                  last_reviewed, next_review, history, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;

            for record in facts.values() {
                stmt.execute(params![
                    learner_id,
                    level_code,
                    record.id,
                    record.level.rank(),
                    record.success_count,
                    record.last_reviewed.to_rfc3339(),
                    record.next_review.to_rfc3339(),
                    serde_json::to_string(&record.history)?,
                    serde_json::to_string(&record.payload)?,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn clear_scope(&mut self, learner_id: &str, level_code: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM fact_records WHERE learner_id = ?1 AND level_code = ?2",
            params![learner_id, level_code],
        )?;
        Ok(())
    }
}
