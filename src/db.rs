//! Database module
//!
//! Provides persistence for sessions and the computation history.

mod schema;

pub use schema::*;

use crate::bayes::REDUCTION_TOLERANCE_PERCENT;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Corrupt session state: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Corrupt history timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("Database lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (volatile deployments and tests)
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Session Operations ====================

    /// Load a user's session, inserting a fresh one on first access
    pub fn get_or_create_session(&self, user_id: &str) -> DbResult<Session> {
        let conn = self.conn()?;
        let existing: Option<String> = conn
            .query_row(
                "SELECT state FROM sessions WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(state_json) = existing {
            return Ok(serde_json::from_str(&state_json)?);
        }

        let session = Session::default();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO sessions (user_id, state, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![user_id, serde_json::to_string(&session)?, now],
        )?;
        tracing::debug!(user_id = %user_id, "Created session");
        Ok(session)
    }

    /// Upsert a user's session
    pub fn save_session(&self, user_id: &str, session: &Session) -> DbResult<()> {
        let conn = self.conn()?;
        upsert_session(&conn, user_id, session)
    }

    /// Append a computation's entries and store the session that counts them,
    /// in one transaction: both land or neither does
    pub fn commit_computation(
        &self,
        user_id: &str,
        entries: &[HistoryEntry],
        session: &Session,
    ) -> DbResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        insert_history(&tx, user_id, entries)?;
        upsert_session(&tx, user_id, session)?;
        tx.commit()?;
        Ok(())
    }

    // ==================== History Operations ====================

    /// Append entries in one transaction, preserving order
    pub fn append_history(&self, user_id: &str, entries: &[HistoryEntry]) -> DbResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        insert_history(&tx, user_id, entries)?;
        tx.commit()?;
        Ok(())
    }

    /// Last `limit` entries, oldest first
    pub fn recent_history(&self, user_id: &str, limit: usize) -> DbResult<Vec<HistoryEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT recorded_at, prior_percent, posterior_percent
             FROM history WHERE user_id = ?1
             ORDER BY sequence_id DESC LIMIT ?2",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![user_id, limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?;

        let mut entries = rows
            .map(|row| {
                let (recorded_at, prior_percent, posterior_percent) = row?;
                Ok(HistoryEntry::new(
                    parse_datetime(&recorded_at)?,
                    prior_percent,
                    posterior_percent,
                ))
            })
            .collect::<DbResult<Vec<_>>>()?;
        entries.reverse();
        Ok(entries)
    }

    /// Total entries and how many lowered the belief beyond the verdict tolerance
    pub fn history_summary(&self, user_id: &str) -> DbResult<HistorySummary> {
        let conn = self.conn()?;
        let (total, reduced): (i64, i64) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN posterior_percent < prior_percent - ?2 THEN 1 ELSE 0 END), 0)
             FROM history WHERE user_id = ?1",
            params![user_id, REDUCTION_TOLERANCE_PERCENT],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(HistorySummary {
            total_count: u64::try_from(total).unwrap_or_default(),
            reduced_count: u64::try_from(reduced).unwrap_or_default(),
        })
    }
}

fn upsert_session(conn: &Connection, user_id: &str, session: &Session) -> DbResult<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO sessions (user_id, state, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(user_id) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at",
        params![user_id, serde_json::to_string(session)?, now],
    )?;
    Ok(())
}

/// Insert after the user's highest sequence id, preserving slice order
fn insert_history(conn: &Connection, user_id: &str, entries: &[HistoryEntry]) -> DbResult<()> {
    let mut sequence_id: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sequence_id), 0) FROM history WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO history (user_id, sequence_id, recorded_at, prior_percent, posterior_percent)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for entry in entries {
        sequence_id += 1;
        stmt.execute(params![
            user_id,
            sequence_id,
            entry.recorded_at.to_rfc3339(),
            entry.prior_percent,
            entry.posterior_percent,
        ])?;
    }
    Ok(())
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}
