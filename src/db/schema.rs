//! Database schema and types

pub use crate::state_machine::state::Session;
#[cfg(test)]
use crate::bayes::REDUCTION_TOLERANCE_PERCENT;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    user_id TEXT PRIMARY KEY,
    state TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    sequence_id INTEGER NOT NULL,
    recorded_at TEXT NOT NULL,
    prior_percent REAL NOT NULL,
    posterior_percent REAL NOT NULL,

    UNIQUE (user_id, sequence_id)
);

CREATE INDEX IF NOT EXISTS idx_history_user ON history(user_id, sequence_id);
";

/// One completed update, immutable once appended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub recorded_at: DateTime<Utc>,
    pub prior_percent: f64,
    pub posterior_percent: f64,
}

impl HistoryEntry {
    pub fn new(recorded_at: DateTime<Utc>, prior_percent: f64, posterior_percent: f64) -> Self {
        Self {
            recorded_at,
            prior_percent,
            posterior_percent,
        }
    }

    /// Belief went down by more than the verdict tolerance
    #[cfg(test)]
    pub fn is_reduction(&self) -> bool {
        self.posterior_percent < self.prior_percent - REDUCTION_TOLERANCE_PERCENT
    }
}

/// Aggregate over a user's whole history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistorySummary {
    pub total_count: u64,
    pub reduced_count: u64,
}

#[cfg(test)]
impl HistorySummary {
    pub fn of<'a>(entries: impl IntoIterator<Item = &'a HistoryEntry>) -> Self {
        entries
            .into_iter()
            .fold(HistorySummary::default(), |mut acc, entry| {
                acc.total_count += 1;
                if entry.is_reduction() {
                    acc.reduced_count += 1;
                }
                acc
            })
    }
}
