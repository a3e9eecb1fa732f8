//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with in-memory implementations.

use crate::db::{Database, DbError, HistoryEntry, HistorySummary, Session};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Storage-layer failure, surfaced to users only as "try again"
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Storage unavailable: {0}")]
    #[allow(dead_code)] // Constructed by non-database adapters
    Unavailable(String),
}

/// Storage for per-user sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the user's session, creating a fresh one on first access
    async fn get_or_create(&self, user_id: &str) -> Result<Session, StoreError>;

    /// Replace the user's session
    async fn put(&self, user_id: &str, session: &Session) -> Result<(), StoreError>;
}

/// Append-only per-user computation log
#[async_trait]
pub trait HistoryStore: Send + Sync {
    #[allow(dead_code)] // Computations go through `Storage::commit_computation`
    async fn append(&self, user_id: &str, entry: &HistoryEntry) -> Result<(), StoreError>;

    /// Append several entries in order
    #[allow(dead_code)]
    async fn append_all(&self, user_id: &str, entries: &[HistoryEntry]) -> Result<(), StoreError> {
        for entry in entries {
            self.append(user_id, entry).await?;
        }
        Ok(())
    }

    /// Last `limit` entries, oldest first
    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>, StoreError>;

    async fn summary(&self, user_id: &str) -> Result<HistorySummary, StoreError>;
}

/// Both stores, plus the one write that must touch them together
#[async_trait]
pub trait Storage: SessionStore + HistoryStore {
    /// Append a computation's entries and replace the session as a single
    /// commit. On error neither is written.
    async fn commit_computation(
        &self,
        user_id: &str,
        entries: &[HistoryEntry],
        session: &Session,
    ) -> Result<(), StoreError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn get_or_create(&self, user_id: &str) -> Result<Session, StoreError> {
        (**self).get_or_create(user_id).await
    }

    async fn put(&self, user_id: &str, session: &Session) -> Result<(), StoreError> {
        (**self).put(user_id, session).await
    }
}

#[async_trait]
impl<T: HistoryStore + ?Sized> HistoryStore for Arc<T> {
    async fn append(&self, user_id: &str, entry: &HistoryEntry) -> Result<(), StoreError> {
        (**self).append(user_id, entry).await
    }

    async fn append_all(&self, user_id: &str, entries: &[HistoryEntry]) -> Result<(), StoreError> {
        (**self).append_all(user_id, entries).await
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        (**self).recent(user_id, limit).await
    }

    async fn summary(&self, user_id: &str) -> Result<HistorySummary, StoreError> {
        (**self).summary(user_id).await
    }
}

#[async_trait]
impl<T: Storage + ?Sized> Storage for Arc<T> {
    async fn commit_computation(
        &self,
        user_id: &str,
        entries: &[HistoryEntry],
        session: &Session,
    ) -> Result<(), StoreError> {
        (**self).commit_computation(user_id, entries, session).await
    }
}

// ============================================================================
// Production Adapter
// ============================================================================

/// Adapter to use Database as Storage
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[allow(dead_code)] // Useful for tests
    pub fn inner(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl SessionStore for DatabaseStorage {
    async fn get_or_create(&self, user_id: &str) -> Result<Session, StoreError> {
        Ok(self.db.get_or_create_session(user_id)?)
    }

    async fn put(&self, user_id: &str, session: &Session) -> Result<(), StoreError> {
        Ok(self.db.save_session(user_id, session)?)
    }
}

#[async_trait]
impl HistoryStore for DatabaseStorage {
    async fn append(&self, user_id: &str, entry: &HistoryEntry) -> Result<(), StoreError> {
        Ok(self.db.append_history(user_id, std::slice::from_ref(entry))?)
    }

    /// Single transaction: all entries or none
    async fn append_all(&self, user_id: &str, entries: &[HistoryEntry]) -> Result<(), StoreError> {
        Ok(self.db.append_history(user_id, entries)?)
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        Ok(self.db.recent_history(user_id, limit)?)
    }

    async fn summary(&self, user_id: &str) -> Result<HistorySummary, StoreError> {
        Ok(self.db.history_summary(user_id)?)
    }
}

#[async_trait]
impl Storage for DatabaseStorage {
    async fn commit_computation(
        &self,
        user_id: &str,
        entries: &[HistoryEntry],
        session: &Session,
    ) -> Result<(), StoreError> {
        Ok(self.db.commit_computation(user_id, entries, session)?)
    }
}
