//! In-memory storage implementations for testing
//!
//! These enable runtime and manager tests without a database.

use super::traits::*;
use crate::db::{HistoryEntry, HistorySummary, Session};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ============================================================================
// Memory Storage
// ============================================================================

/// Sessions and history kept in process memory
#[derive(Clone, Default)]
pub struct MemoryStorage {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
    history: Arc<Mutex<HashMap<String, Vec<HistoryEntry>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored session without creating one
    pub fn session(&self, user_id: &str) -> Option<Session> {
        self.sessions.lock().unwrap().get(user_id).cloned()
    }

    /// Full history for a user
    pub fn all_history(&self, user_id: &str) -> Vec<HistoryEntry> {
        self.history
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SessionStore for MemoryStorage {
    async fn get_or_create(&self, user_id: &str) -> Result<Session, StoreError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .clone())
    }

    async fn put(&self, user_id: &str, session: &Session) -> Result<(), StoreError> {
        self.sessions
            .lock()
            .unwrap()
            .insert(user_id.to_string(), session.clone());
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for MemoryStorage {
    async fn append(&self, user_id: &str, entry: &HistoryEntry) -> Result<(), StoreError> {
        self.history
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        let history = self.history.lock().unwrap();
        let entries = history.get(user_id).map(Vec::as_slice).unwrap_or_default();
        let start = entries.len().saturating_sub(limit);
        Ok(entries[start..].to_vec())
    }

    async fn summary(&self, user_id: &str) -> Result<HistorySummary, StoreError> {
        let history = self.history.lock().unwrap();
        Ok(HistorySummary::of(history.get(user_id).into_iter().flatten()))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn commit_computation(
        &self,
        user_id: &str,
        entries: &[HistoryEntry],
        session: &Session,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        let mut history = self.history.lock().unwrap();
        history
            .entry(user_id.to_string())
            .or_default()
            .extend_from_slice(entries);
        sessions.insert(user_id.to_string(), session.clone());
        Ok(())
    }
}

// ============================================================================
// Failing Storage
// ============================================================================

/// Wraps `MemoryStorage` with switchable write/read failures
#[derive(Clone, Default)]
pub struct FailingStorage {
    pub inner: MemoryStorage,
    fail_loads: Arc<AtomicBool>,
    fail_puts: Arc<AtomicBool>,
    fail_appends: Arc<AtomicBool>,
    held_user: Arc<Mutex<Option<String>>>,
    release: Arc<Notify>,
}

impl FailingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Park session loads for `user_id` until `release_loads`
    pub fn hold_loads_for(&self, user_id: &str) {
        *self.held_user.lock().unwrap() = Some(user_id.to_string());
    }

    pub fn release_loads(&self) {
        self.held_user.lock().unwrap().take();
        self.release.notify_one();
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("injected {what} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FailingStorage {
    async fn get_or_create(&self, user_id: &str) -> Result<Session, StoreError> {
        Self::check(&self.fail_loads, "load")?;
        let held = self.held_user.lock().unwrap().as_deref() == Some(user_id);
        if held {
            self.release.notified().await;
        }
        self.inner.get_or_create(user_id).await
    }

    async fn put(&self, user_id: &str, session: &Session) -> Result<(), StoreError> {
        Self::check(&self.fail_puts, "put")?;
        self.inner.put(user_id, session).await
    }
}

#[async_trait]
impl HistoryStore for FailingStorage {
    async fn append(&self, user_id: &str, entry: &HistoryEntry) -> Result<(), StoreError> {
        Self::check(&self.fail_appends, "append")?;
        self.inner.append(user_id, entry).await
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        Self::check(&self.fail_loads, "recent")?;
        self.inner.recent(user_id, limit).await
    }

    async fn summary(&self, user_id: &str) -> Result<HistorySummary, StoreError> {
        Self::check(&self.fail_loads, "summary")?;
        self.inner.summary(user_id).await
    }
}

#[async_trait]
impl Storage for FailingStorage {
    /// Fails if either half would fail, before anything is written
    async fn commit_computation(
        &self,
        user_id: &str,
        entries: &[HistoryEntry],
        session: &Session,
    ) -> Result<(), StoreError> {
        Self::check(&self.fail_appends, "append")?;
        Self::check(&self.fail_puts, "put")?;
        self.inner.commit_computation(user_id, entries, session).await
    }
}
