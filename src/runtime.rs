//! Runtime for serving conversations
//!
//! Every user identifier gets at most one live `UserRuntime` task. Messages for
//! one user are serialized through its channel; different users run in
//! parallel. Runtimes shut themselves down after an idle period and are
//! respawned from storage on the next message.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::UserRuntime;
pub use traits::*;

use crate::state_machine::{ConvContext, ConversationOutcome, Event, FlowConfig, HistorySnapshot};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, RwLock};

/// Type alias for production manager with concrete storage
pub type ProductionManager = ConversationManager<DatabaseStorage>;

/// Channel capacity per user
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// How long a runtime waits for a message before shutting down
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// An event plus the channel its outcome goes back on
#[derive(Debug)]
pub struct Envelope {
    pub event: Event,
    pub reply_tx: oneshot::Sender<ConversationOutcome>,
}

/// Resolves once the owning runtime task has returned
#[derive(Clone)]
pub struct Finished(watch::Receiver<()>);

impl Finished {
    /// Nothing is ever sent; the sender is dropped when the task ends
    pub async fn wait(mut self) {
        while self.0.changed().await.is_ok() {}
    }

    pub fn is_done(&self) -> bool {
        self.0.has_changed().is_err()
    }
}

/// Handle to interact with a running user runtime
#[derive(Clone)]
pub struct UserHandle {
    pub event_tx: mpsc::Sender<Envelope>,
    pub finished: Finished,
}

impl UserHandle {
    /// Accepting messages (not idled out or failed)
    pub fn is_live(&self) -> bool {
        !self.event_tx.is_closed()
    }
}

/// Manager for all user runtimes
pub struct ConversationManager<S>
where
    S: Storage + Clone + 'static,
{
    storage: S,
    flow: FlowConfig,
    idle_timeout: Duration,
    runtimes: RwLock<HashMap<String, UserHandle>>,
}

impl<S> ConversationManager<S>
where
    S: Storage + Clone + 'static,
{
    pub fn new(storage: S, flow: FlowConfig) -> Self {
        Self {
            storage,
            flow,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            runtimes: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Get the live runtime for a user, spawning one if needed.
    ///
    /// Never touches storage under the map lock: the spawned task loads its own
    /// session, after waiting for any predecessor to finish its last writes.
    pub async fn get_or_create(&self, user_id: &str) -> UserHandle {
        // Check if already running
        {
            let runtimes = self.runtimes.read().await;
            if let Some(handle) = runtimes.get(user_id).filter(|h| h.is_live()) {
                return handle.clone();
            }
        }

        // Re-check under the write lock so one user never gets two writers
        let mut runtimes = self.runtimes.write().await;
        let predecessor = match runtimes.get(user_id) {
            Some(handle) if handle.is_live() => return handle.clone(),
            Some(handle) => Some(handle.finished.clone()),
            None => None,
        };

        // Forget runtimes that have fully stopped
        runtimes.retain(|_, h| h.is_live() || !h.finished.is_done());

        let context = ConvContext::new(user_id, self.flow.clone());
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (done_tx, done_rx) = watch::channel(());

        let runtime = UserRuntime::new(context, self.storage.clone(), event_rx, self.idle_timeout);
        let uid = user_id.to_string();
        tokio::spawn(async move {
            if let Some(predecessor) = predecessor {
                predecessor.wait().await;
            }
            runtime.run().await;
            drop(done_tx);
            tracing::info!(user_id = %uid, "User runtime finished");
        });

        let handle = UserHandle {
            event_tx,
            finished: Finished(done_rx),
        };
        runtimes.insert(user_id.to_string(), handle.clone());
        handle
    }

    /// Deliver raw user text and wait for the outcome
    pub async fn submit(&self, user_id: &str, raw_text: &str) -> ConversationOutcome {
        self.dispatch(user_id, Event::user_text(raw_text)).await
    }

    /// External restart trigger: re-zero the session, keep history
    pub async fn reset(&self, user_id: &str) -> ConversationOutcome {
        self.dispatch(user_id, Event::Reset).await
    }

    /// Read-only history view; bypasses the runtime since nothing mutates
    pub async fn history(&self, user_id: &str, limit: usize) -> Result<HistorySnapshot, StoreError> {
        let entries = self.storage.recent(user_id, limit).await?;
        let summary = self.storage.summary(user_id).await?;
        Ok(HistorySnapshot::new(entries, summary))
    }

    async fn dispatch(&self, user_id: &str, event: Event) -> ConversationOutcome {
        let (reply_tx, reply_rx) = oneshot::channel();
        let mut envelope = Envelope { event, reply_tx };

        // A runtime can idle out between lookup and send; its successor takes the retry
        for _ in 0..2 {
            let handle = self.get_or_create(user_id).await;
            match handle.event_tx.send(envelope).await {
                Ok(()) => {
                    return reply_rx
                        .await
                        .unwrap_or_else(|_| ConversationOutcome::unavailable());
                }
                Err(mpsc::error::SendError(returned)) => envelope = returned,
            }
        }

        tracing::warn!(user_id = %user_id, "User runtime kept closing, giving up");
        ConversationOutcome::unavailable()
    }

    /// Number of live user runtimes
    #[allow(dead_code)] // Diagnostics
    pub async fn active_users(&self) -> usize {
        self.runtimes
            .read()
            .await
            .values()
            .filter(|h| h.is_live())
            .count()
    }

    #[allow(dead_code)] // Test access
    pub fn storage(&self) -> &S {
        &self.storage
    }
}
