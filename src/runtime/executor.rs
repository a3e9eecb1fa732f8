//! Per-user conversation runtime
//!
//! One task per user owns that user's session and handles events strictly in
//! arrival order, so two messages can never interleave partial state.

use super::traits::Storage;
use super::Envelope;

use crate::db::HistoryEntry;
use crate::state_machine::{
    transition, ConvContext, ConversationOutcome, Effect, Event, HistorySnapshot, Session,
    StageName,
};
use crate::state_machine::transition::MENU_HINT;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::traits::StoreError;

/// Generic user runtime that can work with any storage implementation
pub struct UserRuntime<S>
where
    S: Storage + Clone + 'static,
{
    context: ConvContext,
    state: Session,
    storage: S,
    event_rx: mpsc::Receiver<Envelope>,
    idle_timeout: Duration,
}

impl<S> UserRuntime<S>
where
    S: Storage + Clone + 'static,
{
    pub fn new(
        context: ConvContext,
        storage: S,
        event_rx: mpsc::Receiver<Envelope>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            context,
            state: Session::default(),
            storage,
            event_rx,
            idle_timeout,
        }
    }

    /// Load the session, then serve events until idle or every sender is gone.
    ///
    /// Shutting down closes the channel first and drains what was already
    /// queued, so no accepted message goes unanswered.
    pub async fn run(mut self) {
        match self.storage.get_or_create(&self.context.user_id).await {
            Ok(session) => self.state = session,
            Err(e) => {
                tracing::error!(user_id = %self.context.user_id, error = %e, "Failed to load session");
                self.event_rx.close();
                while let Some(Envelope { reply_tx, .. }) = self.event_rx.recv().await {
                    let _ = reply_tx.send(ConversationOutcome::unavailable());
                }
                return;
            }
        }

        tracing::info!(user_id = %self.context.user_id, stage = %self.state.stage.name(), "Starting user runtime");

        loop {
            let next = match tokio::time::timeout(self.idle_timeout, self.event_rx.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::debug!(user_id = %self.context.user_id, "Idle, shutting down");
                    self.event_rx.close();
                    self.event_rx.recv().await
                }
            };
            let Some(Envelope { event, reply_tx }) = next else {
                break;
            };

            let outcome = self.process_event(event).await;
            if reply_tx.send(outcome).is_err() {
                tracing::debug!(user_id = %self.context.user_id, "Caller went away before reply");
            }
        }

        tracing::info!(user_id = %self.context.user_id, "User runtime stopped");
    }

    pub(crate) async fn process_event(&mut self, event: Event) -> ConversationOutcome {
        // Pure state transition
        let result = transition(&self.state, &self.context, event);

        // Commit to memory only after storage accepted every write
        match self.execute_effects(&result.new_state, result.effects).await {
            Ok(outcome) => {
                if result.new_state.stage.name() != self.state.stage.name() {
                    tracing::debug!(
                        user_id = %self.context.user_id,
                        from = %self.state.stage.name(),
                        to = %result.new_state.stage.name(),
                        "Stage transition"
                    );
                }
                self.state = result.new_state;
                outcome
            }
            Err(e) => {
                tracing::error!(
                    user_id = %self.context.user_id,
                    error = %e,
                    "Storage failure, session left unchanged"
                );
                ConversationOutcome::unavailable()
            }
        }
    }

    async fn execute_effects(
        &self,
        next: &Session,
        effects: Vec<Effect>,
    ) -> Result<ConversationOutcome, StoreError> {
        let user_id = self.context.user_id.as_str();
        let mut outcome = None;

        for effect in effects {
            match effect {
                Effect::CommitComputation { steps } => {
                    let now = Utc::now();
                    let entries: Vec<HistoryEntry> = steps
                        .iter()
                        .map(|s| HistoryEntry::new(now, s.prior_percent, s.posterior_percent))
                        .collect();
                    self.storage
                        .commit_computation(user_id, &entries, next)
                        .await?;
                    tracing::info!(
                        user_id = %user_id,
                        steps = entries.len(),
                        lifetime_check_count = next.lifetime_check_count,
                        "Recorded computation"
                    );
                }
                Effect::PersistSession => {
                    self.storage.put(user_id, next).await?;
                }
                Effect::ReportHistory { limit } => {
                    let entries = self.storage.recent(user_id, limit).await?;
                    let summary = self.storage.summary(user_id).await?;
                    outcome = Some(ConversationOutcome::HistorySnapshot(HistorySnapshot::new(
                        entries, summary,
                    )));
                }
                Effect::Reply(reply) => outcome = Some(reply),
            }
        }

        Ok(outcome.unwrap_or_else(|| ConversationOutcome::prompt(StageName::Idle, MENU_HINT)))
    }

    #[allow(dead_code)] // Test inspection
    pub fn state(&self) -> &Session {
        &self.state
    }
}
