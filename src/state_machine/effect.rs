//! Effects produced by state transitions

use super::outcome::{ConversationOutcome, StepReport};

/// Effects to be executed after state transition, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append one history entry per step and persist the new session, as a
    /// single commit
    CommitComputation { steps: Vec<StepReport> },

    /// Persist the new session
    PersistSession,

    /// Read the recent history window and reply with a snapshot
    ReportHistory { limit: usize },

    /// Deliver an outcome to the transport
    Reply(ConversationOutcome),
}

impl Effect {
    pub fn reply(outcome: ConversationOutcome) -> Self {
        Effect::Reply(outcome)
    }

    /// Check if executing this effect writes to storage
    #[allow(dead_code)] // Test inspection
    pub fn is_write(&self) -> bool {
        matches!(self, Effect::CommitComputation { .. } | Effect::PersistSession)
    }
}
