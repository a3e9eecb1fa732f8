//! Structured replies handed back to the transport

use super::input::InvalidReason;
use super::state::StageName;
use crate::bayes::{Probability, RiskBand, Verdict};
use crate::db::{HistoryEntry, HistorySummary};
use serde::Serialize;

pub const UNAVAILABLE_MESSAGE: &str = "Something went wrong on our side. Please try again.";

/// One link of a computation, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepReport {
    pub prior_percent: f64,
    pub posterior_percent: f64,
}

impl StepReport {
    pub fn new(prior: Probability, posterior: Probability) -> Self {
        Self {
            prior_percent: prior.as_percent(),
            posterior_percent: posterior.as_percent(),
        }
    }
}

/// Recent window of history plus whole-history counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySnapshot {
    /// Oldest first within the window
    pub entries: Vec<HistoryEntry>,
    pub total_count: u64,
    pub reduced_count: u64,
}

impl HistorySnapshot {
    pub fn new(entries: Vec<HistoryEntry>, summary: HistorySummary) -> Self {
        Self {
            entries,
            total_count: summary.total_count,
            reduced_count: summary.reduced_count,
        }
    }
}

/// Result of submitting one message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationOutcome {
    /// Ask for the stage's input
    Prompt {
        stage: StageName,
        hint: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        suggested_percent: Option<f64>,
    },
    /// Input rejected, stage unchanged
    InvalidInput {
        stage: StageName,
        reason: InvalidReason,
    },
    ComputationResult {
        steps: Vec<StepReport>,
        lifetime_check_count: u64,
        feedback_message: String,
        verdict: Verdict,
        risk_band: RiskBand,
    },
    HistorySnapshot(HistorySnapshot),
    Motivation {
        message: String,
        lifetime_check_count: u64,
    },
    Cancelled,
    /// Storage failed; nothing was committed
    Unavailable { message: String },
}

impl ConversationOutcome {
    pub fn prompt(stage: StageName, hint: &str) -> Self {
        ConversationOutcome::Prompt {
            stage,
            hint: hint.to_string(),
            suggested_percent: None,
        }
    }

    pub fn unavailable() -> Self {
        ConversationOutcome::Unavailable {
            message: UNAVAILABLE_MESSAGE.to_string(),
        }
    }

    /// Discriminant name as serialized
    pub fn kind(&self) -> &'static str {
        match self {
            ConversationOutcome::Prompt { .. } => "prompt",
            ConversationOutcome::InvalidInput { .. } => "invalid_input",
            ConversationOutcome::ComputationResult { .. } => "computation_result",
            ConversationOutcome::HistorySnapshot(_) => "history_snapshot",
            ConversationOutcome::Motivation { .. } => "motivation",
            ConversationOutcome::Cancelled => "cancelled",
            ConversationOutcome::Unavailable { .. } => "unavailable",
        }
    }
}
