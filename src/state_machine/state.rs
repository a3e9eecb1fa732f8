//! Conversation state types

use crate::bayes::Probability;
use crate::feedback::FeedbackSelector;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Stages
// ============================================================================

/// Position in the elicitation flow.
///
/// Collecting stages carry the values validated so far, so a partial entry
/// can never be paired with a value from a different attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvStage {
    /// Main menu, no flow in progress
    #[default]
    Idle,

    /// Waiting for the prior (percent)
    CollectingPrior,

    /// Waiting for P(E|H) (percent)
    CollectingLikelihoodGivenHypothesis { prior: Probability },

    /// Waiting for P(E|¬H) (percent)
    CollectingLikelihoodGivenNotHypothesis {
        prior: Probability,
        likelihood_given_h: Probability,
    },

    /// Waiting for how many times to apply the update
    CollectingRepeatCount {
        prior: Probability,
        likelihood_given_h: Probability,
        likelihood_given_not_h: Probability,
    },
}

impl ConvStage {
    pub fn name(&self) -> StageName {
        match self {
            ConvStage::Idle => StageName::Idle,
            ConvStage::CollectingPrior => StageName::CollectingPrior,
            ConvStage::CollectingLikelihoodGivenHypothesis { .. } => {
                StageName::CollectingLikelihoodGivenHypothesis
            }
            ConvStage::CollectingLikelihoodGivenNotHypothesis { .. } => {
                StageName::CollectingLikelihoodGivenNotHypothesis
            }
            ConvStage::CollectingRepeatCount { .. } => StageName::CollectingRepeatCount,
        }
    }

    /// Check if a flow is in progress
    #[allow(dead_code)] // Test inspection
    pub fn is_collecting(&self) -> bool {
        !matches!(self, ConvStage::Idle)
    }
}

/// Stage identifier without payload, used in outcomes and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Idle,
    CollectingPrior,
    CollectingLikelihoodGivenHypothesis,
    CollectingLikelihoodGivenNotHypothesis,
    CollectingRepeatCount,
}

impl StageName {
    pub fn as_str(self) -> &'static str {
        match self {
            StageName::Idle => "idle",
            StageName::CollectingPrior => "collecting_prior",
            StageName::CollectingLikelihoodGivenHypothesis => {
                "collecting_likelihood_given_hypothesis"
            }
            StageName::CollectingLikelihoodGivenNotHypothesis => {
                "collecting_likelihood_given_not_hypothesis"
            }
            StageName::CollectingRepeatCount => "collecting_repeat_count",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Session
// ============================================================================

/// Per-user conversation state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub stage: ConvStage,
    /// Posterior trail carried across calculator runs, oldest first
    #[serde(default)]
    pub chain: Vec<Probability>,
    /// Never reset, only grows
    #[serde(default)]
    pub lifetime_check_count: u64,
}

impl Session {
    /// Most recent posterior from an earlier run
    pub fn last_posterior(&self) -> Option<Probability> {
        self.chain.last().copied()
    }

    #[allow(dead_code)] // Test inspection
    pub fn pending_prior(&self) -> Option<Probability> {
        match self.stage {
            ConvStage::CollectingLikelihoodGivenHypothesis { prior }
            | ConvStage::CollectingLikelihoodGivenNotHypothesis { prior, .. }
            | ConvStage::CollectingRepeatCount { prior, .. } => Some(prior),
            ConvStage::Idle | ConvStage::CollectingPrior => None,
        }
    }

    #[allow(dead_code)] // State query utility
    pub fn pending_likelihood_given_h(&self) -> Option<Probability> {
        match self.stage {
            ConvStage::CollectingLikelihoodGivenNotHypothesis {
                likelihood_given_h, ..
            }
            | ConvStage::CollectingRepeatCount {
                likelihood_given_h, ..
            } => Some(likelihood_given_h),
            _ => None,
        }
    }

    #[allow(dead_code)] // State query utility
    pub fn pending_likelihood_given_not_h(&self) -> Option<Probability> {
        match self.stage {
            ConvStage::CollectingRepeatCount {
                likelihood_given_not_h,
                ..
            } => Some(likelihood_given_not_h),
            _ => None,
        }
    }
}

// ============================================================================
// Flow configuration
// ============================================================================

/// How the lifetime check counter advances after a computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckCountPolicy {
    /// One per applied update (a chain of n counts n)
    #[default]
    PerStep,
    /// One per completed flow
    PerFlow,
}

/// Default number of entries shown by the history command
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Default upper bound for the repeat count
pub const DEFAULT_MAX_REPEAT: u32 = 20;

/// Flow variant flags
#[derive(Debug, Clone, PartialEq)]
pub struct FlowConfig {
    /// Append single-update posteriors to the session chain
    pub carry_chain: bool,
    /// Ask for a repeat count after the two likelihoods
    pub ask_repeat_count: bool,
    pub count_policy: CheckCountPolicy,
    pub history_window: usize,
    pub max_repeat: u32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            carry_chain: true,
            ask_repeat_count: false,
            count_policy: CheckCountPolicy::PerStep,
            history_window: DEFAULT_HISTORY_WINDOW,
            max_repeat: DEFAULT_MAX_REPEAT,
        }
    }
}

/// Context for a conversation (immutable configuration)
#[derive(Debug, Clone)]
pub struct ConvContext {
    pub user_id: String,
    pub flow: FlowConfig,
    pub feedback: FeedbackSelector,
}

impl ConvContext {
    pub fn new(user_id: impl Into<String>, flow: FlowConfig) -> Self {
        Self {
            user_id: user_id.into(),
            flow,
            feedback: FeedbackSelector::default(),
        }
    }
}
