//! Pure state transition function
//!
//! Given the same session, context and event this always yields the same
//! new session and effects. Storage and clocks live in the runtime.

use super::event::Command;
use super::input::{parse_percent, parse_repeat_count};
use super::outcome::{ConversationOutcome, StepReport};
use super::state::{CheckCountPolicy, ConvStage, StageName};
use super::{ConvContext, Effect, Event, Session};
use crate::bayes::{self, Probability, RiskBand, Verdict};

pub const WELCOME_HINT: &str = "Hi! I help you weigh a worry with Bayes' rule. \
Send `calc` to start the calculator, `history` for past checks, `motivation` for a boost, \
or `help` to learn how it works.";

pub const MENU_HINT: &str =
    "Main menu: `calc` (calculator), `history`, `motivation`, `help`.";

pub const HELP_HINT: &str = "Bayes' rule updates a belief with new evidence. \
1) Enter how likely you think your fear is (0-100). \
2) If the fear were true, how likely is the sign you notice (0-100)? \
3) If the fear were false, how likely is that same sign (0-100)? \
Example: 70, 30, 80 gives 46.7%.";

pub const PRIOR_HINT: &str =
    "Step 1: how likely do you think your fear is? Send a number from 0 to 100, or `back`.";

pub const LIKELIHOOD_H_HINT: &str =
    "Step 2: if the fear were true, how likely would you notice this sign? Send 0 to 100.";

pub const LIKELIHOOD_NOT_H_HINT: &str =
    "Step 3: if the fear were false, how likely would you notice this sign? Send 0 to 100.";

pub const REPEAT_COUNT_HINT: &str =
    "Step 4: how many times should the update be applied? Send a whole number from 1 to";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: Session) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    /// The outcome delivered by the last `Reply` effect, if any
    #[allow(dead_code)] // Used by tests and logging
    pub fn reply(&self) -> Option<&ConversationOutcome> {
        self.effects.iter().rev().find_map(|e| match e {
            Effect::Reply(outcome) => Some(outcome),
            _ => None,
        })
    }
}

/// Pure transition function
pub fn transition(state: &Session, context: &ConvContext, event: Event) -> TransitionResult {
    match event {
        Event::Reset => TransitionResult::new(Session::default())
            .with_effect(Effect::PersistSession)
            .with_effect(Effect::reply(ConversationOutcome::prompt(
                StageName::Idle,
                WELCOME_HINT,
            ))),
        Event::UserText { text } => handle_text(state, context, &text),
    }
}

fn handle_text(state: &Session, context: &ConvContext, text: &str) -> TransitionResult {
    let command = Command::parse(text);

    match (&state.stage, command) {
        // ============================================================
        // Global commands
        // ============================================================
        (_, Some(Command::Start)) => {
            move_to(state, ConvStage::Idle).with_effect(Effect::reply(
                ConversationOutcome::prompt(StageName::Idle, WELCOME_HINT),
            ))
        }

        // Restarting mid-flow discards partial values
        (_, Some(Command::Calculator)) => {
            let suggested_percent = state.last_posterior().map(Probability::as_percent);
            move_to(state, ConvStage::CollectingPrior).with_effect(Effect::reply(
                ConversationOutcome::Prompt {
                    stage: StageName::CollectingPrior,
                    hint: PRIOR_HINT.to_string(),
                    suggested_percent,
                },
            ))
        }

        (_, Some(Command::Cancel)) => {
            move_to(state, ConvStage::Idle).with_effect(Effect::reply(ConversationOutcome::Cancelled))
        }

        (ConvStage::CollectingPrior, Some(Command::Back)) => move_to(state, ConvStage::Idle)
            .with_effect(Effect::reply(ConversationOutcome::prompt(
                StageName::Idle,
                MENU_HINT,
            ))),

        // ============================================================
        // Menu
        // ============================================================
        (ConvStage::Idle, Some(Command::History)) => {
            TransitionResult::new(state.clone()).with_effect(Effect::ReportHistory {
                limit: context.flow.history_window,
            })
        }

        (ConvStage::Idle, Some(Command::Motivation)) => TransitionResult::new(state.clone())
            .with_effect(Effect::reply(ConversationOutcome::Motivation {
                message: context.feedback.select(state.lifetime_check_count).to_string(),
                lifetime_check_count: state.lifetime_check_count,
            })),

        (ConvStage::Idle, Some(Command::Help)) => TransitionResult::new(state.clone())
            .with_effect(Effect::reply(ConversationOutcome::prompt(
                StageName::Idle,
                HELP_HINT,
            ))),

        (ConvStage::Idle, _) => TransitionResult::new(state.clone()).with_effect(Effect::reply(
            ConversationOutcome::prompt(StageName::Idle, MENU_HINT),
        )),

        // ============================================================
        // Collecting stages: everything else is a value
        // ============================================================
        (ConvStage::CollectingPrior, _) => match parse_percent(text) {
            Ok(prior) => move_to(state, ConvStage::CollectingLikelihoodGivenHypothesis { prior })
                .with_effect(Effect::reply(ConversationOutcome::prompt(
                    StageName::CollectingLikelihoodGivenHypothesis,
                    LIKELIHOOD_H_HINT,
                ))),
            Err(reason) => reject(state, reason),
        },

        (ConvStage::CollectingLikelihoodGivenHypothesis { prior }, _) => {
            match parse_percent(text) {
                Ok(likelihood_given_h) => move_to(
                    state,
                    ConvStage::CollectingLikelihoodGivenNotHypothesis {
                        prior: *prior,
                        likelihood_given_h,
                    },
                )
                .with_effect(Effect::reply(ConversationOutcome::prompt(
                    StageName::CollectingLikelihoodGivenNotHypothesis,
                    LIKELIHOOD_NOT_H_HINT,
                ))),
                Err(reason) => reject(state, reason),
            }
        }

        (
            ConvStage::CollectingLikelihoodGivenNotHypothesis {
                prior,
                likelihood_given_h,
            },
            _,
        ) => match parse_percent(text) {
            Ok(likelihood_given_not_h) if context.flow.ask_repeat_count => move_to(
                state,
                ConvStage::CollectingRepeatCount {
                    prior: *prior,
                    likelihood_given_h: *likelihood_given_h,
                    likelihood_given_not_h,
                },
            )
            .with_effect(Effect::reply(ConversationOutcome::prompt(
                StageName::CollectingRepeatCount,
                &format!("{REPEAT_COUNT_HINT} {}.", context.flow.max_repeat),
            ))),
            Ok(likelihood_given_not_h) => complete(
                state,
                context,
                *prior,
                *likelihood_given_h,
                likelihood_given_not_h,
                1,
            ),
            Err(reason) => reject(state, reason),
        },

        (
            ConvStage::CollectingRepeatCount {
                prior,
                likelihood_given_h,
                likelihood_given_not_h,
            },
            _,
        ) => match parse_repeat_count(text, context.flow.max_repeat) {
            Ok(count) => complete(
                state,
                context,
                *prior,
                *likelihood_given_h,
                *likelihood_given_not_h,
                count,
            ),
            Err(reason) => reject(state, reason),
        },
    }
}

/// Change stage, keeping chain and counter. Persists only on an actual change.
fn move_to(state: &Session, stage: ConvStage) -> TransitionResult {
    if state.stage == stage {
        return TransitionResult::new(state.clone());
    }
    let next = Session {
        stage,
        ..state.clone()
    };
    TransitionResult::new(next).with_effect(Effect::PersistSession)
}

/// Same stage, same session, re-prompt
fn reject(state: &Session, reason: super::input::InvalidReason) -> TransitionResult {
    TransitionResult::new(state.clone()).with_effect(Effect::reply(
        ConversationOutcome::InvalidInput {
            stage: state.stage.name(),
            reason,
        },
    ))
}

/// Run the engine and commit its result
fn complete(
    state: &Session,
    context: &ConvContext,
    prior: Probability,
    likelihood_given_h: Probability,
    likelihood_given_not_h: Probability,
    repeat: u32,
) -> TransitionResult {
    let result = bayes::chain(prior, likelihood_given_h, likelihood_given_not_h, repeat as usize);
    let steps: Vec<StepReport> = result
        .steps()
        .map(|(prior, posterior)| StepReport::new(prior, posterior))
        .collect();

    let mut next = Session {
        stage: ConvStage::Idle,
        ..state.clone()
    };

    // Repeat-count chains are self-contained and never feed the session trail
    if context.flow.carry_chain && !context.flow.ask_repeat_count {
        next.chain.extend(result.posteriors());
    }

    let increment = match context.flow.count_policy {
        CheckCountPolicy::PerStep => u64::from(repeat),
        CheckCountPolicy::PerFlow => 1,
    };
    next.lifetime_check_count = next.lifetime_check_count.saturating_add(increment);

    let outcome = ConversationOutcome::ComputationResult {
        steps: steps.clone(),
        lifetime_check_count: next.lifetime_check_count,
        feedback_message: context.feedback.select(next.lifetime_check_count).to_string(),
        verdict: Verdict::between(result.initial(), result.last()),
        risk_band: RiskBand::of(result.last()),
    };

    TransitionResult::new(next).with_effects([
        Effect::CommitComputation { steps },
        Effect::reply(outcome),
    ])
}
