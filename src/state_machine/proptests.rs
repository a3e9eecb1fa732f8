//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::event::Command;
use super::state::*;
use super::transition::*;
use super::*;
use crate::bayes::Probability;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_probability() -> impl Strategy<Value = Probability> {
    (0.0f64..=1.0).prop_map(|v| Probability::new(v).unwrap())
}

fn arb_collecting_stage() -> impl Strategy<Value = ConvStage> {
    prop_oneof![
        Just(ConvStage::CollectingPrior),
        arb_probability().prop_map(|prior| ConvStage::CollectingLikelihoodGivenHypothesis { prior }),
        (arb_probability(), arb_probability()).prop_map(|(prior, likelihood_given_h)| {
            ConvStage::CollectingLikelihoodGivenNotHypothesis {
                prior,
                likelihood_given_h,
            }
        }),
        (arb_probability(), arb_probability(), arb_probability()).prop_map(
            |(prior, likelihood_given_h, likelihood_given_not_h)| ConvStage::CollectingRepeatCount {
                prior,
                likelihood_given_h,
                likelihood_given_not_h,
            }
        ),
    ]
}

fn arb_stage() -> impl Strategy<Value = ConvStage> {
    prop_oneof![Just(ConvStage::Idle), arb_collecting_stage()]
}

fn arb_session_with(stage: impl Strategy<Value = ConvStage>) -> impl Strategy<Value = Session> {
    (
        stage,
        proptest::collection::vec(arb_probability(), 0..5),
        0u64..1_000,
    )
        .prop_map(|(stage, chain, lifetime_check_count)| Session {
            stage,
            chain,
            lifetime_check_count,
        })
}

fn arb_flow() -> impl Strategy<Value = FlowConfig> {
    (
        any::<bool>(),
        any::<bool>(),
        prop_oneof![Just(CheckCountPolicy::PerStep), Just(CheckCountPolicy::PerFlow)],
    )
        .prop_map(|(carry_chain, ask_repeat_count, count_policy)| FlowConfig {
            carry_chain,
            ask_repeat_count,
            count_policy,
            ..FlowConfig::default()
        })
}

/// Text rejected by every collecting stage
fn arb_invalid_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,8}".prop_filter("not a command", |s| Command::parse(s).is_none()),
        (100.5f64..1e6).prop_map(|v| v.to_string()),
        (-1e6f64..-0.001).prop_map(|v| v.to_string()),
    ]
}

fn arb_valid_percent_text() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..=100).prop_map(|v| v.to_string()),
        (0.0f64..=100.0).prop_map(|v| format!("{v:.2}")),
        (0u32..100, 1u32..10).prop_map(|(a, b)| format!("{a},{b}")),
    ]
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_valid_percent_text(),
        (1u32..=20).prop_map(|v| v.to_string()),
        arb_invalid_text(),
        Just("calc".to_string()),
        Just("back".to_string()),
        Just("/cancel".to_string()),
        Just("history".to_string()),
        Just("motivation".to_string()),
        Just("/start".to_string()),
    ]
}

fn step_count(effects: &[Effect]) -> usize {
    effects
        .iter()
        .map(|e| match e {
            Effect::CommitComputation { steps } => steps.len(),
            _ => 0,
        })
        .sum()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_invalid_input_never_changes_session(
        session in arb_session_with(arb_collecting_stage()),
        flow in arb_flow(),
        text in arb_invalid_text(),
    ) {
        let context = ConvContext::new("prop", flow);
        let result = transition(&session, &context, Event::user_text(text));
        prop_assert_eq!(&result.new_state, &session);
        prop_assert!(!result.effects.iter().any(Effect::is_write));
        let is_invalid = matches!(
            result.reply(),
            Some(ConversationOutcome::InvalidInput { stage, .. }) if *stage == session.stage.name()
        );
        prop_assert!(is_invalid);
    }

    #[test]
    fn prop_valid_percent_advances_from_percent_stages(
        session in arb_session_with(arb_collecting_stage().prop_filter(
            "percent stages only",
            |s| !matches!(s, ConvStage::CollectingRepeatCount { .. }),
        )),
        flow in arb_flow(),
        text in arb_valid_percent_text(),
    ) {
        let context = ConvContext::new("prop", flow);
        let result = transition(&session, &context, Event::user_text(text));
        prop_assert_ne!(result.new_state.stage.name(), session.stage.name());
        prop_assert!(result.effects.iter().any(Effect::is_write));
    }

    #[test]
    fn prop_every_transition_replies_or_reports(
        session in arb_session_with(arb_stage()),
        flow in arb_flow(),
        text in arb_text(),
    ) {
        let context = ConvContext::new("prop", flow);
        let result = transition(&session, &context, Event::user_text(text));
        let answered = result.reply().is_some()
            || result.effects.iter().any(|e| matches!(e, Effect::ReportHistory { .. }));
        prop_assert!(answered);
    }

    #[test]
    fn prop_counter_tracks_recorded_steps(
        flow in arb_flow(),
        texts in proptest::collection::vec(arb_text(), 1..40),
    ) {
        let context = ConvContext::new("prop", flow.clone());
        let mut state = Session::default();
        let mut recorded = 0usize;
        let mut completions = 0u64;

        for text in texts {
            let result = transition(&state, &context, Event::user_text(text));
            let steps = step_count(&result.effects);
            prop_assert!(result.new_state.lifetime_check_count >= state.lifetime_check_count);
            if steps > 0 {
                completions += 1;
                prop_assert_eq!(result.new_state.stage.clone(), ConvStage::Idle);
            }
            recorded += steps;
            state = result.new_state;
        }

        match flow.count_policy {
            CheckCountPolicy::PerStep => prop_assert_eq!(state.lifetime_check_count, recorded as u64),
            CheckCountPolicy::PerFlow => prop_assert_eq!(state.lifetime_check_count, completions),
        }
        if !flow.carry_chain || flow.ask_repeat_count {
            prop_assert!(state.chain.is_empty());
        } else {
            prop_assert_eq!(state.chain.len(), recorded);
        }
    }
}

#[test]
fn test_menu_hint_is_reply_for_unknown_idle_text() {
    let result = transition(
        &Session::default(),
        &ConvContext::new("u", FlowConfig::default()),
        Event::user_text("what"),
    );
    assert_eq!(
        result.reply(),
        Some(&ConversationOutcome::prompt(StageName::Idle, MENU_HINT))
    );
}
