//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod input;
pub mod outcome;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
#[allow(unused_imports)] // Public API re-exports
pub use input::InvalidReason;
pub use outcome::{ConversationOutcome, HistorySnapshot, StepReport};
pub use state::{CheckCountPolicy, ConvContext, ConvStage, FlowConfig, Session, StageName};
pub use transition::transition;
