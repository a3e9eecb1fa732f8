//! Events that can occur in a conversation

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Raw text delivered by the transport (untrusted)
    UserText { text: String },
    /// External restart trigger: re-zeroes the session, history untouched
    Reset,
}

impl Event {
    pub fn user_text(text: impl Into<String>) -> Self {
        Event::UserText { text: text.into() }
    }
}

/// Keywords recognised in user text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Calculator,
    Cancel,
    Back,
    History,
    Motivation,
    Help,
}

impl Command {
    /// Case-insensitive, leading `/` optional
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim();
        let word = word.strip_prefix('/').unwrap_or(word);
        match word.to_ascii_lowercase().as_str() {
            "start" => Some(Command::Start),
            "calc" | "calculator" | "calculate" => Some(Command::Calculator),
            "cancel" => Some(Command::Cancel),
            "back" => Some(Command::Back),
            "history" => Some(Command::History),
            "motivation" => Some(Command::Motivation),
            "help" => Some(Command::Help),
            _ => None,
        }
    }

    /// Commands honoured in every stage
    #[allow(dead_code)] // Test inspection
    pub fn is_global(self) -> bool {
        matches!(self, Command::Start | Command::Calculator | Command::Cancel)
    }
}
