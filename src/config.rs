//! Process configuration from environment variables

use crate::runtime::DEFAULT_IDLE_TIMEOUT;
use crate::state_machine::{CheckCountPolicy, FlowConfig};
use std::str::FromStr;
use std::time::Duration;

/// Volatile SQLite database
pub const IN_MEMORY_DB: &str = ":memory:";

const DEFAULT_PORT: u16 = 8000;

/// Configuration for the server process
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub port: u16,
    pub flow: FlowConfig,
    /// Idle time after which a user's runtime shuts down
    pub idle_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparseable values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = FlowConfig::default();

        let db_path = lookup("BAYES_DB_PATH").unwrap_or_else(|| {
            let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
            format!("{home}/.bayes-coach/bayes.db")
        });

        Self {
            db_path,
            port: parse_or(&lookup, "BAYES_PORT", DEFAULT_PORT),
            idle_timeout: Duration::from_secs(
                parse_or(&lookup, "BAYES_IDLE_TIMEOUT_SECS", DEFAULT_IDLE_TIMEOUT.as_secs()).max(1),
            ),
            flow: FlowConfig {
                carry_chain: parse_flag(&lookup, "BAYES_CARRY_CHAIN", defaults.carry_chain),
                ask_repeat_count: parse_flag(
                    &lookup,
                    "BAYES_ASK_REPEAT_COUNT",
                    defaults.ask_repeat_count,
                ),
                count_policy: parse_or(&lookup, "BAYES_COUNT_POLICY", defaults.count_policy),
                history_window: parse_or(&lookup, "BAYES_HISTORY_WINDOW", defaults.history_window),
                max_repeat: parse_or(&lookup, "BAYES_MAX_REPEAT", defaults.max_repeat).max(1),
            },
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path == IN_MEMORY_DB
    }
}

impl FromStr for CheckCountPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_step" | "step" => Ok(CheckCountPolicy::PerStep),
            "per_flow" | "flow" => Ok(CheckCountPolicy::PerFlow),
            other => Err(format!("unknown count policy: {other}")),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key = %key, value = %raw, "Ignoring invalid config value");
            default
        }),
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => default,
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        Some(v) => {
            tracing::warn!(key = %key, value = %v, "Ignoring invalid config flag");
            default
        }
    }
}
