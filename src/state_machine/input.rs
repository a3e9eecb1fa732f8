//! Numeric input validation for collecting stages

use crate::bayes::Probability;
use serde::Serialize;
use std::fmt;

/// Why a value was rejected
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvalidReason {
    NotANumber,
    OutOfRange { min: f64, max: f64 },
    NotWholeNumber,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::NotANumber => f.write_str("not a number"),
            InvalidReason::OutOfRange { min, max } => {
                write!(f, "must be between {min} and {max}")
            }
            InvalidReason::NotWholeNumber => f.write_str("must be a whole number"),
        }
    }
}

/// Accepts both `.` and `,` as the decimal separator
fn parse_decimal(text: &str) -> Result<f64, InvalidReason> {
    let value: f64 = text
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| InvalidReason::NotANumber)?;
    if !value.is_finite() {
        return Err(InvalidReason::NotANumber);
    }
    Ok(value)
}

/// Percentage in `[0, 100]`, returned as a probability
pub fn parse_percent(text: &str) -> Result<Probability, InvalidReason> {
    let value = parse_decimal(text)?;
    Probability::from_percent(value).ok_or(InvalidReason::OutOfRange {
        min: 0.0,
        max: 100.0,
    })
}

/// Whole number in `[1, max]`
pub fn parse_repeat_count(text: &str, max: u32) -> Result<u32, InvalidReason> {
    let value = parse_decimal(text)?;
    if !(1.0..=f64::from(max)).contains(&value) {
        return Err(InvalidReason::OutOfRange {
            min: 1.0,
            max: f64::from(max),
        });
    }
    if value.fract() != 0.0 {
        return Err(InvalidReason::NotWholeNumber);
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // range-checked above
    Ok(value as u32)
}
