//! Bayesian update engine
//!
//! Pure functions over validated probabilities. Range validation belongs to
//! the caller; `Probability` carries the `[0, 1]` invariant in the type.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Differences below this are reported as "unchanged".
const VERDICT_TOLERANCE: f64 = 1e-9;

/// `VERDICT_TOLERANCE` in percentage points, for comparisons on stored history
pub const REDUCTION_TOLERANCE_PERCENT: f64 = VERDICT_TOLERANCE * 100.0;

/// A probability in the closed interval `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Probability(f64);

#[derive(Debug, Error, PartialEq)]
#[error("probability out of range: {0}")]
pub struct OutOfRange(pub f64);

impl Probability {
    pub const ZERO: Probability = Probability(0.0);

    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && (0.0..=1.0).contains(&value)).then_some(Self(value))
    }

    /// Convert a percentage in `[0, 100]`
    pub fn from_percent(percent: f64) -> Option<Self> {
        if !(0.0..=100.0).contains(&percent) {
            return None;
        }
        Self::new(percent / 100.0)
    }

    #[allow(dead_code)] // Test inspection
    pub fn value(self) -> f64 {
        self.0
    }

    pub fn as_percent(self) -> f64 {
        self.0 * 100.0
    }
}

impl TryFrom<f64> for Probability {
    type Error = OutOfRange;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(OutOfRange(value))
    }
}

impl From<Probability> for f64 {
    fn from(p: Probability) -> Self {
        p.0
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.as_percent())
    }
}

/// One application of Bayes' rule.
///
/// `P(H|E) = P(E|H)·P(H) / (P(E|H)·P(H) + P(E|¬H)·(1 − P(H)))`
///
/// A zero denominator yields exactly `0`.
pub fn update(
    prior: Probability,
    likelihood_given_h: Probability,
    likelihood_given_not_h: Probability,
) -> Probability {
    let numerator = likelihood_given_h.0 * prior.0;
    let denominator = numerator + likelihood_given_not_h.0 * (1.0 - prior.0);
    if denominator == 0.0 {
        return Probability::ZERO;
    }
    // Neutral evidence: the ratio is exactly 1, so skip the rounding drift
    if likelihood_given_h == likelihood_given_not_h {
        return prior;
    }
    // numerator <= denominator, both non-negative
    Probability((numerator / denominator).clamp(0.0, 1.0))
}

/// Apply `update` `steps` times, each posterior feeding the next prior.
pub fn chain(
    prior: Probability,
    likelihood_given_h: Probability,
    likelihood_given_not_h: Probability,
    steps: usize,
) -> ChainResult {
    let mut values = Vec::with_capacity(steps + 1);
    values.push(prior);
    let mut current = prior;
    for _ in 0..steps {
        current = update(current, likelihood_given_h, likelihood_given_not_h);
        values.push(current);
    }
    ChainResult { values }
}

/// Starting prior followed by each successive posterior (`len == steps + 1`)
#[derive(Debug, Clone, PartialEq)]
pub struct ChainResult {
    values: Vec<Probability>,
}

impl ChainResult {
    #[allow(dead_code)] // Test inspection
    pub fn values(&self) -> &[Probability] {
        &self.values
    }

    pub fn initial(&self) -> Probability {
        self.values.first().copied().unwrap_or(Probability::ZERO)
    }

    pub fn last(&self) -> Probability {
        self.values.last().copied().unwrap_or(Probability::ZERO)
    }

    /// Number of updates applied
    #[allow(dead_code)] // Test inspection
    pub fn len(&self) -> usize {
        self.values.len().saturating_sub(1)
    }

    /// `(prior, posterior)` per link
    pub fn steps(&self) -> impl Iterator<Item = (Probability, Probability)> + '_ {
        self.values.windows(2).map(|w| (w[0], w[1]))
    }

    pub fn posteriors(&self) -> impl Iterator<Item = Probability> + '_ {
        self.values.iter().skip(1).copied()
    }
}

/// Direction of belief change across a computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Decreased,
    Unchanged,
    Increased,
}

impl Verdict {
    pub fn between(initial: Probability, last: Probability) -> Self {
        let delta = last.0 - initial.0;
        if delta.abs() < VERDICT_TOLERANCE {
            Verdict::Unchanged
        } else if delta < 0.0 {
            Verdict::Decreased
        } else {
            Verdict::Increased
        }
    }
}

/// Coarse reading of a final posterior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    VeryLow,
    Low,
    Moderate,
    High,
}

impl RiskBand {
    pub fn of(p: Probability) -> Self {
        match p.0 {
            v if v < 0.1 => RiskBand::VeryLow,
            v if v < 0.3 => RiskBand::Low,
            v if v < 0.6 => RiskBand::Moderate,
            _ => RiskBand::High,
        }
    }
}
