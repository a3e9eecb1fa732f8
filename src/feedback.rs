//! Counter-driven feedback messages

const MOTIVATIONS: &[&str] = &[
    "💪 You are stronger than the worry. The intrusive thought is not you.",
    "🧠 Maths does not panic. The numbers show what is actually likely.",
    "✨ Every check you work through is a win against the brain's false alarm.",
    "🌟 Bayes is on your side. Clear thinking, freer living.",
    "🔥 Another check done, another round won!",
    "💡 Numbers shrink anxiety. Maths is your friend.",
    "🌈 The worry is getting smaller. That is progress!",
];

/// Deterministic lookup: `catalog[counter mod k]`
#[derive(Debug, Clone, Copy)]
pub struct FeedbackSelector {
    catalog: &'static [&'static str],
}

impl Default for FeedbackSelector {
    fn default() -> Self {
        Self {
            catalog: MOTIVATIONS,
        }
    }
}

impl FeedbackSelector {
    /// Returns `None` for an empty catalog
    #[allow(dead_code)] // Alternate catalogs (tests, localisation)
    pub fn new(catalog: &'static [&'static str]) -> Option<Self> {
        (!catalog.is_empty()).then_some(Self { catalog })
    }

    #[allow(dead_code)] // Test inspection
    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn select(&self, counter: u64) -> &'static str {
        let len = self.catalog.len() as u64;
        #[allow(clippy::cast_possible_truncation)] // index < catalog length
        let index = (counter % len) as usize;
        self.catalog[index]
    }
}
