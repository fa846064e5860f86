//! Name-matching strategies and their ordered cascade.

use colmap_model::MatchRule;

use crate::normalize::{normalize_pair, tokens_pair_by_prefix};

/// One rule of the cascade.
pub trait NameMatcher: Send + Sync {
    fn rule(&self) -> MatchRule;

    /// Confidence assigned when this rule applies.
    fn confidence(&self) -> f64;

    fn matches(&self, source: &str, target: &str) -> bool;
}

/// Case-insensitive equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactName;

impl NameMatcher for ExactName {
    fn rule(&self) -> MatchRule {
        MatchRule::ExactName
    }

    fn confidence(&self) -> f64 {
        0.95
    }

    fn matches(&self, source: &str, target: &str) -> bool {
        source.eq_ignore_ascii_case(target)
    }
}

/// Either name contains the other, ignoring case.
#[derive(Debug, Clone, Copy, Default)]
pub struct Containment;

impl NameMatcher for Containment {
    fn rule(&self) -> MatchRule {
        MatchRule::Containment
    }

    fn confidence(&self) -> f64 {
        0.75
    }

    fn matches(&self, source: &str, target: &str) -> bool {
        let source = source.to_lowercase();
        let target = target.to_lowercase();
        contains_either(&source, &target)
    }
}

/// Equality or containment after prefix/suffix normalization, or a
/// token-by-token abbreviation of the other name.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedName;

impl NameMatcher for NormalizedName {
    fn rule(&self) -> MatchRule {
        MatchRule::NormalizedName
    }

    fn confidence(&self) -> f64 {
        0.60
    }

    fn matches(&self, source: &str, target: &str) -> bool {
        let (left, right) = normalize_pair(source, target);
        contains_either(&left, &right) || tokens_pair_by_prefix(&left, &right)
    }
}

fn contains_either(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

/// Rule that fired and the confidence it assigned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOutcome {
    pub rule: MatchRule,
    pub confidence: f64,
}

/// Matchers tried in priority order; the first that applies wins.
pub struct MatcherCascade {
    matchers: Vec<Box<dyn NameMatcher>>,
}

impl std::fmt::Debug for MatcherCascade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.matchers.iter().map(|m| m.rule()))
            .finish()
    }
}

impl Default for MatcherCascade {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ExactName),
            Box::new(Containment),
            Box::new(NormalizedName),
        ])
    }
}

impl MatcherCascade {
    pub fn new(matchers: Vec<Box<dyn NameMatcher>>) -> Self {
        Self { matchers }
    }

    pub fn evaluate(&self, source: &str, target: &str) -> Option<MatchOutcome> {
        self.matchers
            .iter()
            .find(|m| m.matches(source, target))
            .map(|m| MatchOutcome {
                rule: m.rule(),
                confidence: m.confidence(),
            })
    }

    /// Confidence of the matcher that produces `rule`, if it is in the
    /// cascade.
    pub fn confidence_of(&self, rule: MatchRule) -> Option<f64> {
        self.matchers
            .iter()
            .find(|m| m.rule() == rule)
            .map(|m| m.confidence())
    }
}
