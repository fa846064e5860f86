//! Confidence-threshold analysis.
//!
//! Mapped columns are partitioned into bands:
//! - `High`: at or above the high threshold (default 0.9)
//! - `Medium`: at or above the medium threshold (default 0.6)
//! - `Low`: everything below the medium threshold

use serde::{Deserialize, Serialize};

use colmap_model::MappingSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    Low,
    Medium,
    High,
}

impl ConfidenceBand {
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::High => "high confidence - likely correct",
            Self::Medium => "medium confidence - should review",
            Self::Low => "low confidence - needs verification",
        }
    }
}

/// Band boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    /// Minimum confidence for the high band (default: 0.90).
    pub high: f64,
    /// Minimum confidence for the medium band (default: 0.60).
    pub medium: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 0.90,
            medium: 0.60,
        }
    }
}

impl ConfidenceThresholds {
    #[must_use]
    pub fn categorize(&self, confidence: f64) -> ConfidenceBand {
        if confidence >= self.high {
            ConfidenceBand::High
        } else if confidence >= self.medium {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    /// Every mapped column is high confidence and nothing is unmapped.
    AutoApprove,
    /// Some columns are medium confidence.
    ReviewRecommended,
    /// Low-confidence or unmapped columns need explicit human confirmation.
    ConfirmationRequired,
}

impl Recommendation {
    pub fn message(&self) -> &'static str {
        match self {
            Self::AutoApprove => "All mappings are high confidence; approval can proceed.",
            Self::ReviewRecommended => {
                "Some mappings are medium confidence; manual review is recommended."
            }
            Self::ConfirmationRequired => {
                "Low-confidence or unmapped columns present; explicit human confirmation is required."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceAnalysis {
    pub high: Vec<String>,
    pub medium: Vec<String>,
    pub low: Vec<String>,
    pub unmapped: Vec<String>,
    pub recommendation: Recommendation,
}

impl ConfidenceAnalysis {
    pub fn requires_confirmation(&self) -> bool {
        self.recommendation == Recommendation::ConfirmationRequired
    }
}

pub fn analyze_confidence(
    mapping_set: &MappingSet,
    thresholds: &ConfidenceThresholds,
) -> ConfidenceAnalysis {
    let mut high = Vec::new();
    let mut medium = Vec::new();
    let mut low = Vec::new();
    for candidate in mapping_set.mapped() {
        let bucket = match thresholds.categorize(candidate.confidence) {
            ConfidenceBand::High => &mut high,
            ConfidenceBand::Medium => &mut medium,
            ConfidenceBand::Low => &mut low,
        };
        bucket.push(candidate.target_column.clone());
    }
    let unmapped: Vec<String> = mapping_set
        .unmapped()
        .map(|c| c.target_column.clone())
        .collect();

    let recommendation = if !low.is_empty() || !unmapped.is_empty() {
        Recommendation::ConfirmationRequired
    } else if !medium.is_empty() {
        Recommendation::ReviewRecommended
    } else {
        Recommendation::AutoApprove
    };

    ConfidenceAnalysis {
        high,
        medium,
        low,
        unmapped,
        recommendation,
    }
}
