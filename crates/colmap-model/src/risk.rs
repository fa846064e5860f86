use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse severity band attached to audited operations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// One band more severe, saturating at `High`.
    #[must_use]
    pub fn raise(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline operation a risk assessment was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskOperation {
    MappingSuggest,
    MappingApprove,
    SqlGenerate,
    SqlExecute,
}

impl RiskOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MappingSuggest => "MAPPING_SUGGEST",
            Self::MappingApprove => "MAPPING_APPROVE",
            Self::SqlGenerate => "SQL_GENERATE",
            Self::SqlExecute => "SQL_EXECUTE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub operation: RiskOperation,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
    pub mitigations: Vec<String>,
    pub recommendation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raise_saturates() {
        assert_eq!(RiskLevel::Low.raise(), RiskLevel::Medium);
        assert_eq!(RiskLevel::Medium.raise(), RiskLevel::High);
        assert_eq!(RiskLevel::High.raise(), RiskLevel::High);
    }

    #[test]
    fn levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }

    #[test]
    fn serializes_uppercase() {
        let json = serde_json::to_string(&RiskLevel::Medium).unwrap();
        assert_eq!(json, "\"MEDIUM\"");
    }
}
