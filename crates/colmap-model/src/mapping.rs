//! Column mapping types for source-to-target table mapping.
//!
//! A [`MappingSet`] holds one [`MappingCandidate`] per target column, in
//! target ordinal order, together with aggregate statistics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Key identifying a source/target table pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TablePair {
    pub source_table: String,
    pub target_table: String,
}

impl TablePair {
    pub fn new(source_table: impl Into<String>, target_table: impl Into<String>) -> Self {
        Self {
            source_table: source_table.into(),
            target_table: target_table.into(),
        }
    }
}

impl fmt::Display for TablePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_to_{}", self.source_table, self.target_table)
    }
}

/// Expression template with a single `{source}` substitution point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transform {
    template: String,
}

impl Transform {
    pub const PLACEHOLDER: &'static str = "{source}";

    /// Parses a template, requiring exactly one placeholder.
    pub fn new(template: impl Into<String>) -> Option<Self> {
        let template = template.into();
        (template.matches(Self::PLACEHOLDER).count() == 1).then_some(Self { template })
    }

    /// `CAST({source} AS <target_type>)`.
    pub fn cast(target_type: &str) -> Self {
        Self {
            template: format!("CAST({} AS {target_type})", Self::PLACEHOLDER),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn render(&self, source_column: &str) -> String {
        self.template.replace(Self::PLACEHOLDER, source_column)
    }
}

/// Which matcher rule produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    ExactName,
    Containment,
    NormalizedName,
}

impl MatchRule {
    pub fn description(&self) -> &'static str {
        match self {
            Self::ExactName => "exact name match",
            Self::Containment => "partial name match",
            Self::NormalizedName => "similar name after removing common prefixes/suffixes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingStatus {
    Suggested,
    Unmapped,
}

impl MappingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suggested => "suggested",
            Self::Unmapped => "unmapped",
        }
    }
}

/// Proposed correspondence between one target column and at most one source
/// column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingCandidate {
    pub target_column: String,
    pub target_type: String,
    pub source_column: Option<String>,
    pub source_type: Option<String>,
    /// Confidence score (0.0 to 1.0), rounded to two decimals.
    pub confidence: f64,
    pub transformation: Option<Transform>,
    pub status: MappingStatus,
    pub rule: Option<MatchRule>,
}

impl MappingCandidate {
    pub fn unmapped(target_column: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            target_column: target_column.into(),
            target_type: target_type.into(),
            source_column: None,
            source_type: None,
            confidence: 0.0,
            transformation: None,
            status: MappingStatus::Unmapped,
            rule: None,
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.source_column.is_some()
    }

    /// SELECT-list expression for this column: the rendered transform, the
    /// bare source column, or `NULL` when unmapped.
    pub fn select_expression(&self) -> String {
        match (&self.source_column, &self.transformation) {
            (Some(source), Some(transform)) => transform.render(source),
            (Some(source), None) => source.clone(),
            (None, _) => "NULL".to_string(),
        }
    }

    pub fn rendered_transform(&self) -> Option<String> {
        let source = self.source_column.as_deref()?;
        self.transformation.as_ref().map(|t| t.render(source))
    }
}

/// Aggregate counts over a mapping set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MappingStats {
    pub mapped_count: usize,
    pub unmapped_count: usize,
    /// Mean confidence over mapped columns only.
    pub average_confidence: f64,
}

impl MappingStats {
    pub fn from_candidates(candidates: &[MappingCandidate]) -> Self {
        let mapped: Vec<f64> = candidates
            .iter()
            .filter(|c| c.is_mapped())
            .map(|c| c.confidence)
            .collect();
        let mapped_count = mapped.len();
        let sum: f64 = mapped.iter().sum();
        let average = sum / mapped_count.max(1) as f64;
        Self {
            mapped_count,
            unmapped_count: candidates.len() - mapped_count,
            average_confidence: round_confidence(average),
        }
    }
}

/// Guardrail annotation attached when a mapping set references columns that
/// do not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationAnnotation {
    pub validation_error: String,
    pub hallucinated_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSet {
    pub source_table: String,
    pub target_table: String,
    pub mappings: Vec<MappingCandidate>,
    pub stats: MappingStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationAnnotation>,
}

impl MappingSet {
    pub fn new(
        source_table: impl Into<String>,
        target_table: impl Into<String>,
        mappings: Vec<MappingCandidate>,
    ) -> Self {
        let stats = MappingStats::from_candidates(&mappings);
        Self {
            source_table: source_table.into(),
            target_table: target_table.into(),
            mappings,
            stats,
            validation: None,
        }
    }

    pub fn key(&self) -> TablePair {
        TablePair::new(&self.source_table, &self.target_table)
    }

    pub fn mapped(&self) -> impl Iterator<Item = &MappingCandidate> {
        self.mappings.iter().filter(|m| m.is_mapped())
    }

    pub fn unmapped(&self) -> impl Iterator<Item = &MappingCandidate> {
        self.mappings.iter().filter(|m| !m.is_mapped())
    }

    pub fn candidate(&self, target_column: &str) -> Option<&MappingCandidate> {
        self.mappings
            .iter()
            .find(|m| m.target_column == target_column)
    }

    /// Distinct source columns referenced, in first-seen order.
    pub fn source_columns(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for column in self.mapped().filter_map(|m| m.source_column.as_deref()) {
            if !out.contains(&column) {
                out.push(column);
            }
        }
        out
    }

    pub fn is_valid(&self) -> bool {
        self.validation.is_none()
    }
}

/// Rounds to two decimals and clamps into [0, 1]. NaN becomes 0.
pub fn round_confidence(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    ((value * 100.0).round() / 100.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapped(target: &str, source: &str, confidence: f64) -> MappingCandidate {
        MappingCandidate {
            target_column: target.to_string(),
            target_type: "STRING".to_string(),
            source_column: Some(source.to_string()),
            source_type: Some("STRING".to_string()),
            confidence,
            transformation: None,
            status: MappingStatus::Suggested,
            rule: Some(MatchRule::ExactName),
        }
    }

    #[test]
    fn stats_ignore_unmapped_columns() {
        let set = MappingSet::new(
            "s",
            "t",
            vec![
                mapped("a", "a", 0.95),
                mapped("b", "bb", 0.75),
                MappingCandidate::unmapped("c", "STRING"),
            ],
        );
        assert_eq!(set.stats.mapped_count, 2);
        assert_eq!(set.stats.unmapped_count, 1);
        assert_eq!(set.stats.average_confidence, 0.85);
    }

    #[test]
    fn stats_with_nothing_mapped() {
        let set = MappingSet::new("s", "t", vec![MappingCandidate::unmapped("c", "STRING")]);
        assert_eq!(set.stats.mapped_count, 0);
        assert_eq!(set.stats.average_confidence, 0.0);
    }

    #[test]
    fn transform_requires_single_placeholder() {
        assert!(Transform::new("UPPER({source})").is_some());
        assert!(Transform::new("CONCAT({source}, {source})").is_none());
        assert!(Transform::new("NOW()").is_none());
    }

    #[test]
    fn select_expression_variants() {
        let mut candidate = mapped("amount", "amount", 0.85);
        assert_eq!(candidate.select_expression(), "amount");
        candidate.transformation = Some(Transform::cast("NUMERIC"));
        assert_eq!(candidate.select_expression(), "CAST(amount AS NUMERIC)");
        assert_eq!(
            MappingCandidate::unmapped("x", "STRING").select_expression(),
            "NULL"
        );
    }

    #[test]
    fn round_confidence_clamps() {
        assert_eq!(round_confidence(0.95 - 0.1), 0.85);
        assert_eq!(round_confidence(-0.2), 0.0);
        assert_eq!(round_confidence(f64::NAN), 0.0);
        assert_eq!(round_confidence(1.3), 1.0);
    }

    #[test]
    fn pair_key_format() {
        assert_eq!(TablePair::new("a", "b").to_string(), "a_to_b");
    }
}
