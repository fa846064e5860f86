//! Review payload shown to the approver.

use colmap_guard::ConfidenceAnalysis;
use colmap_model::{MappingSet, RiskAssessment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub source_table: String,
    pub target_table: String,
    pub total_columns: usize,
    pub mapped_count: usize,
    pub unmapped_count: usize,
    pub average_confidence: f64,
}

/// One rendered line of the mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRow {
    pub target: String,
    pub source: String,
    pub confidence: String,
    pub transform: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewPayload {
    pub title: String,
    pub summary: ReviewSummary,
    pub risk: RiskAssessment,
    pub confidence: ConfidenceAnalysis,
    pub rows: Vec<ReviewRow>,
    pub explanations: Vec<String>,
}

impl ReviewPayload {
    pub fn build(
        set: &MappingSet,
        risk: RiskAssessment,
        confidence: ConfidenceAnalysis,
        explanations: Vec<String>,
    ) -> Self {
        let rows = set
            .mappings
            .iter()
            .map(|c| ReviewRow {
                target: c.target_column.clone(),
                source: c
                    .source_column
                    .clone()
                    .unwrap_or_else(|| "(unmapped)".to_string()),
                confidence: format_confidence(c.confidence),
                transform: c
                    .rendered_transform()
                    .unwrap_or_else(|| "direct".to_string()),
                status: c.status.as_str().to_string(),
            })
            .collect();
        Self {
            title: format!(
                "Approve column mappings: {} -> {}",
                set.source_table, set.target_table
            ),
            summary: ReviewSummary {
                source_table: set.source_table.clone(),
                target_table: set.target_table.clone(),
                total_columns: set.mappings.len(),
                mapped_count: set.stats.mapped_count,
                unmapped_count: set.stats.unmapped_count,
                average_confidence: set.stats.average_confidence,
            },
            risk,
            confidence,
            rows,
            explanations,
        }
    }

    /// Mapping rows as a pipe-delimited text table.
    pub fn render_table(&self) -> String {
        let mut out = String::from("| Target | Source | Confidence | Transform | Status |\n");
        out.push_str("|---|---|---|---|---|\n");
        for row in &self.rows {
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                row.target, row.source, row.confidence, row.transform, row.status
            ));
        }
        out
    }

    /// Plain-text hint sent alongside the request.
    pub fn hint(&self) -> String {
        format!(
            "{}\n\n{} of {} columns mapped, average confidence {}. Risk: {}.\n{}\n\n{}",
            self.title,
            self.summary.mapped_count,
            self.summary.total_columns,
            format_confidence(self.summary.average_confidence),
            self.risk.risk_level,
            self.confidence.recommendation.message(),
            self.render_table()
        )
    }
}

/// Whole-percent confidence, `N/A` for zero.
pub fn format_confidence(confidence: f64) -> String {
    if confidence > 0.0 {
        format!("{:.0}%", confidence * 100.0)
    } else {
        "N/A".to_string()
    }
}

#[cfg(test)]
mod tests {
    use colmap_guard::{ConfidenceThresholds, RiskContext, analyze_confidence, assess_risk};
    use colmap_model::{MappingCandidate, MappingStatus, RiskOperation, Transform};

    use super::*;

    fn sample_set() -> MappingSet {
        MappingSet::new(
            "loans_src",
            "loans",
            vec![
                MappingCandidate {
                    target_column: "amount".to_string(),
                    target_type: "NUMERIC".to_string(),
                    source_column: Some("amount".to_string()),
                    source_type: Some("FLOAT64".to_string()),
                    confidence: 0.85,
                    transformation: Some(Transform::cast("NUMERIC")),
                    status: MappingStatus::Suggested,
                    rule: None,
                },
                MappingCandidate::unmapped("status", "STRING"),
            ],
        )
    }

    #[test]
    fn renders_rows() {
        let set = sample_set();
        let payload = ReviewPayload::build(
            &set,
            assess_risk(
                RiskOperation::MappingApprove,
                &RiskContext::mapping(set.stats.average_confidence, 1),
            ),
            analyze_confidence(&set, &ConfidenceThresholds::default()),
            Vec::new(),
        );
        assert_eq!(payload.rows[0].confidence, "85%");
        assert_eq!(payload.rows[0].transform, "CAST(amount AS NUMERIC)");
        assert_eq!(payload.rows[1].source, "(unmapped)");
        assert_eq!(payload.rows[1].confidence, "N/A");
        assert_eq!(payload.rows[1].transform, "direct");
        assert!(
            payload
                .render_table()
                .contains("| status | (unmapped) | N/A | direct | unmapped |")
        );
        assert!(payload.hint().starts_with("Approve column mappings: loans_src -> loans"));
    }
}
