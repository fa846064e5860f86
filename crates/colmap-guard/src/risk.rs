use colmap_model::{RiskAssessment, RiskLevel, RiskOperation};

/// Average confidence below which the low-confidence factor applies.
pub const LOW_AVERAGE_CONFIDENCE: f64 = 0.75;

/// Observed conditions an assessment is derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RiskContext {
    pub average_confidence: Option<f64>,
    pub unmapped_count: usize,
    pub hallucinated_count: usize,
    /// `Some(false)` for a live execution.
    pub dry_run: Option<bool>,
}

impl RiskContext {
    pub fn mapping(average_confidence: f64, unmapped_count: usize) -> Self {
        Self {
            average_confidence: Some(average_confidence),
            unmapped_count,
            ..Self::default()
        }
    }

    pub fn execution(dry_run: bool) -> Self {
        Self {
            dry_run: Some(dry_run),
            ..Self::default()
        }
    }
}

/// Each observed condition raises the level by one band from LOW.
pub fn assess_risk(operation: RiskOperation, context: &RiskContext) -> RiskAssessment {
    let mut level = RiskLevel::Low;
    let mut risk_factors = Vec::new();
    let mut mitigations = Vec::new();

    if context.unmapped_count > 0 {
        level = level.raise();
        risk_factors.push(format!(
            "{} target column(s) have no source mapping and will be NULL-filled",
            context.unmapped_count
        ));
        mitigations.push("Review unmapped columns and supply defaults or manual mappings".to_string());
    }

    if let Some(average) = context.average_confidence
        && average < LOW_AVERAGE_CONFIDENCE
    {
        level = level.raise();
        risk_factors.push(format!(
            "average mapping confidence {:.0}% is below {:.0}%",
            average * 100.0,
            LOW_AVERAGE_CONFIDENCE * 100.0
        ));
        mitigations.push("Verify each suggested mapping before approval".to_string());
    }

    if context.hallucinated_count > 0 {
        level = level.raise();
        risk_factors.push(format!(
            "{} column reference(s) failed ground-truth validation",
            context.hallucinated_count
        ));
        mitigations.push("Re-run mapping inference against freshly loaded schemas".to_string());
    }

    if context.dry_run == Some(false) {
        level = level.raise();
        risk_factors.push("live execution modifies warehouse data".to_string());
        mitigations.push("Run a dry run first and confirm the bytes-processed estimate".to_string());
    }

    if matches!(operation, RiskOperation::SqlExecute | RiskOperation::SqlGenerate) {
        mitigations.push("Generated SQL passed the safety policy check".to_string());
    }

    let recommendation = match level {
        RiskLevel::Low => "Proceed.",
        RiskLevel::Medium => "Proceed after human review.",
        RiskLevel::High => "Proceed only with explicit human confirmation.",
    }
    .to_string();

    RiskAssessment {
        operation,
        risk_level: level,
        risk_factors,
        mitigations,
        recommendation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_mapping_is_low() {
        let assessment = assess_risk(RiskOperation::MappingSuggest, &RiskContext::mapping(0.95, 0));
        assert_eq!(assessment.risk_level, RiskLevel::Low);
        assert!(assessment.risk_factors.is_empty());
    }

    #[test]
    fn each_condition_raises_one_band() {
        let one = assess_risk(RiskOperation::MappingSuggest, &RiskContext::mapping(0.95, 1));
        assert_eq!(one.risk_level, RiskLevel::Medium);
        let two = assess_risk(RiskOperation::MappingSuggest, &RiskContext::mapping(0.60, 1));
        assert_eq!(two.risk_level, RiskLevel::High);
        assert_eq!(two.risk_factors.len(), 2);
    }

    #[test]
    fn live_execution_raises() {
        let dry = assess_risk(RiskOperation::SqlExecute, &RiskContext::execution(true));
        let live = assess_risk(RiskOperation::SqlExecute, &RiskContext::execution(false));
        assert_eq!(dry.risk_level, RiskLevel::Low);
        assert_eq!(live.risk_level, RiskLevel::Medium);
    }
}
