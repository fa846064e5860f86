//! Mapping engine implementation.

use colmap_model::{
    MappingCandidate, MappingSet, MappingStatus, TableSchema, Transform, round_confidence,
};
use tracing::debug;

use crate::matcher::MatcherCascade;

/// Subtracted when declared types differ and a `CAST` is attached.
pub const CAST_PENALTY: f64 = 0.1;

/// Engine producing one [`MappingCandidate`] per target column.
#[derive(Debug, Default)]
pub struct MappingEngine {
    cascade: MatcherCascade,
}

impl MappingEngine {
    pub fn new(cascade: MatcherCascade) -> Self {
        Self { cascade }
    }

    /// Suggests a mapping for every target column, in target order.
    ///
    /// For each target, every source column is scored by the cascade, the
    /// cast penalty is applied, and the highest score wins. Ties keep the
    /// first source column in ordinal order.
    pub fn infer(&self, source: &TableSchema, target: &TableSchema) -> MappingSet {
        let mappings: Vec<MappingCandidate> = target
            .columns
            .iter()
            .map(|target_col| {
                let mut best: Option<MappingCandidate> = None;
                for source_col in &source.columns {
                    let Some(outcome) = self.cascade.evaluate(&source_col.name, &target_col.name)
                    else {
                        continue;
                    };
                    let types_differ = !source_col
                        .declared_type
                        .eq_ignore_ascii_case(&target_col.declared_type);
                    let (confidence, transformation) = if types_differ {
                        (
                            (outcome.confidence - CAST_PENALTY).max(0.0),
                            Some(Transform::cast(&target_col.declared_type)),
                        )
                    } else {
                        (outcome.confidence, None)
                    };
                    let confidence = round_confidence(confidence);
                    if best.as_ref().is_none_or(|b| confidence > b.confidence) {
                        best = Some(MappingCandidate {
                            target_column: target_col.name.clone(),
                            target_type: target_col.declared_type.clone(),
                            source_column: Some(source_col.name.clone()),
                            source_type: Some(source_col.declared_type.clone()),
                            confidence,
                            transformation,
                            status: MappingStatus::Suggested,
                            rule: Some(outcome.rule),
                        });
                    }
                }
                best.unwrap_or_else(|| {
                    MappingCandidate::unmapped(&target_col.name, &target_col.declared_type)
                })
            })
            .collect();

        let set = MappingSet::new(&source.table_name, &target.table_name, mappings);
        debug!(
            source = %source.table_name,
            target = %target.table_name,
            mapped = set.stats.mapped_count,
            unmapped = set.stats.unmapped_count,
            average = set.stats.average_confidence,
            "mapping inferred"
        );
        set
    }

    /// Human-readable explanation of one candidate.
    pub fn explain(&self, candidate: &MappingCandidate) -> String {
        let (Some(source), Some(rule)) = (&candidate.source_column, candidate.rule) else {
            return format!(
                "{}: no source column matched; will be NULL-filled",
                candidate.target_column
            );
        };
        let base = self
            .cascade
            .confidence_of(rule)
            .unwrap_or(candidate.confidence);
        let mut parts = vec![format!("{}: {:.0}%", rule.description(), base * 100.0)];
        if let Some(transform) = candidate.rendered_transform() {
            parts.push(format!(
                "type cast {} -> {}: -{:.0}% ({transform})",
                candidate.source_type.as_deref().unwrap_or("?"),
                candidate.target_type,
                CAST_PENALTY * 100.0
            ));
        }
        format!(
            "{} <- {} ({:.0}%): {}",
            candidate.target_column,
            source,
            candidate.confidence * 100.0,
            parts.join("; ")
        )
    }

    pub fn explain_all(&self, set: &MappingSet) -> Vec<String> {
        set.mappings.iter().map(|c| self.explain(c)).collect()
    }
}
