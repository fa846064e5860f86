use std::collections::BTreeSet;

use colmap_model::{MappingSet, ValidationAnnotation};

/// Outcome of checking a mapping set against the ground-truth column sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingCheck {
    pub is_valid: bool,
    pub error_message: Option<String>,
    /// Offending column names, first-seen order, no duplicates.
    pub hallucinated: Vec<String>,
}

impl MappingCheck {
    pub fn annotation(&self) -> Option<ValidationAnnotation> {
        self.error_message
            .as_ref()
            .map(|message| ValidationAnnotation {
                validation_error: message.clone(),
                hallucinated_columns: self.hallucinated.clone(),
            })
    }
}

/// Verifies every referenced column exists in the supplied column sets.
pub fn validate_mapping_output(
    mapping_set: &MappingSet,
    source_columns: &BTreeSet<String>,
    target_columns: &BTreeSet<String>,
) -> MappingCheck {
    let mut hallucinated: Vec<String> = Vec::new();
    let mut problems: Vec<String> = Vec::new();
    let mut push = |column: &str, problem: String| {
        if !hallucinated.iter().any(|c| c == column) {
            hallucinated.push(column.to_string());
            problems.push(problem);
        }
    };

    for candidate in &mapping_set.mappings {
        if !target_columns.contains(&candidate.target_column) {
            push(
                &candidate.target_column,
                format!(
                    "target column '{}' does not exist in {}",
                    candidate.target_column, mapping_set.target_table
                ),
            );
        }
        if let Some(source) = &candidate.source_column
            && !source_columns.contains(source)
        {
            push(
                source,
                format!(
                    "source column '{}' does not exist in {}",
                    source, mapping_set.source_table
                ),
            );
        }
    }

    if hallucinated.is_empty() {
        MappingCheck {
            is_valid: true,
            error_message: None,
            hallucinated,
        }
    } else {
        MappingCheck {
            is_valid: false,
            error_message: Some(format!(
                "mapping references non-existent columns: {}",
                problems.join("; ")
            )),
            hallucinated,
        }
    }
}

#[cfg(test)]
mod tests {
    use colmap_model::{MappingCandidate, MappingStatus};

    use super::*;

    fn set_with(target: &str, source: &str) -> MappingSet {
        MappingSet::new(
            "src",
            "tgt",
            vec![MappingCandidate {
                target_column: target.to_string(),
                target_type: "STRING".to_string(),
                source_column: Some(source.to_string()),
                source_type: Some("STRING".to_string()),
                confidence: 0.95,
                transformation: None,
                status: MappingStatus::Suggested,
                rule: None,
            }],
        )
    }

    fn names(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn valid_mapping_passes() {
        let check = validate_mapping_output(&set_with("a", "a"), &names(&["a"]), &names(&["a"]));
        assert!(check.is_valid);
        assert!(check.annotation().is_none());
    }

    #[test]
    fn reports_both_sides() {
        let check =
            validate_mapping_output(&set_with("ghost_t", "ghost_s"), &names(&["a"]), &names(&["a"]));
        assert!(!check.is_valid);
        assert_eq!(check.hallucinated, vec!["ghost_t", "ghost_s"]);
        let message = check.error_message.unwrap();
        assert!(message.contains("'ghost_s'"));
        assert!(message.contains("'ghost_t'"));
    }
}
