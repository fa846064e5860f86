//! Session-scoped state.
//!
//! Everything here lives as long as the [`Session`] value. Writes replace
//! whole entries; a new suggestion for a pair drops that pair's approval and
//! generated SQL.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use colmap_approval::{ApprovalEvent, ApprovalState};
use colmap_guard::ConfidenceAnalysis;
use colmap_model::{GeneratedSql, MappingSet, RiskAssessment, SchemaRole, SchemaSnapshot, TablePair};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Output of the suggestion stage for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedMapping {
    pub set: MappingSet,
    pub explanations: Vec<String>,
    pub confidence: ConfidenceAnalysis,
    pub risk: RiskAssessment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedMapping {
    pub set: MappingSet,
    pub approved_at: DateTime<Utc>,
    /// Set once SQL has been generated from this approval.
    pub consumed: bool,
}

#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    source_schema: Option<SchemaSnapshot>,
    target_schema: Option<SchemaSnapshot>,
    suggested_mappings: BTreeMap<TablePair, SuggestedMapping>,
    approved_mappings: BTreeMap<TablePair, ApprovedMapping>,
    generated_sql: BTreeMap<TablePair, GeneratedSql>,
    approval_states: BTreeMap<TablePair, ApprovalState>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            source_schema: None,
            target_schema: None,
            suggested_mappings: BTreeMap::new(),
            approved_mappings: BTreeMap::new(),
            generated_sql: BTreeMap::new(),
            approval_states: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn schema(&self, role: SchemaRole) -> Option<&SchemaSnapshot> {
        match role {
            SchemaRole::Source => self.source_schema.as_ref(),
            SchemaRole::Target => self.target_schema.as_ref(),
        }
    }

    /// Replaces the snapshot cached for `role`.
    pub fn set_schema(&mut self, role: SchemaRole, snapshot: SchemaSnapshot) -> &SchemaSnapshot {
        let slot = match role {
            SchemaRole::Source => &mut self.source_schema,
            SchemaRole::Target => &mut self.target_schema,
        };
        slot.insert(snapshot)
    }

    pub fn suggestion(&self, pair: &TablePair) -> Option<&SuggestedMapping> {
        self.suggested_mappings.get(pair)
    }

    pub fn approved(&self, pair: &TablePair) -> Option<&ApprovedMapping> {
        self.approved_mappings.get(pair)
    }

    pub fn generated(&self, pair: &TablePair) -> Option<&GeneratedSql> {
        self.generated_sql.get(pair)
    }

    pub fn approval_state(&self, pair: &TablePair) -> ApprovalState {
        self.approval_states.get(pair).copied().unwrap_or_default()
    }

    pub fn pairs(&self) -> impl Iterator<Item = &TablePair> {
        self.suggested_mappings.keys()
    }

    pub(crate) fn store_suggestion(
        &mut self,
        pair: TablePair,
        suggestion: SuggestedMapping,
    ) -> &SuggestedMapping {
        self.approved_mappings.remove(&pair);
        self.generated_sql.remove(&pair);
        let state = self.approval_state(&pair);
        // Suggest is valid from every state.
        self.approval_states.insert(
            pair.clone(),
            state
                .transition(ApprovalEvent::Suggest)
                .unwrap_or(ApprovalState::Suggested),
        );
        self.suggested_mappings.insert(pair.clone(), suggestion);
        &self.suggested_mappings[&pair]
    }

    pub(crate) fn set_approval_state(&mut self, pair: &TablePair, state: ApprovalState) {
        self.approval_states.insert(pair.clone(), state);
    }

    pub(crate) fn store_approval(&mut self, pair: &TablePair, set: MappingSet) {
        self.approved_mappings.insert(
            pair.clone(),
            ApprovedMapping {
                set,
                approved_at: Utc::now(),
                consumed: false,
            },
        );
    }

    /// Drops the approval and any SQL generated from it.
    pub(crate) fn revoke_approval(&mut self, pair: &TablePair) {
        self.approved_mappings.remove(pair);
        self.generated_sql.remove(pair);
    }

    /// Stores SQL and marks the approval it came from as used.
    pub(crate) fn store_generated(&mut self, pair: &TablePair, sql: GeneratedSql) -> &GeneratedSql {
        if let Some(approved) = self.approved_mappings.get_mut(pair) {
            approved.consumed = true;
        }
        self.generated_sql.insert(pair.clone(), sql);
        &self.generated_sql[pair]
    }
}

#[cfg(test)]
mod tests {
    use colmap_guard::{ConfidenceThresholds, RiskContext, analyze_confidence, assess_risk};
    use colmap_model::RiskOperation;

    use super::*;

    fn suggestion(pair: &TablePair) -> SuggestedMapping {
        let set = MappingSet::new(&pair.source_table, &pair.target_table, Vec::new());
        SuggestedMapping {
            confidence: analyze_confidence(&set, &ConfidenceThresholds::default()),
            risk: assess_risk(RiskOperation::MappingSuggest, &RiskContext::mapping(0.0, 0)),
            explanations: Vec::new(),
            set,
        }
    }

    #[test]
    fn schema_slots_are_per_role() {
        let mut session = Session::new();
        session.set_schema(SchemaRole::Source, SchemaSnapshot::new("p", "src", Vec::new()));
        assert!(session.schema(SchemaRole::Source).is_some());
        assert!(session.schema(SchemaRole::Target).is_none());
        session.set_schema(SchemaRole::Source, SchemaSnapshot::new("p", "src2", Vec::new()));
        assert_eq!(
            session.schema(SchemaRole::Source).map(|s| s.dataset_id.as_str()),
            Some("src2")
        );
    }

    #[test]
    fn new_suggestion_invalidates_approval() {
        let pair = TablePair::new("a", "b");
        let mut session = Session::new();
        session.store_suggestion(pair.clone(), suggestion(&pair));
        session.store_approval(&pair, MappingSet::new("a", "b", Vec::new()));
        session.set_approval_state(&pair, ApprovalState::Approved);

        session.store_suggestion(pair.clone(), suggestion(&pair));
        assert!(session.approved(&pair).is_none());
        assert_eq!(session.approval_state(&pair), ApprovalState::Suggested);
    }

    #[test]
    fn unknown_pair_has_no_suggestion_state() {
        let session = Session::new();
        assert_eq!(
            session.approval_state(&TablePair::new("x", "y")),
            ApprovalState::NoSuggestion
        );
    }
}
