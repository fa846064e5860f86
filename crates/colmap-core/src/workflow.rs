//! The governed mapping workflow.
//!
//! Stages read from the warehouse first and write to the session last, so a
//! failed stage leaves the session as it was. HIGH-risk outcomes reach the
//! audit log before the error is returned.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use colmap_approval::{
    ApprovalError, ApprovalEvent, ApprovalState, RejectReason, ReviewChannel, ReviewOutcome,
    ReviewPayload, ReviewRequest,
};
use colmap_audit::AuditLog;
use colmap_exec::{ExecutionGateway, ExecutionOutcome, ExecutionReport, SqlVariant};
use colmap_guard::{RiskContext, analyze_confidence, assess_risk, validate_mapping_output};
use colmap_ingest::build_snapshot;
use colmap_map::MappingEngine;
use colmap_model::{
    AuditCategory, AuditEvent, AuditEventType, GeneratedSql, IntegrationError, Result, RiskLevel,
    RiskOperation, SchemaRole, SchemaSnapshot, TablePair,
};
use colmap_sql::{SqlSynthesizer, SynthesisError};
use colmap_warehouse::Warehouse;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::config::IntegrationConfig;
use crate::session::{Session, SuggestedMapping};

/// Result of one approval round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalDecision {
    pub correlation_id: Uuid,
    pub outcome: ReviewOutcome,
    pub state: ApprovalState,
}

impl ApprovalDecision {
    pub fn is_approved(&self) -> bool {
        self.outcome.is_approved()
    }
}

pub struct Workflow<'w> {
    warehouse: &'w dyn Warehouse,
    config: IntegrationConfig,
    project_id: String,
    audit: AuditLog,
    engine: MappingEngine,
}

impl fmt::Debug for Workflow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("project_id", &self.project_id)
            .field("source_dataset", &self.config.source_dataset)
            .field("target_dataset", &self.config.target_dataset)
            .finish_non_exhaustive()
    }
}

impl<'w> Workflow<'w> {
    /// An empty `project_id` in `config` falls back to the warehouse's.
    pub fn new(warehouse: &'w dyn Warehouse, config: IntegrationConfig, audit: AuditLog) -> Self {
        let project_id = if config.project_id.is_empty() {
            warehouse.project_id().to_string()
        } else {
            config.project_id.clone()
        };
        Self {
            warehouse,
            config,
            project_id,
            audit,
            engine: MappingEngine::default(),
        }
    }

    #[must_use]
    pub fn with_engine(mut self, engine: MappingEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn engine(&self) -> &MappingEngine {
        &self.engine
    }

    pub fn dataset(&self, role: SchemaRole) -> &str {
        match role {
            SchemaRole::Source => &self.config.source_dataset,
            SchemaRole::Target => &self.config.target_dataset,
        }
    }

    /// Fetches the configured dataset for `role` and caches its snapshot.
    pub fn load_schema<'s>(
        &mut self,
        session: &'s mut Session,
        role: SchemaRole,
    ) -> Result<&'s SchemaSnapshot> {
        let dataset = self.dataset(role).to_string();
        let span = info_span!("load_schema", %role, dataset = %dataset);
        let _guard = span.enter();

        let snapshot = match build_snapshot(self.warehouse, &dataset) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "schema fetch failed");
                self.audit.record(
                    AuditEvent::new(
                        AuditCategory::Schema,
                        AuditEventType::SchemaFetchFailed,
                        RiskLevel::Medium,
                    )
                    .with("role", role.as_str())
                    .with("dataset_id", dataset.as_str())
                    .with("error", e.to_string()),
                )?;
                return Err(e);
            }
        };

        self.audit.record(
            AuditEvent::new(
                AuditCategory::Schema,
                AuditEventType::SchemaLoaded,
                RiskLevel::Low,
            )
            .with("role", role.as_str())
            .with("dataset_id", dataset.as_str())
            .with("table_count", snapshot.table_count()),
        )?;
        info!(tables = snapshot.table_count(), "schema loaded");
        Ok(session.set_schema(role, snapshot))
    }

    pub fn load_schemas(&mut self, session: &mut Session) -> Result<()> {
        self.load_schema(session, SchemaRole::Source)?;
        self.load_schema(session, SchemaRole::Target)?;
        Ok(())
    }

    /// Infers mappings for one pair from the cached schemas.
    ///
    /// Replaces any earlier suggestion for the pair and drops its approval
    /// and generated SQL.
    pub fn suggest<'s>(
        &mut self,
        session: &'s mut Session,
        pair: &TablePair,
    ) -> Result<&'s SuggestedMapping> {
        let span = info_span!("suggest", %pair);
        let _guard = span.enter();

        let missing: Vec<SchemaRole> = [SchemaRole::Source, SchemaRole::Target]
            .into_iter()
            .filter(|role| session.schema(*role).is_none())
            .collect();
        let (Some(source_schema), Some(target_schema)) = (
            session.schema(SchemaRole::Source),
            session.schema(SchemaRole::Target),
        ) else {
            return Err(IntegrationError::SchemaNotLoaded { missing });
        };
        let source = source_schema.table(&pair.source_table).ok_or_else(|| {
            IntegrationError::TableNotFound {
                role: SchemaRole::Source,
                table: pair.source_table.clone(),
            }
        })?;
        let target = target_schema.table(&pair.target_table).ok_or_else(|| {
            IntegrationError::TableNotFound {
                role: SchemaRole::Target,
                table: pair.target_table.clone(),
            }
        })?;

        let mut set = self.engine.infer(source, target);
        let check = validate_mapping_output(&set, &source.column_names(), &target.column_names());
        if !check.is_valid {
            warn!(hallucinated = ?check.hallucinated, "mapping references unknown columns");
            set.validation = check.annotation();
            self.audit.record(
                AuditEvent::new(
                    AuditCategory::Mapping,
                    AuditEventType::HallucinationPrevented,
                    RiskLevel::High,
                )
                .with("source_table", pair.source_table.as_str())
                .with("target_table", pair.target_table.as_str())
                .with("hallucinated", check.hallucinated.clone()),
            )?;
        }

        let explanations = self.engine.explain_all(&set);
        let confidence = analyze_confidence(&set, &self.config.confidence_thresholds());
        let risk = assess_risk(
            RiskOperation::MappingSuggest,
            &RiskContext {
                hallucinated_count: check.hallucinated.len(),
                ..RiskContext::mapping(set.stats.average_confidence, set.stats.unmapped_count)
            },
        );

        self.audit.record(
            AuditEvent::new(
                AuditCategory::Mapping,
                AuditEventType::MappingsSuggested,
                risk.risk_level,
            )
            .with("source_table", pair.source_table.as_str())
            .with("target_table", pair.target_table.as_str())
            .with("mapping_count", set.stats.mapped_count)
            .with("avg_confidence", set.stats.average_confidence)
            .with("recommendation", confidence.recommendation.message()),
        )?;
        info!(
            mapped = set.stats.mapped_count,
            unmapped = set.stats.unmapped_count,
            average = set.stats.average_confidence,
            risk = %risk.risk_level,
            "mappings suggested"
        );

        Ok(session.store_suggestion(
            pair.clone(),
            SuggestedMapping {
                set,
                explanations,
                confidence,
                risk,
            },
        ))
    }

    /// Submits the pair's suggestion for review and blocks for the decision.
    ///
    /// `timeout` defaults to the configured approval timeout. Timing out or
    /// losing the reviewer counts as rejection.
    pub fn request_approval(
        &mut self,
        session: &mut Session,
        pair: &TablePair,
        channel: &dyn ReviewChannel,
        timeout: Option<Duration>,
    ) -> Result<ApprovalDecision> {
        let span = info_span!("request_approval", %pair);
        let _guard = span.enter();

        let no_suggestion = || IntegrationError::NoSuggestion {
            source_table: pair.source_table.clone(),
            target_table: pair.target_table.clone(),
        };
        let transition = |state: ApprovalState, event| {
            state.transition(event).map_err(|e| match e {
                ApprovalError::NoSuggestion => no_suggestion(),
                other => IntegrationError::NotApproved {
                    source_table: pair.source_table.clone(),
                    target_table: pair.target_table.clone(),
                    reason: other.to_string(),
                },
            })
        };

        let suggestion = session.suggestion(pair).ok_or_else(no_suggestion)?;
        let awaiting = transition(session.approval_state(pair), ApprovalEvent::RequestApproval)?;

        let set = suggestion.set.clone();
        let payload = ReviewPayload::build(
            &set,
            assess_risk(
                RiskOperation::MappingApprove,
                &RiskContext::mapping(set.stats.average_confidence, set.stats.unmapped_count),
            ),
            suggestion.confidence.clone(),
            suggestion.explanations.clone(),
        );
        let request = ReviewRequest::new(payload);
        let correlation_id = request.correlation_id;
        session.set_approval_state(pair, awaiting);
        info!(%correlation_id, "review requested");

        let timeout = timeout.unwrap_or_else(|| self.config.approval_timeout());
        let outcome = match channel.submit(request) {
            Ok(pending) => pending.wait(Some(timeout)),
            Err(e) => {
                warn!(error = %e, "review could not be submitted");
                ReviewOutcome::Rejected {
                    reason: RejectReason::ReviewerGone,
                    note: Some(e.to_string()),
                }
            }
        };

        let event_type = if outcome.is_approved() {
            AuditEventType::MappingsApproved
        } else {
            AuditEventType::MappingsRejected
        };

        let mut audit_event = AuditEvent::new(AuditCategory::Mapping, event_type, RiskLevel::Low)
            .with("source_table", pair.source_table.as_str())
            .with("target_table", pair.target_table.as_str())
            .with("correlation_id", correlation_id.to_string());
        match &outcome {
            ReviewOutcome::Approved { note } => {
                audit_event = audit_event
                    .with("mapping_count", set.stats.mapped_count)
                    .with("avg_confidence", set.stats.average_confidence);
                if let Some(note) = note {
                    audit_event = audit_event.with("note", note.as_str());
                }
            }
            ReviewOutcome::Rejected { reason, note } => {
                audit_event = audit_event.with("reason", reason.as_str());
                if let Some(note) = note {
                    audit_event = audit_event.with("note", note.as_str());
                }
            }
        }
        let recorded = self.audit.record(audit_event);

        // An approval that could not be audited does not count.
        let approved = outcome.is_approved() && recorded.is_ok();
        let event = if approved {
            ApprovalEvent::Approve
        } else {
            ApprovalEvent::Reject
        };
        let state = transition(awaiting, event)?;
        if approved {
            session.store_approval(pair, set);
        } else {
            session.revoke_approval(pair);
        }
        session.set_approval_state(pair, state);
        recorded?;
        info!(%state, "review finished");

        Ok(ApprovalDecision {
            correlation_id,
            outcome,
            state,
        })
    }

    /// Builds INSERT and MERGE statements from the pair's approved mappings.
    ///
    /// Each approval yields one generation; regenerating needs a fresh
    /// approval.
    pub fn generate_sql<'s>(
        &mut self,
        session: &'s mut Session,
        pair: &TablePair,
    ) -> Result<&'s GeneratedSql> {
        let span = info_span!("generate_sql", %pair);
        let _guard = span.enter();

        let not_approved = |reason: &str| IntegrationError::NotApproved {
            source_table: pair.source_table.clone(),
            target_table: pair.target_table.clone(),
            reason: reason.to_string(),
        };
        let approved = session
            .approved(pair)
            .ok_or_else(|| not_approved("request approval first"))?;
        if approved.consumed {
            return Err(not_approved(
                "approval already used to generate SQL; request approval again",
            ));
        }

        let synthesizer = SqlSynthesizer::new(
            &self.project_id,
            &self.config.source_dataset,
            &self.config.target_dataset,
        );
        let sql = match synthesizer.synthesize(&approved.set, Utc::now()) {
            Ok(sql) => sql,
            Err(e) => {
                error!(error = %e, "generated SQL blocked");
                let preview = match &e {
                    SynthesisError::Blocked { preview, .. } => preview.clone(),
                    SynthesisError::NothingMapped | SynthesisError::Identifier(_) => String::new(),
                };
                self.audit.record(
                    AuditEvent::new(
                        AuditCategory::SqlGeneration,
                        AuditEventType::InvalidSqlBlocked,
                        RiskLevel::High,
                    )
                    .with("source_table", pair.source_table.as_str())
                    .with("target_table", pair.target_table.as_str())
                    .with("error", e.to_string())
                    .with("sql_preview", preview),
                )?;
                return Err(e.into_integration_error(&approved.set));
            }
        };

        self.audit.record(
            AuditEvent::new(
                AuditCategory::SqlGeneration,
                AuditEventType::SqlGenerated,
                RiskLevel::Medium,
            )
            .with("source_table", pair.source_table.as_str())
            .with("target_table", pair.target_table.as_str())
            .with("column_count", sql.column_count)
            .with("mapped_count", sql.mapped_count)
            .with("merge_key", sql.merge_key.as_str())
            .with("warnings", sql.sql_validation.warnings.clone()),
        )?;
        info!(
            columns = sql.column_count,
            mapped = sql.mapped_count,
            warnings = sql.sql_validation.warnings.len(),
            "SQL generated"
        );
        Ok(session.store_generated(pair, sql))
    }

    /// Runs the pair's generated statement. Dry runs validate and estimate
    /// cost only.
    pub fn execute(
        &mut self,
        session: &Session,
        pair: &TablePair,
        variant: SqlVariant,
        dry_run: bool,
    ) -> Result<ExecutionReport> {
        let sql = session
            .generated(pair)
            .ok_or_else(|| IntegrationError::NoSqlGenerated {
                source_table: pair.source_table.clone(),
                target_table: pair.target_table.clone(),
            })?;

        let report = match ExecutionGateway::new(self.warehouse).execute(sql, variant, dry_run) {
            Ok(report) => report,
            Err(e) => {
                self.audit.record(
                    AuditEvent::new(
                        AuditCategory::SqlExecution,
                        AuditEventType::SqlError,
                        RiskLevel::High,
                    )
                    .with("source_table", pair.source_table.as_str())
                    .with("target_table", pair.target_table.as_str())
                    .with("variant", variant.to_string())
                    .with("dry_run", dry_run)
                    .with("error", e.to_string()),
                )?;
                return Err(e);
            }
        };

        let event = match &report.outcome {
            ExecutionOutcome::Validated { bytes_processed } => AuditEvent::new(
                AuditCategory::SqlExecution,
                AuditEventType::SqlValidated,
                RiskLevel::Low,
            )
            .with("bytes_processed", *bytes_processed),
            ExecutionOutcome::Executed {
                job_id,
                rows_affected,
                bytes_processed,
            } => AuditEvent::new(
                AuditCategory::SqlExecution,
                AuditEventType::SqlExecuted,
                RiskLevel::High,
            )
            .with("job_id", job_id.as_str())
            .with("rows_affected", *rows_affected)
            .with("bytes_processed", *bytes_processed),
        };
        self.audit.record(
            event
                .with("source_table", pair.source_table.as_str())
                .with("target_table", pair.target_table.as_str())
                .with("variant", variant.to_string()),
        )?;
        Ok(report)
    }
}
