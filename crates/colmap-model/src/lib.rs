pub mod audit;
pub mod error;
pub mod mapping;
pub mod risk;
pub mod schema;
pub mod sql;

pub use audit::{AuditCategory, AuditEvent, AuditEventType};
pub use error::{IntegrationError, Result};
pub use mapping::{
    MappingCandidate, MappingSet, MappingStats, MappingStatus, MatchRule, TablePair, Transform,
    ValidationAnnotation, round_confidence,
};
pub use risk::{RiskAssessment, RiskLevel, RiskOperation};
pub use schema::{ColumnSchema, SchemaRole, SchemaSnapshot, TableSchema};
pub use sql::{GeneratedSql, SqlValidationStatus, SqlValidationSummary};
