//! Guardrail validation passes.
//!
//! All checks are pure functions over already-computed data. Logging of
//! HIGH-risk findings to the audit trail is the caller's job.

#![deny(unsafe_code)]

mod confidence;
mod hallucination;
mod identifier;
mod risk;
mod sql;

pub use confidence::{
    ConfidenceAnalysis, ConfidenceBand, ConfidenceThresholds, Recommendation, analyze_confidence,
};
pub use hallucination::{MappingCheck, validate_mapping_output};
pub use identifier::{IdentifierKind, validate_identifier};
pub use risk::{LOW_AVERAGE_CONFIDENCE, RiskContext, assess_risk};
pub use sql::{SqlPolicy, SqlValidation, StatementKind, validate_sql};
