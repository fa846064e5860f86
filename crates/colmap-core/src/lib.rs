//! Session state, configuration and the governed mapping workflow.
//!
//! A [`Workflow`] runs the stages in order against one [`Session`]:
//! schema loading, mapping suggestion, human approval, SQL generation and
//! execution. Every stage records audit events and leaves the session
//! untouched when it fails.

#![deny(unsafe_code)]

pub mod config;
pub mod session;
pub mod workflow;

pub use config::{ApprovalSettings, AuditSettings, ConfigError, IntegrationConfig, ThresholdSettings};
pub use session::{ApprovedMapping, Session, SuggestedMapping};
pub use workflow::{ApprovalDecision, Workflow};
