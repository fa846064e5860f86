//! Audit event records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::risk::RiskLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditCategory {
    Schema,
    Mapping,
    SqlGeneration,
    SqlExecution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    SchemaLoaded,
    SchemaFetchFailed,
    MappingsSuggested,
    HallucinationPrevented,
    MappingsApproved,
    MappingsRejected,
    SqlGenerated,
    InvalidSqlBlocked,
    SqlValidated,
    SqlExecuted,
    SqlError,
}

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub category: AuditCategory,
    pub event_type: AuditEventType,
    pub payload: Map<String, Value>,
    pub risk_level: RiskLevel,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(category: AuditCategory, event_type: AuditEventType, risk_level: RiskLevel) -> Self {
        Self {
            category,
            event_type,
            payload: Map::new(),
            risk_level,
            timestamp: Utc::now(),
        }
    }

    /// Adds a payload field.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_wire_names() {
        let event = AuditEvent::new(
            AuditCategory::SqlGeneration,
            AuditEventType::InvalidSqlBlocked,
            RiskLevel::High,
        )
        .with("error", "stacked statements");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["category"], "SQL_GENERATION");
        assert_eq!(json["event_type"], "INVALID_SQL_BLOCKED");
        assert_eq!(json["risk_level"], "HIGH");
        assert_eq!(json["payload"]["error"], "stacked statements");
    }
}
