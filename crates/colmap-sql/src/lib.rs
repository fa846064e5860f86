//! SQL synthesis from approved mapping sets.
//!
//! Both artifacts select one expression per target column, in target order:
//! the rendered transform or bare source column for mapped columns,
//! `NULL` for unmapped ones. Column names are backtick-quoted.

#![deny(unsafe_code)]

use chrono::{DateTime, SecondsFormat, Utc};
use colmap_guard::{
    IdentifierKind, RiskContext, SqlPolicy, StatementKind, assess_risk, validate_identifier,
    validate_sql,
};
use colmap_model::{
    GeneratedSql, IntegrationError, MappingCandidate, MappingSet, RiskOperation,
    SqlValidationStatus, SqlValidationSummary,
};
use thiserror::Error;
use tracing::{debug, error};

/// Characters of a blocked statement kept for the audit trail.
pub const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("no target column has a source mapping")]
    NothingMapped,

    #[error("{0}")]
    Identifier(String),

    #[error("{statement} statement blocked: {message}")]
    Blocked {
        statement: StatementKind,
        message: String,
        preview: String,
    },
}

impl SynthesisError {
    pub fn into_integration_error(self, set: &MappingSet) -> IntegrationError {
        IntegrationError::SqlValidation {
            source_table: set.source_table.clone(),
            target_table: set.target_table.clone(),
            message: self.to_string(),
        }
    }
}

/// Where generated statements read from and write to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlSynthesizer {
    project_id: String,
    source_dataset: String,
    target_dataset: String,
}

impl SqlSynthesizer {
    pub fn new(
        project_id: impl Into<String>,
        source_dataset: impl Into<String>,
        target_dataset: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            source_dataset: source_dataset.into(),
            target_dataset: target_dataset.into(),
        }
    }

    pub fn source_ref(&self, table: &str) -> String {
        format!("{}.{}.{}", self.project_id, self.source_dataset, table)
    }

    pub fn target_ref(&self, table: &str) -> String {
        format!("{}.{}.{}", self.project_id, self.target_dataset, table)
    }

    /// Builds and checks the INSERT and MERGE statements for `set`.
    ///
    /// The MERGE matches on the first mapped target column. Both statements
    /// must pass [`validate_sql`]; the first failure is returned with a
    /// preview of the offending statement.
    pub fn synthesize(
        &self,
        set: &MappingSet,
        generated_at: DateTime<Utc>,
    ) -> Result<GeneratedSql, SynthesisError> {
        self.check_identifiers(set)?;
        let merge_key = set
            .mapped()
            .next()
            .map(|c| c.target_column.clone())
            .ok_or(SynthesisError::NothingMapped)?;

        let source = self.source_ref(&set.source_table);
        let target = self.target_ref(&set.target_table);
        let select_list: Vec<String> = set
            .mappings
            .iter()
            .map(|c| format!("{} AS {}", select_expression(c), quote(&c.target_column)))
            .collect();
        let columns: Vec<String> = set.mappings.iter().map(|c| quote(&c.target_column)).collect();

        let insert_sql = render_insert(set, &source, &target, &columns, &select_list, generated_at);
        let merge_sql = render_merge(set, &source, &target, &columns, &select_list, &merge_key);

        let mut warnings = check(
            &insert_sql,
            &SqlPolicy::new(StatementKind::Insert, &target).allow_source(&source),
        )?;
        for warning in check(
            &merge_sql,
            &SqlPolicy::new(StatementKind::Merge, &target)
                .allow_source(&source)
                .with_key_column(&merge_key),
        )? {
            if !warnings.contains(&warning) {
                warnings.push(warning);
            }
        }

        let risk_assessment = assess_risk(
            RiskOperation::SqlGenerate,
            &RiskContext::mapping(set.stats.average_confidence, set.stats.unmapped_count),
        );
        debug!(
            source = %source,
            target = %target,
            merge_key = %merge_key,
            warnings = warnings.len(),
            "sql synthesized"
        );

        Ok(GeneratedSql {
            source_table: set.source_table.clone(),
            target_table: set.target_table.clone(),
            insert_sql,
            merge_sql,
            merge_key,
            column_count: set.mappings.len(),
            mapped_count: set.stats.mapped_count,
            sql_validation: SqlValidationSummary {
                status: SqlValidationStatus::Passed,
                warnings,
            },
            risk_assessment,
            generated_at,
        })
    }

    fn check_identifiers(&self, set: &MappingSet) -> Result<(), SynthesisError> {
        let tables = [
            (IdentifierKind::Project, self.project_id.as_str()),
            (IdentifierKind::Dataset, self.source_dataset.as_str()),
            (IdentifierKind::Dataset, self.target_dataset.as_str()),
            (IdentifierKind::Table, set.source_table.as_str()),
            (IdentifierKind::Table, set.target_table.as_str()),
        ];
        let columns = set.mappings.iter().flat_map(|c| {
            std::iter::once(c.target_column.as_str())
                .chain(c.source_column.as_deref())
                .map(|name| (IdentifierKind::Column, name))
                .chain(std::iter::once((IdentifierKind::Type, c.target_type.as_str())))
        });
        for (kind, value) in tables.into_iter().chain(columns) {
            validate_identifier(kind, value)
                .map_err(|e| SynthesisError::Identifier(e.to_string()))?;
        }
        Ok(())
    }
}

fn check(sql: &str, policy: &SqlPolicy) -> Result<Vec<String>, SynthesisError> {
    validate_sql(sql, policy).into_result().map_err(|message| {
        error!(statement = %policy.expected, %message, "generated sql blocked");
        SynthesisError::Blocked {
            statement: policy.expected,
            message,
            preview: sql.chars().take(PREVIEW_CHARS).collect(),
        }
    })
}

fn quote(column: &str) -> String {
    format!("`{column}`")
}

fn select_expression(candidate: &MappingCandidate) -> String {
    let Some(source) = candidate.source_column.as_deref() else {
        return "NULL".to_string();
    };
    let source = quote(source);
    match &candidate.transformation {
        Some(transform) => transform.render(&source),
        None => source,
    }
}

fn render_insert(
    set: &MappingSet,
    source: &str,
    target: &str,
    columns: &[String],
    select_list: &[String],
    generated_at: DateTime<Utc>,
) -> String {
    format!(
        "-- Generated transformation: {} -> {}\n\
         -- Generated at: {}\n\
         -- Mapping confidence: {:.0}%\n\
         \n\
         INSERT INTO `{target}` ({})\n\
         SELECT\n\
         {}\n\
         FROM `{source}`;\n",
        set.source_table,
        set.target_table,
        generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        set.stats.average_confidence * 100.0,
        columns.join(", "),
        indent(select_list, "  ").join(",\n"),
    )
}

fn render_merge(
    set: &MappingSet,
    source: &str,
    target: &str,
    columns: &[String],
    select_list: &[String],
    merge_key: &str,
) -> String {
    let updates: Vec<String> = set
        .mapped()
        .filter(|c| c.target_column != merge_key)
        .map(|c| format!("{0} = source.{0}", quote(&c.target_column)))
        .collect();
    let matched = if updates.is_empty() {
        String::new()
    } else {
        format!("WHEN MATCHED THEN\n  UPDATE SET {}\n", updates.join(", "))
    };
    let key = quote(merge_key);
    let values: Vec<String> = columns.iter().map(|c| format!("source.{c}")).collect();
    format!(
        "-- MERGE transformation: {} -> {}\n\
         -- Use this for incremental updates\n\
         \n\
         MERGE `{target}` AS target\n\
         USING (\n\
         \x20 SELECT\n\
         {}\n\
         \x20 FROM `{source}`\n\
         ) AS source\n\
         ON target.{key} = source.{key}\n\
         {matched}\
         WHEN NOT MATCHED THEN\n\
         \x20 INSERT ({})\n\
         \x20 VALUES ({});\n",
        set.source_table,
        set.target_table,
        indent(select_list, "    ").join(",\n"),
        columns.join(", "),
        values.join(", "),
    )
}

fn indent(lines: &[String], prefix: &str) -> Vec<String> {
    lines.iter().map(|l| format!("{prefix}{l}")).collect()
}
