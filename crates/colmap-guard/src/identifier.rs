use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use colmap_model::IntegrationError;

static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]{0,1023}$").expect("name pattern is valid")
});

static COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,299}$").expect("column pattern is valid")
});

/// `STRING`, `NUMERIC(10, 2)`, `ARRAY<INT64>`, `STRUCT<a INT64, b STRING>`.
static TYPE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(<[A-Za-z0-9_<>, ]+>)?(\([0-9]+(, ?[0-9]+)?\))?$")
        .expect("type pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Project,
    Dataset,
    Table,
    Column,
    /// Declared column type, pasted into `CAST(... AS <type>)`.
    Type,
}

impl IdentifierKind {
    fn pattern(self) -> &'static Regex {
        match self {
            Self::Project | Self::Dataset | Self::Table => &NAME,
            Self::Column => &COLUMN,
            Self::Type => &TYPE_NAME,
        }
    }

    fn rule(self) -> &'static str {
        match self {
            Self::Project | Self::Dataset | Self::Table => {
                "only letters, digits, '_' and '-' are allowed and it must not start with a digit"
            }
            Self::Column => {
                "only letters, digits and '_' are allowed and it must not start with a digit"
            }
            Self::Type => "expected a type name such as STRING, NUMERIC(10, 2) or ARRAY<INT64>",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Project => "project",
            Self::Dataset => "dataset",
            Self::Table => "table",
            Self::Column => "column",
            Self::Type => "type",
        })
    }
}

/// Rejects names that could break out of the SQL they are rendered into.
pub fn validate_identifier(kind: IdentifierKind, value: &str) -> Result<(), IntegrationError> {
    if kind.pattern().is_match(value) {
        return Ok(());
    }
    let reason = if value.is_empty() {
        "must not be empty".to_string()
    } else {
        kind.rule().to_string()
    };
    Err(IntegrationError::InvalidIdentifier {
        kind: kind.to_string(),
        value: value.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_names() {
        assert!(validate_identifier(IdentifierKind::Dataset, "commercial_lending_source").is_ok());
        assert!(validate_identifier(IdentifierKind::Project, "my-project-01").is_ok());
        assert!(validate_identifier(IdentifierKind::Column, "_loaded_at").is_ok());
    }

    #[test]
    fn rejects_injection_attempts() {
        for bad in ["", "1table", "a`; DROP TABLE x; --", "a.b", "a b"] {
            assert!(
                validate_identifier(IdentifierKind::Table, bad).is_err(),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn columns_do_not_allow_dashes() {
        assert!(validate_identifier(IdentifierKind::Table, "a-b").is_ok());
        let err = validate_identifier(IdentifierKind::Column, "a-b").unwrap_err();
        assert!(err.to_string().contains("a-b"));
    }

    #[test]
    fn type_names_follow_the_warehouse_grammar() {
        for good in [
            "STRING",
            "INT64",
            "NUMERIC(10, 2)",
            "BIGNUMERIC(38)",
            "ARRAY<INT64>",
            "STRUCT<a INT64, b ARRAY<STRING>>",
        ] {
            assert!(
                validate_identifier(IdentifierKind::Type, good).is_ok(),
                "{good:?} should be accepted"
            );
        }
        for bad in [
            "",
            "STRING) AS a, (SELECT ssn FROM secret_pii",
            "INT64)",
            "STRING; DROP",
            "NUMERIC(x)",
            "`t`",
        ] {
            assert!(
                validate_identifier(IdentifierKind::Type, bad).is_err(),
                "{bad:?} should be rejected"
            );
        }
    }
}
