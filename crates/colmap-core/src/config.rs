//! Integration configuration.
//!
//! Loaded from TOML, then overridden from the environment:
//!
//! | Variable | Field |
//! |---|---|
//! | `BQ_PROJECT_ID` (fallback `GOOGLE_CLOUD_PROJECT`) | `project_id` |
//! | `BQ_DATASET_SOURCE` | `source_dataset` |
//! | `BQ_DATASET_TARGET` | `target_dataset` |

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use colmap_guard::{ConfidenceThresholds, IdentifierKind, validate_identifier};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "colmap";
const APP_NAME: &str = "colmap";
const CONFIG_FILENAME: &str = "colmap.toml";
const AUDIT_FILENAME: &str = "audit.jsonl";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    /// Empty means "use the warehouse client's project".
    pub project_id: String,
    pub source_dataset: String,
    pub target_dataset: String,
    pub thresholds: ThresholdSettings,
    pub approval: ApprovalSettings,
    pub audit: AuditSettings,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            source_dataset: "commercial_lending_source".to_string(),
            target_dataset: "commercial_lending_target".to_string(),
            thresholds: ThresholdSettings::default(),
            approval: ApprovalSettings::default(),
            audit: AuditSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdSettings {
    pub high: f64,
    pub medium: f64,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        let defaults = ConfidenceThresholds::default();
        Self {
            high: defaults.high,
            medium: defaults.medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalSettings {
    pub timeout_secs: u64,
}

impl Default for ApprovalSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 15 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    /// JSON lines file; defaults to the platform data directory.
    pub path: Option<PathBuf>,
}

/// Platform config file location, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

fn default_audit_path() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.data_dir().join(AUDIT_FILENAME))
}

impl IntegrationConfig {
    /// Reads `path`, or the platform config file when `path` is `None`.
    ///
    /// An explicit path must exist; a missing platform file yields
    /// defaults. Environment overrides are applied and the result is
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                Some(path) => {
                    tracing::debug!(path = %path.display(), "no config file, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Applies overrides from `lookup`; empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(project) = get("BQ_PROJECT_ID").or_else(|| get("GOOGLE_CLOUD_PROJECT")) {
            self.project_id = project;
        }
        if let Some(dataset) = get("BQ_DATASET_SOURCE") {
            self.source_dataset = dataset;
        }
        if let Some(dataset) = get("BQ_DATASET_TARGET") {
            self.target_dataset = dataset;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |e: colmap_model::IntegrationError| ConfigError::Invalid(e.to_string());
        if !self.project_id.is_empty() {
            validate_identifier(IdentifierKind::Project, &self.project_id).map_err(invalid)?;
        }
        validate_identifier(IdentifierKind::Dataset, &self.source_dataset).map_err(invalid)?;
        validate_identifier(IdentifierKind::Dataset, &self.target_dataset).map_err(invalid)?;

        let ThresholdSettings { high, medium } = self.thresholds;
        if !(0.0..=1.0).contains(&medium) || !(0.0..=1.0).contains(&high) || medium > high {
            return Err(ConfigError::Invalid(format!(
                "thresholds must satisfy 0 <= medium <= high <= 1 (medium {medium}, high {high})"
            )));
        }
        if self.approval.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "approval.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn confidence_thresholds(&self) -> ConfidenceThresholds {
        ConfidenceThresholds {
            high: self.thresholds.high,
            medium: self.thresholds.medium,
        }
    }

    pub fn approval_timeout(&self) -> Duration {
        Duration::from_secs(self.approval.timeout_secs)
    }

    /// Configured audit file, else the platform default.
    pub fn audit_path(&self) -> Option<PathBuf> {
        self.audit.path.clone().or_else(default_audit_path)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_follow_lending_datasets() {
        let config = IntegrationConfig::default();
        assert_eq!(config.source_dataset, "commercial_lending_source");
        assert_eq!(config.target_dataset, "commercial_lending_target");
        assert_eq!(config.approval_timeout(), Duration::from_secs(900));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: IntegrationConfig =
            toml::from_str("project_id = \"proj\"\n[thresholds]\nhigh = 0.95\n").unwrap();
        assert_eq!(config.project_id, "proj");
        assert_eq!(config.thresholds.high, 0.95);
        assert_eq!(config.thresholds.medium, 0.60);
        assert_eq!(config.approval.timeout_secs, 900);
    }

    #[test]
    fn env_overrides_with_project_fallback() {
        let mut config = IntegrationConfig::default();
        config.apply_env(env(&[
            ("GOOGLE_CLOUD_PROJECT", "fallback"),
            ("BQ_DATASET_SOURCE", "raw"),
            ("BQ_DATASET_TARGET", ""),
        ]));
        assert_eq!(config.project_id, "fallback");
        assert_eq!(config.source_dataset, "raw");
        assert_eq!(config.target_dataset, "commercial_lending_target");

        config.apply_env(env(&[
            ("BQ_PROJECT_ID", "primary"),
            ("GOOGLE_CLOUD_PROJECT", "fallback"),
        ]));
        assert_eq!(config.project_id, "primary");
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let mut config = IntegrationConfig::default();
        config.thresholds.medium = 0.95;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn loads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colmap.toml");
        fs::write(
            &path,
            "source_dataset = \"raw\"\n[approval]\ntimeout_secs = 30\n[audit]\npath = \"audit/events.jsonl\"\n",
        )
        .unwrap();

        let config = IntegrationConfig::from_file(&path).unwrap();
        assert_eq!(config.source_dataset, "raw");
        assert_eq!(config.approval_timeout(), Duration::from_secs(30));
        assert_eq!(
            config.audit_path(),
            Some(PathBuf::from("audit/events.jsonl"))
        );
    }

    #[test]
    fn explicit_file_must_exist_and_parse() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            IntegrationConfig::from_file(&missing),
            Err(ConfigError::Read { .. })
        ));

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "thresholds = \"high\"\n").unwrap();
        assert!(matches!(
            IntegrationConfig::from_file(&broken),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_unsafe_dataset() {
        let mut config = IntegrationConfig::default();
        config.target_dataset = "tgt; DROP".to_string();
        assert!(config.validate().is_err());
    }
}
