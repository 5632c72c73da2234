// Path: crates/types/src/config/mod.rs

//! Configuration structures for the store, retrieval policy and conditions.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Selects the backend of the value store.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Durable store backed by `redb`.
    #[default]
    Redb,
    /// Volatile, in-process store.
    Memory,
}

/// Storage settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    /// Which backend to open.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Database file for the `redb` backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Redb,
            path: Some(PathBuf::from("oraclegate.redb")),
        }
    }
}

/// Retrieval policy.
///
/// `max_age_secs` has no default: the staleness bound is an application policy
/// and must be stated explicitly.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// The maximum age of a submission still considered trustworthy.
    pub max_age_secs: u64,
    /// The deadline for a single storage read.
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
}

fn default_io_timeout_ms() -> u64 {
    2000
}

impl RetrievalConfig {
    /// The staleness bound as a `Duration`.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    /// The storage read deadline as a `Duration`.
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

/// Per-kind overrides for a registered condition.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConditionConfig {
    /// The query kind tag (e.g. `albumDrop`).
    pub kind: String,
    /// Overrides the global staleness bound for this kind.
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

/// Top-level configuration file.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OracleConfig {
    /// Retrieval policy.
    pub retrieval: RetrievalConfig,
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Per-kind condition overrides.
    #[serde(default)]
    pub conditions: Vec<ConditionConfig>,
}

impl OracleConfig {
    /// Parses and validates a configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: OracleConfig = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads, parses and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Serializes the configuration back to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Checks constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retrieval.max_age_secs == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.max_age_secs must be greater than zero".into(),
            ));
        }
        if self.retrieval.io_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.io_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.storage.backend == StorageBackend::Redb && self.storage.path.is_none() {
            return Err(ConfigError::Invalid(
                "storage.path is required for the redb backend".into(),
            ));
        }
        for c in &self.conditions {
            if c.max_age_secs == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "conditions.{}.max_age_secs must be greater than zero",
                    c.kind
                )));
            }
        }
        Ok(())
    }

    /// The staleness bound for `kind`: its override if present, else the global bound.
    pub fn max_age_for(&self, kind: &str) -> Duration {
        self.conditions
            .iter()
            .find(|c| c.kind == kind)
            .and_then(|c| c.max_age_secs)
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.retrieval.max_age())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[retrieval]
max_age_secs = 3600

[storage]
backend = "redb"
path = "/tmp/og.redb"

[[conditions]]
kind = "albumDrop"
max_age_secs = 86400
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let cfg = OracleConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.retrieval.io_timeout_ms, 2000);
        assert_eq!(cfg.storage.backend, StorageBackend::Redb);
        assert_eq!(cfg.max_age_for("albumDrop"), Duration::from_secs(86400));
        assert_eq!(cfg.max_age_for("other"), Duration::from_secs(3600));
    }

    #[test]
    fn max_age_is_required() {
        let err = OracleConfig::from_toml_str("[retrieval]\nio_timeout_ms = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_bounds_are_invalid() {
        let err = OracleConfig::from_toml_str("[retrieval]\nmax_age_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let raw = "[retrieval]\nmax_age_secs = 1\n[storage]\nbackend = \"redb\"\n";
        let err = OracleConfig::from_toml_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn memory_backend_needs_no_path() {
        let raw = "[retrieval]\nmax_age_secs = 10\n[storage]\nbackend = \"memory\"\n";
        let cfg = OracleConfig::from_toml_str(raw).unwrap();
        assert_eq!(cfg.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn load_reads_file_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oracle.toml");
        let cfg = OracleConfig::from_toml_str(SAMPLE).unwrap();
        std::fs::write(&path, cfg.to_toml_string().unwrap()).unwrap();
        let loaded = OracleConfig::load(&path).unwrap();
        assert_eq!(loaded.conditions, cfg.conditions);
        assert_eq!(loaded.storage.path, cfg.storage.path);
    }
}
