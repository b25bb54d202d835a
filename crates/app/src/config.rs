use std::path::{Path, PathBuf};

use jizhang_core::MatchPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("No data directory available; set database_path explicitly")]
    NoDataDir,
}

/// Process configuration. Every field has a default, so an empty file (or no
/// file at all) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file. Defaults to `ledger.db` in the platform data directory.
    pub database_path: Option<PathBuf>,
    pub ledger_id: String,
    /// Shown on the user-type line; the module code is used when unset.
    pub user_type: Option<String>,
    pub module_code: String,
    pub catalog_timeout_ms: u64,
    /// Print replies as JSON instead of the plain message text.
    pub json_output: bool,
    pub policy: MatchPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: None,
            ledger_id: "default".to_string(),
            user_type: None,
            module_code: "BK".to_string(),
            catalog_timeout_ms: 3000,
            json_output: false,
            policy: MatchPolicy::default(),
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "jizhang", "Jizhang")
}

impl Config {
    pub fn from_toml(toml_content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_content)
    }

    /// Load `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file, using defaults");
                return Ok(Config::default());
            }
            Err(source) => {
                return Err(ConfigError::Read { path: path.to_path_buf(), source });
            }
        };
        Self::from_toml(&content).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => project_dirs()
                .map(|dirs| dirs.data_dir().join("ledger.db"))
                .ok_or(ConfigError::NoDataDir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn policy_table_overrides_single_constants() {
        let config = Config::from_toml(
            r#"
            ledger_id = "family"
            catalog_timeout_ms = 500

            [policy]
            levenshtein_threshold = 0.75
            utc_offset_hours = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.ledger_id, "family");
        assert_eq!(config.catalog_timeout_ms, 500);
        assert_eq!(config.policy.levenshtein_threshold, 0.75);
        assert_eq!(config.policy.utc_offset_hours, 0);
        assert_eq!(config.policy.compound_synonym_cap, 0.95);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn bad_toml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "catalog_timeout_ms = \"soon\"").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn explicit_database_path_wins() {
        let config = Config { database_path: Some(PathBuf::from("/tmp/x.db")), ..Config::default() };
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/x.db"));
    }
}
