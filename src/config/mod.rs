//! # Config Module
//!
//! Runtime configuration for the organizer.
//!
//! Values come from a JSON file when one exists; every field has a
//! default so a partial (or missing) file is fine. Invalid values are
//! rejected by [`OrganizerConfig::validate`] before any component is built.

use crate::core::backup::BackupStrategy;
use crate::core::duplicates::ContentHashAlgorithm;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = "file-organizer";

/// Organizer-wide settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrganizerConfig {
    /// Classifications below this confidence are left out of plans
    pub confidence_threshold: f64,
    /// Force the source extension onto suggested names
    pub preserve_extension: bool,
    /// Longest filename the planner will produce
    pub max_filename_length: usize,
    /// Whether sources are snapshotted before execution
    pub backup_strategy: BackupStrategy,
    pub backup_root: PathBuf,
    pub undo_db_path: PathBuf,
    pub rules_path: PathBuf,
    /// Content hash used for exact duplicate detection
    pub hash_algorithm: ContentHashAlgorithm,
    /// Max Hamming distance for similar images (0-64)
    pub similarity_threshold: u32,
    /// Fraction of free space that must stay free after a plan runs
    pub disk_space_headroom: f64,
    /// Upper bound on "name (N).ext" attempts per operation
    pub max_conflict_attempts: u32,
    pub backup_retention_days: u32,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            confidence_threshold: 0.5,
            preserve_extension: true,
            max_filename_length: 255,
            backup_strategy: BackupStrategy::Full,
            backup_root: data_dir.join("backups"),
            undo_db_path: data_dir.join("undo.db"),
            rules_path: config_dir.join("rules.json"),
            hash_algorithm: ContentHashAlgorithm::Sha256,
            similarity_threshold: 10,
            disk_space_headroom: 0.10,
            max_conflict_attempts: 1000,
            backup_retention_days: 30,
        }
    }
}

impl OrganizerConfig {
    /// Default location of the config file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |path: &Path, source: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| write_error(path, e.into()))?;
        std::fs::write(path, json).map_err(|e| write_error(path, e))
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::Invalid {
                field: "confidence_threshold",
                reason: format!("{} is outside 0.0-1.0", self.confidence_threshold),
            });
        }
        // Room for at least one stem char, the ellipsis and a short extension
        if self.max_filename_length < 8 {
            return Err(ConfigError::Invalid {
                field: "max_filename_length",
                reason: format!("{} is too short", self.max_filename_length),
            });
        }
        if self.similarity_threshold > 64 {
            return Err(ConfigError::Invalid {
                field: "similarity_threshold",
                reason: format!("{} exceeds 64 bits", self.similarity_threshold),
            });
        }
        if !(0.0..1.0).contains(&self.disk_space_headroom) {
            return Err(ConfigError::Invalid {
                field: "disk_space_headroom",
                reason: format!("{} is outside 0.0-1.0", self.disk_space_headroom),
            });
        }
        if self.max_conflict_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "max_conflict_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        assert!(OrganizerConfig::default().validate().is_ok());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = OrganizerConfig::load(&temp.path().join("none.json")).unwrap();
        assert_eq!(config, OrganizerConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{ "confidence_threshold": 0.8, "backup_strategy": "none" }"#)
            .unwrap();

        let config = OrganizerConfig::load(&path).unwrap();

        assert_eq!(config.confidence_threshold, 0.8);
        assert_eq!(config.backup_strategy, BackupStrategy::None);
        assert_eq!(config.max_filename_length, 255);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{ "confidence_threshold": 1.5 }"#).unwrap();

        let err = OrganizerConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("confidence_threshold"));
    }

    #[test]
    fn save_then_load_preserves_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.json");
        let config = OrganizerConfig {
            similarity_threshold: 6,
            ..OrganizerConfig::default()
        };

        config.save(&path).unwrap();
        let loaded = OrganizerConfig::load(&path).unwrap();

        assert_eq!(loaded.similarity_threshold, 6);
    }

    #[test]
    fn save_reports_write_failures() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = OrganizerConfig::default()
            .save(&blocker.join("config.json"))
            .unwrap_err();

        assert!(matches!(err, ConfigError::Write { .. }));
        assert!(err.to_string().starts_with("Failed to write config"));
    }
}
