//! JSON persistence for rule sets.
//!
//! The on-disk document is `{ "version": "1.0", "rules": [ ... ] }`.

use super::types::OrganizationRule;
use crate::error::RuleError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

pub const RULES_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RulesDocument {
    version: String,
    #[serde(default)]
    rules: Vec<OrganizationRule>,
}

/// Loads and saves rule files
pub struct RuleStore;

impl RuleStore {
    /// Read rules from `path`. A missing file is an empty rule set.
    pub fn load(path: &Path) -> Result<Vec<OrganizationRule>, RuleError> {
        if !path.exists() {
            debug!("No rules file at {}", path.display());
            return Ok(Vec::new());
        }

        let text = fs::read_to_string(path).map_err(|e| RuleError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let document: RulesDocument =
            serde_json::from_str(&text).map_err(|e| RuleError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if document.version != RULES_FORMAT_VERSION {
            warn!(
                "Rules file {} has version {}, expected {}",
                path.display(),
                document.version,
                RULES_FORMAT_VERSION
            );
        }

        Ok(document.rules)
    }

    /// Write rules to `path`, creating parent directories
    pub fn save(path: &Path, rules: &[OrganizationRule]) -> Result<(), RuleError> {
        let io_err = |e| RuleError::Io {
            path: path.to_path_buf(),
            source: e,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let document = RulesDocument {
            version: RULES_FORMAT_VERSION.to_string(),
            rules: rules.to_vec(),
        };
        let json = serde_json::to_string_pretty(&document).map_err(|e| RuleError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        fs::write(path, json).map_err(io_err)
    }
}
