//! Types for rule-based classification.

use super::matcher::validate_rule;
use crate::error::RuleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What part of a file a rule looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    FilenamePattern,
    Extension,
    ContentKeyword,
    FileSize,
    DateModified,
    DateCreated,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FilenamePattern => "filename_pattern",
            Self::Extension => "extension",
            Self::ContentKeyword => "content_keyword",
            Self::FileSize => "file_size",
            Self::DateModified => "date_modified",
            Self::DateCreated => "date_created",
        }
    }

    /// Whether the rule compares numbers (bytes or timestamps) rather than text
    pub fn is_ordered(&self) -> bool {
        matches!(self, Self::FileSize | Self::DateModified | Self::DateCreated)
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a rule's value is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperator {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    MatchesRegex,
    GreaterThan,
    LessThan,
    Between,
}

impl RuleOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::MatchesRegex => "matches_regex",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::Between => "between",
        }
    }

    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            Self::Equals | Self::Contains | Self::StartsWith | Self::EndsWith | Self::MatchesRegex
        )
    }

    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            Self::Equals | Self::GreaterThan | Self::LessThan | Self::Between
        )
    }
}

impl fmt::Display for RuleOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_priority() -> i32 {
    100
}

fn default_enabled() -> bool {
    true
}

/// A user-defined organization rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationRule {
    pub id: String,
    pub name: String,
    pub rule_type: RuleType,
    pub operator: RuleOperator,
    pub value: String,
    /// Upper bound for `between`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<String>,
    pub target_category: String,
    /// Template with `{original_name}`, `{original_ext}`, `{category}`,
    /// `{date}`, `{datetime}` and `{counter}` placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename_pattern: Option<String>,
    /// Lower values are evaluated first
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl OrganizationRule {
    /// Create an enabled, case-insensitive rule with a fresh id
    pub fn new(
        name: impl Into<String>,
        rule_type: RuleType,
        operator: RuleOperator,
        value: impl Into<String>,
        target_category: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            rule_type,
            operator,
            value: value.into(),
            value2: None,
            target_category: target_category.into(),
            rename_pattern: None,
            priority: default_priority(),
            enabled: true,
            case_sensitive: false,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_value2(mut self, value2: impl Into<String>) -> Self {
        self.value2 = Some(value2.into());
        self
    }

    pub fn with_rename_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.rename_pattern = Some(pattern.into());
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Check that the regex compiles, sizes and dates parse, and `between` has a second value
    pub fn validate(&self) -> Result<(), RuleError> {
        validate_rule(self).map(|_| ())
    }
}

/// Outcome of evaluating a file against a rule set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMatchResult {
    pub matched: bool,
    pub rule: Option<OrganizationRule>,
    pub target_category: Option<String>,
    /// Only set when the matching rule has a rename pattern
    pub target_filename: Option<String>,
    pub reasoning: String,
}

impl RuleMatchResult {
    pub fn no_match() -> Self {
        Self {
            matched: false,
            rule: None,
            target_category: None,
            target_filename: None,
            reasoning: "No rule matched".to_string(),
        }
    }
}
