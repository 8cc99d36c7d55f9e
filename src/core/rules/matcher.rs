//! Priority-ordered rule evaluation.

use super::template::{expand_rename_pattern, RenameContext};
use super::types::{OrganizationRule, RuleMatchResult, RuleOperator, RuleType};
use super::values::{parse_size, resolve_date};
use crate::error::RuleError;
use chrono::{DateTime, Local};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::fs::{self, File, Metadata};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Bytes of a file inspected by content-keyword rules
pub const CONTENT_READ_LIMIT: u64 = 10 * 1024;

/// Extensions whose contents are searched by content-keyword rules
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "csv", "json", "xml", "html", "htm", "log", "py", "js", "ts", "rs", "java", "c",
    "cpp", "h", "css", "yaml", "yml", "ini", "cfg", "toml", "sh",
];

/// Evaluates files against a priority-ordered rule set.
///
/// Rules are kept sorted ascending by priority (stable, so equal
/// priorities keep insertion order). Evaluation stops at the first
/// enabled rule whose predicate holds.
#[derive(Debug, Default)]
pub struct RuleMatcher {
    rules: Vec<OrganizationRule>,
    /// Compiled patterns for `matches_regex` rules, keyed by rule id
    regexes: HashMap<String, Regex>,
    /// Backs the `{counter}` rename placeholder
    counter: AtomicU64,
}

impl RuleMatcher {
    /// Build a matcher, rejecting the first invalid rule
    pub fn new(rules: Vec<OrganizationRule>) -> Result<Self, RuleError> {
        let mut matcher = Self::default();
        for rule in rules {
            matcher.insert(rule)?;
        }
        matcher.resort();
        Ok(matcher)
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> &[OrganizationRule] {
        &self.rules
    }

    pub fn get_rule(&self, id: &str) -> Option<&OrganizationRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Add a rule. A rule with the same id is replaced.
    pub fn add_rule(&mut self, rule: OrganizationRule) -> Result<(), RuleError> {
        self.insert(rule)?;
        self.resort();
        Ok(())
    }

    pub fn remove_rule(&mut self, id: &str) -> Result<OrganizationRule, RuleError> {
        let index = self.index_of(id)?;
        self.regexes.remove(id);
        Ok(self.rules.remove(index))
    }

    /// Replace the rule with the same id
    pub fn update_rule(&mut self, rule: OrganizationRule) -> Result<(), RuleError> {
        self.index_of(&rule.id)?;
        self.add_rule(rule)
    }

    pub fn enable_rule(&mut self, id: &str) -> Result<(), RuleError> {
        let index = self.index_of(id)?;
        self.rules[index].enabled = true;
        self.resort();
        Ok(())
    }

    pub fn disable_rule(&mut self, id: &str) -> Result<(), RuleError> {
        let index = self.index_of(id)?;
        self.rules[index].enabled = false;
        self.resort();
        Ok(())
    }

    /// Evaluate one file against the rule set
    pub fn evaluate(&self, path: &Path) -> RuleMatchResult {
        let facts = FileFacts::gather(path);
        let now = Local::now();

        for rule in self.rules.iter().filter(|r| r.enabled) {
            if !self.rule_matches(rule, &facts, now) {
                continue;
            }

            debug!("{} matched rule '{}'", path.display(), rule.name);

            let target_filename = rule.rename_pattern.as_deref().map(|pattern| {
                let counter = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                expand_rename_pattern(
                    pattern,
                    path,
                    &RenameContext {
                        category: &rule.target_category,
                        counter,
                        now,
                    },
                )
            });

            return RuleMatchResult {
                matched: true,
                rule: Some(rule.clone()),
                target_category: Some(rule.target_category.clone()),
                target_filename,
                reasoning: format!(
                    "Matched rule '{}' ({} {} '{}', priority {})",
                    rule.name, rule.rule_type, rule.operator, rule.value, rule.priority
                ),
            };
        }

        RuleMatchResult::no_match()
    }

    /// Evaluate many files, keeping input order
    pub fn evaluate_all(&self, paths: &[PathBuf]) -> Vec<(PathBuf, RuleMatchResult)> {
        paths
            .iter()
            .map(|p| (p.clone(), self.evaluate(p)))
            .collect()
    }

    fn insert(&mut self, rule: OrganizationRule) -> Result<(), RuleError> {
        let regex = validate_rule(&rule)?;
        self.regexes.remove(&rule.id);
        if let Some(re) = regex {
            self.regexes.insert(rule.id.clone(), re);
        }
        match self.rules.iter().position(|r| r.id == rule.id) {
            Some(index) => self.rules[index] = rule,
            None => self.rules.push(rule),
        }
        Ok(())
    }

    fn resort(&mut self) {
        self.rules.sort_by_key(|r| r.priority);
    }

    fn index_of(&self, id: &str) -> Result<usize, RuleError> {
        self.rules
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| RuleError::NotFound { id: id.to_string() })
    }

    fn rule_matches(&self, rule: &OrganizationRule, facts: &FileFacts, now: DateTime<Local>) -> bool {
        match rule.rule_type {
            RuleType::FilenamePattern => self.match_text(rule, &facts.name),
            RuleType::Extension => self.match_extension(rule, &facts.extension),
            RuleType::ContentKeyword => match facts.read_text_prefix() {
                Some(content) => self.match_text(rule, &content),
                None => false,
            },
            RuleType::FileSize => {
                let Some(size) = facts.metadata.as_ref().map(|m| m.len()) else {
                    return false;
                };
                let Ok(lo) = parse_size(&rule.value) else {
                    return false;
                };
                let hi = rule.value2.as_deref().and_then(|v| parse_size(v).ok());
                compare_ordered(rule.operator, size, lo, hi)
            }
            RuleType::DateModified | RuleType::DateCreated => {
                let Some(actual) = facts.timestamp(rule.rule_type) else {
                    return false;
                };
                let Ok(lo) = resolve_date(&rule.value, now) else {
                    return false;
                };
                let hi = rule
                    .value2
                    .as_deref()
                    .and_then(|v| resolve_date(v, now).ok());

                // Timestamps never compare equal in practice; equals means same day
                if rule.operator == RuleOperator::Equals {
                    return actual.date_naive() == lo.date_naive();
                }
                compare_ordered(rule.operator, actual, lo, hi)
            }
        }
    }

    fn match_text(&self, rule: &OrganizationRule, haystack: &str) -> bool {
        if rule.operator == RuleOperator::MatchesRegex {
            return self
                .regexes
                .get(&rule.id)
                .map(|re| re.is_match(haystack))
                .unwrap_or(false);
        }

        let (haystack, needle) = if rule.case_sensitive {
            (haystack.to_string(), rule.value.clone())
        } else {
            (haystack.to_lowercase(), rule.value.to_lowercase())
        };

        match rule.operator {
            RuleOperator::Equals => haystack == needle,
            RuleOperator::Contains => haystack.contains(&needle),
            RuleOperator::StartsWith => haystack.starts_with(&needle),
            RuleOperator::EndsWith => haystack.ends_with(&needle),
            _ => false,
        }
    }

    fn match_extension(&self, rule: &OrganizationRule, extension: &str) -> bool {
        if extension.is_empty() {
            return false;
        }
        if rule.operator == RuleOperator::MatchesRegex {
            return self
                .regexes
                .get(&rule.id)
                .map(|re| re.is_match(extension))
                .unwrap_or(false);
        }

        let wanted = normalize_extensions(&rule.value);
        let bare = extension.trim_start_matches('.');

        match rule.operator {
            RuleOperator::Equals => wanted.iter().any(|w| w == extension),
            RuleOperator::Contains => wanted
                .iter()
                .any(|w| bare.contains(w.trim_start_matches('.'))),
            RuleOperator::StartsWith => wanted
                .iter()
                .any(|w| bare.starts_with(w.trim_start_matches('.'))),
            RuleOperator::EndsWith => wanted
                .iter()
                .any(|w| bare.ends_with(w.trim_start_matches('.'))),
            _ => false,
        }
    }
}

/// Check a rule for problems that would make it silently never match.
///
/// Returns the compiled regex for `matches_regex` rules.
pub fn validate_rule(rule: &OrganizationRule) -> Result<Option<Regex>, RuleError> {
    let unsupported = || RuleError::UnsupportedOperator {
        rule_type: rule.rule_type.to_string(),
        operator: rule.operator.to_string(),
    };

    if rule.rule_type.is_ordered() {
        if !rule.operator.is_ordered() {
            return Err(unsupported());
        }
        let parse = |value: &str| -> Result<(), RuleError> {
            if rule.rule_type == RuleType::FileSize {
                parse_size(value).map(|_| ())
            } else {
                resolve_date(value, Local::now()).map(|_| ())
            }
        };
        parse(&rule.value)?;
        if rule.operator == RuleOperator::Between {
            let value2 = rule
                .value2
                .as_deref()
                .ok_or_else(|| RuleError::MissingSecondValue {
                    rule: rule.name.clone(),
                })?;
            parse(value2)?;
        }
        return Ok(None);
    }

    if !rule.operator.is_textual() {
        return Err(unsupported());
    }

    if rule.operator == RuleOperator::MatchesRegex {
        let regex = RegexBuilder::new(&rule.value)
            .case_insensitive(!rule.case_sensitive || rule.rule_type == RuleType::Extension)
            .build()
            .map_err(|e| RuleError::InvalidRegex {
                rule: rule.name.clone(),
                reason: e.to_string(),
            })?;
        return Ok(Some(regex));
    }

    Ok(None)
}

/// Evaluate `path` against an unsorted slice of rules.
///
/// Invalid rules are skipped with a warning instead of failing the call.
pub fn evaluate(path: &Path, rules: &[OrganizationRule]) -> RuleMatchResult {
    let mut matcher = RuleMatcher::default();
    for rule in rules {
        if let Err(e) = matcher.insert(rule.clone()) {
            warn!("Skipping rule '{}': {}", rule.name, e);
        }
    }
    matcher.resort();
    matcher.evaluate(path)
}

/// Split a list like `"jpg, .PNG;gif"` into `[".jpg", ".png", ".gif"]`
pub fn normalize_extensions(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .map(|s| format!(".{}", s))
        .collect()
}

fn compare_ordered<T: PartialOrd>(op: RuleOperator, actual: T, lo: T, hi: Option<T>) -> bool {
    match op {
        RuleOperator::Equals => actual == lo,
        RuleOperator::GreaterThan => actual > lo,
        RuleOperator::LessThan => actual < lo,
        RuleOperator::Between => match hi {
            Some(hi) if lo <= hi => actual >= lo && actual <= hi,
            Some(hi) => actual >= hi && actual <= lo,
            None => false,
        },
        _ => false,
    }
}

/// What a rule can look at, gathered once per evaluation
struct FileFacts<'a> {
    path: &'a Path,
    name: String,
    /// Dot-prefixed and lower-cased, empty when the file has none
    extension: String,
    metadata: Option<Metadata>,
}

impl<'a> FileFacts<'a> {
    fn gather(path: &'a Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();

        Self {
            path,
            name,
            extension,
            metadata: fs::metadata(path).ok(),
        }
    }

    fn timestamp(&self, rule_type: RuleType) -> Option<DateTime<Local>> {
        let metadata = self.metadata.as_ref()?;
        let time = match rule_type {
            // Not every filesystem records a birth time
            RuleType::DateCreated => metadata.created().or_else(|_| metadata.modified()),
            _ => metadata.modified(),
        }
        .ok()?;
        Some(DateTime::<Local>::from(time))
    }

    /// First [`CONTENT_READ_LIMIT`] bytes of a text file, lossily decoded.
    ///
    /// Non-text extensions and unreadable files yield `None`.
    fn read_text_prefix(&self) -> Option<String> {
        let bare = self.extension.trim_start_matches('.');
        if !TEXT_EXTENSIONS.contains(&bare) {
            return None;
        }

        let mut buffer = Vec::new();
        let read = File::open(self.path)
            .and_then(|f| f.take(CONTENT_READ_LIMIT).read_to_end(&mut buffer));

        match read {
            Ok(_) => Some(String::from_utf8_lossy(&buffer).into_owned()),
            Err(e) => {
                debug!("Could not read {} for content rules: {}", self.path.display(), e);
                None
            }
        }
    }
}
