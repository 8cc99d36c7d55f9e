//! # Classify Module
//!
//! The boundary between whatever decides *where a file belongs* and the
//! planner that turns that decision into a move.
//!
//! Rule matching and external analyzers both produce a
//! [`Classification`]. Callers inject a [`Classifier`] instead of the
//! planner reaching for shared global state, which keeps planning
//! deterministic under test.

use crate::core::rules::RuleMatcher;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a file should go and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub file_path: PathBuf,
    pub category: String,
    pub suggested_name: String,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub reasoning: String,
}

/// Anything that can propose a classification for a file
pub trait Classifier: Send + Sync {
    /// `None` means "no opinion"; the next strategy in a chain is tried
    fn classify(&self, path: &Path) -> Option<Classification>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Classifies with the user's rules. Matches are fully confident.
pub struct RuleClassifier {
    matcher: RuleMatcher,
}

impl RuleClassifier {
    pub fn new(matcher: RuleMatcher) -> Self {
        Self { matcher }
    }

    pub fn matcher(&self) -> &RuleMatcher {
        &self.matcher
    }

    pub fn matcher_mut(&mut self) -> &mut RuleMatcher {
        &mut self.matcher
    }
}

impl Classifier for RuleClassifier {
    fn classify(&self, path: &Path) -> Option<Classification> {
        let result = self.matcher.evaluate(path);
        if !result.matched {
            return None;
        }

        let category = result.target_category?;
        let suggested_name = result.target_filename.unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        Some(Classification {
            file_path: path.to_path_buf(),
            category,
            suggested_name,
            confidence: 1.0,
            reasoning: result.reasoning,
        })
    }

    fn name(&self) -> &str {
        "rules"
    }
}

/// An ordered list of strategies, tried until one has an opinion
#[derive(Default)]
pub struct ClassifierChain {
    strategies: Vec<Box<dyn Classifier>>,
}

impl ClassifierChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a strategy; earlier strategies take precedence
    pub fn with(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.strategies.push(classifier);
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Classifier for ClassifierChain {
    fn classify(&self, path: &Path) -> Option<Classification> {
        self.strategies.iter().find_map(|strategy| {
            let result = strategy.classify(path);
            if result.is_none() {
                debug!("{} had no opinion on {}", strategy.name(), path.display());
            }
            result
        })
    }

    fn name(&self) -> &str {
        "chain"
    }
}

/// Classify every file, dropping those no strategy could place
pub fn classify_all(classifier: &dyn Classifier, files: &[PathBuf]) -> Vec<Classification> {
    files
        .iter()
        .filter_map(|f| classifier.classify(f))
        .collect()
}
