//! The `Organizer` facade.
//!
//! Wires every component from one [`OrganizerConfig`] and exposes the
//! operations a front end needs: plan, validate, resolve, execute, undo,
//! plus rule evaluation and duplicate detection.

use crate::config::OrganizerConfig;
use crate::core::backup::{BackupInfo, BackupManager};
use crate::core::classify::{classify_all, Classification, Classifier, RuleClassifier};
use crate::core::duplicates::{DuplicateDetectionResult, DuplicateDetector};
use crate::core::organize::{
    ConflictResolver, DiskSpace, ExecutionResult, Executor, OrganizationPlan, OrganizationPlanner,
    PlanValidator, PlannerConfig, ValidationIssue,
};
use crate::core::rules::{RuleMatchResult, RuleMatcher, RuleStore};
use crate::core::undo::{BatchSummary, UndoLog, UndoManager, UndoResult};
use crate::error::{PlanError, Result};
use crate::events::{CancellationToken, EventSender};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Everything needed to organize a directory safely and take it back
pub struct Organizer {
    config: OrganizerConfig,
    planner: OrganizationPlanner,
    executor: Executor,
    backups: Arc<BackupManager>,
    undo: UndoManager,
    classifier: RuleClassifier,
    detector: DuplicateDetector,
}

impl Organizer {
    /// Build all components. Fails on an invalid config, unreadable rules
    /// or an undo log that cannot be opened.
    pub fn new(config: OrganizerConfig) -> Result<Self> {
        config.validate()?;

        let planner = OrganizationPlanner::new(PlannerConfig::from(&config))?;
        let undo_log = Arc::new(UndoLog::open(&config.undo_db_path)?);
        let backups = Arc::new(BackupManager::new(
            config.backup_root.clone(),
            config.backup_strategy,
        ));

        let executor = Executor::new(
            PlanValidator::new(config.disk_space_headroom),
            ConflictResolver::new(config.max_conflict_attempts),
        )
        .with_backup(Arc::clone(&backups))
        .with_undo_log(Arc::clone(&undo_log))
        .record_hashes(true);

        let rules = RuleStore::load(&config.rules_path)?;
        info!(
            "Loaded {} rules from {}",
            rules.len(),
            config.rules_path.display()
        );
        let classifier = RuleClassifier::new(RuleMatcher::new(rules)?);

        let detector = DuplicateDetector::new(config.hash_algorithm, config.similarity_threshold)?;

        Ok(Self {
            config,
            planner,
            executor,
            backups,
            undo: UndoManager::new(undo_log),
            classifier,
            detector,
        })
    }

    /// Route progress events from execution, undo, backups and scans to `sender`
    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.backups = Arc::new(
            BackupManager::new(self.config.backup_root.clone(), self.config.backup_strategy)
                .with_events(sender.clone()),
        );
        self.executor = self
            .executor
            .with_backup(Arc::clone(&self.backups))
            .with_events(sender.clone());
        self.undo = self.undo.with_events(sender.clone());
        self.detector = self.detector.with_events(sender);
        self
    }

    /// Share a cancellation token with execution and duplicate scans
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.executor = self.executor.with_cancellation(token.clone());
        self.detector = self.detector.with_cancellation(token);
        self
    }

    /// Swap the free-space source used during validation
    pub fn with_disk_space(mut self, disk_space: Box<dyn DiskSpace>) -> Self {
        let validator = PlanValidator::new(self.config.disk_space_headroom).with_disk_space(disk_space);
        self.executor = self.executor.with_validator(validator);
        self
    }

    pub fn config(&self) -> &OrganizerConfig {
        &self.config
    }

    pub fn rule_matcher(&self) -> &RuleMatcher {
        self.classifier.matcher()
    }

    pub fn rule_matcher_mut(&mut self) -> &mut RuleMatcher {
        self.classifier.matcher_mut()
    }

    /// Persist the current rule set to the configured rules file
    pub fn save_rules(&self) -> Result<()> {
        RuleStore::save(&self.config.rules_path, self.rule_matcher().rules())?;
        Ok(())
    }

    /// Evaluate one file against the rules
    pub fn evaluate(&self, path: &Path) -> RuleMatchResult {
        self.classifier.matcher().evaluate(path)
    }

    /// Classify files with the rules. Files no rule matches are left out.
    pub fn classify(&self, files: &[PathBuf]) -> Vec<Classification> {
        debug!("Classifying {} files with {}", files.len(), self.classifier.name());
        classify_all(&self.classifier, files)
    }

    /// List the files in `dir`, skipping hidden entries
    pub fn collect_files(&self, dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(PlanError::SourceNotFound {
                path: dir.to_path_buf(),
            }
            .into());
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(dir)
            .follow_links(false)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .sort_by_file_name();

        for entry in walker.into_iter().filter_entry(|e| {
            e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
        }) {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable entry: {}", e),
            }
        }

        Ok(files)
    }

    pub fn create_plan(
        &self,
        files: &[PathBuf],
        classifications: &[Classification],
        target_root: &Path,
    ) -> OrganizationPlan {
        self.planner.create_plan(files, classifications, target_root)
    }

    /// Collect, classify by rules and plan a whole directory
    pub fn plan_directory(
        &self,
        source_dir: &Path,
        target_root: &Path,
        recursive: bool,
    ) -> Result<OrganizationPlan> {
        let files = self.collect_files(source_dir, recursive)?;
        let classifications = self.classify(&files);
        let mut plan = self.create_plan(&files, &classifications, target_root);
        plan.source_dir = source_dir.to_path_buf();
        Ok(plan)
    }

    pub fn validate_plan(&self, plan: &OrganizationPlan) -> Vec<ValidationIssue> {
        self.executor.validator().validate(plan)
    }

    pub fn resolve_conflicts(&self, plan: OrganizationPlan) -> OrganizationPlan {
        self.executor.resolver().resolve(plan)
    }

    pub fn execute_plan(&self, plan: &OrganizationPlan, dry_run: bool) -> ExecutionResult {
        self.executor.execute(plan, dry_run)
    }

    pub fn execute_plan_with_progress<F>(
        &self,
        plan: &OrganizationPlan,
        dry_run: bool,
        progress: F,
    ) -> ExecutionResult
    where
        F: FnMut(usize, usize),
    {
        self.executor.execute_with_progress(plan, dry_run, progress)
    }

    pub fn undo_batch(&self, batch_id: &str) -> Result<UndoResult> {
        Ok(self.undo.undo_batch(batch_id)?)
    }

    pub fn undo_last(&self) -> Result<UndoResult> {
        Ok(self.undo.undo_last()?)
    }

    pub fn verify_undo_possible(&self, batch_id: &str) -> Result<(bool, Vec<String>)> {
        Ok(self.undo.verify_undo_possible(batch_id)?)
    }

    pub fn history(&self, limit: usize) -> Result<Vec<BatchSummary>> {
        Ok(self.undo.get_history(limit)?)
    }

    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo
    }

    pub fn find_duplicates(
        &self,
        files: &[PathBuf],
        detect_exact: bool,
        detect_similar: bool,
    ) -> Result<DuplicateDetectionResult> {
        Ok(self
            .detector
            .find_duplicates(files, detect_exact, detect_similar)?)
    }

    pub fn find_duplicates_in_dirs(
        &self,
        dirs: &[PathBuf],
        recursive: bool,
        detect_exact: bool,
        detect_similar: bool,
    ) -> Result<DuplicateDetectionResult> {
        Ok(self
            .detector
            .find_duplicates_in_dirs(dirs, recursive, detect_exact, detect_similar)?)
    }

    pub fn duplicates(&self) -> &DuplicateDetector {
        &self.detector
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        Ok(self.backups.list_backups()?)
    }

    /// Remove backups older than the configured retention period
    pub fn cleanup_backups(&self) -> Result<usize> {
        Ok(self
            .backups
            .cleanup_old_backups(self.config.backup_retention_days)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backup::BackupStrategy;
    use crate::core::rules::{OrganizationRule, RuleOperator, RuleType};
    use std::fs;
    use tempfile::TempDir;

    fn config_in(temp: &TempDir) -> OrganizerConfig {
        OrganizerConfig {
            backup_root: temp.path().join("state").join("backups"),
            undo_db_path: temp.path().join("state").join("undo.db"),
            rules_path: temp.path().join("state").join("rules.json"),
            ..OrganizerConfig::default()
        }
    }

    fn pdf_rule() -> OrganizationRule {
        OrganizationRule::new(
            "PDFs",
            RuleType::Extension,
            RuleOperator::Equals,
            "pdf",
            "Documents",
        )
    }

    #[test]
    fn invalid_config_is_rejected() {
        let temp = TempDir::new().unwrap();
        let config = OrganizerConfig {
            confidence_threshold: 2.0,
            ..config_in(&temp)
        };
        assert!(Organizer::new(config).is_err());
    }

    #[test]
    fn plans_and_executes_a_directory_then_undoes_it() {
        let temp = TempDir::new().unwrap();
        let inbox = temp.path().join("inbox");
        let sorted = temp.path().join("sorted");
        fs::create_dir_all(&inbox).unwrap();
        fs::write(inbox.join("report.pdf"), b"pdf").unwrap();
        fs::write(inbox.join("notes.txt"), b"txt").unwrap();
        fs::write(inbox.join(".hidden.pdf"), b"secret").unwrap();

        let mut organizer = Organizer::new(config_in(&temp)).unwrap();
        organizer.rule_matcher_mut().add_rule(pdf_rule()).unwrap();

        let plan = organizer.plan_directory(&inbox, &sorted, false).unwrap();
        assert_eq!(plan.total_files, 2);
        assert_eq!(plan.len(), 1);
        assert!(organizer.validate_plan(&plan).is_empty());

        let result = organizer.execute_plan(&plan, false);
        assert!(result.success, "{:?}", result.errors);
        assert!(sorted.join("Documents").join("report.pdf").exists());
        assert!(result.backup_path.is_some());

        let undo = organizer.undo_last().unwrap();
        assert!(undo.success);
        assert_eq!(undo.operations_undone, 1);
        assert!(inbox.join("report.pdf").exists());
    }

    #[test]
    fn saved_rules_are_loaded_by_the_next_organizer() {
        let temp = TempDir::new().unwrap();
        let mut organizer = Organizer::new(config_in(&temp)).unwrap();
        organizer.rule_matcher_mut().add_rule(pdf_rule()).unwrap();
        organizer.save_rules().unwrap();
        drop(organizer);

        let reloaded = Organizer::new(config_in(&temp)).unwrap();
        assert_eq!(reloaded.rule_matcher().rules().len(), 1);
        assert!(reloaded.evaluate(Path::new("/x/a.pdf")).matched);
    }

    #[test]
    fn missing_source_directory_is_an_error() {
        let temp = TempDir::new().unwrap();
        let organizer = Organizer::new(config_in(&temp)).unwrap();
        assert!(organizer
            .collect_files(&temp.path().join("nope"), true)
            .is_err());
    }

    #[test]
    fn backups_can_be_disabled() {
        let temp = TempDir::new().unwrap();
        let inbox = temp.path().join("inbox");
        fs::create_dir_all(&inbox).unwrap();
        fs::write(inbox.join("a.pdf"), b"a").unwrap();

        let config = OrganizerConfig {
            backup_strategy: BackupStrategy::None,
            ..config_in(&temp)
        };
        let mut organizer = Organizer::new(config).unwrap();
        organizer.rule_matcher_mut().add_rule(pdf_rule()).unwrap();

        let plan = organizer
            .plan_directory(&inbox, &temp.path().join("out"), true)
            .unwrap();
        let result = organizer.execute_plan(&plan, false);

        assert!(result.success);
        assert!(result.backup_path.is_none());
        assert!(organizer.list_backups().unwrap().is_empty());
    }
}
