//! # CLI Module
//!
//! Command-line interface for the file organizer.
//!
//! ## Usage
//! ```bash
//! # Preview where rules would put files
//! file-organize plan ~/Downloads --target ~/Sorted
//!
//! # Organize for real (backed up and undoable)
//! file-organize organize ~/Downloads --target ~/Sorted
//!
//! # Take the last batch back
//! file-organize undo
//!
//! # Find duplicates, including similar images
//! file-organize duplicates ~/Photos --similar
//! ```

use clap::{Parser, Subcommand};
use console::{style, Term};
use file_organizer::core::classify::Classification;
use file_organizer::core::duplicates::{DuplicateDetectionResult, DuplicateGroup};
use file_organizer::core::organize::{ExecutionResult, OrganizationPlan, ValidationIssue};
use file_organizer::core::rules::{RuleMatcher, RuleStore};
use file_organizer::core::undo::UndoResult;
use file_organizer::error::{PlanError, Result, UndoError};
use file_organizer::events::{Event, EventChannel, EventReceiver, ExecuteEvent, UndoEvent};
use file_organizer::{Organizer, OrganizerConfig};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::thread;

/// File Organizer - Tidy folders without fear
#[derive(Parser, Debug)]
#[command(name = "file-organize")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the per-user config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON output for scripting
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build, validate and print a plan without touching any file
    Plan {
        /// Directory whose files are planned
        source: PathBuf,

        /// Root the category folders are created under
        #[arg(short, long)]
        target: PathBuf,

        /// JSON file with classifications (rules are used when omitted)
        #[arg(short, long)]
        classifications: Option<PathBuf>,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Classify files with rules and move them into place
    Organize {
        /// Directory whose files are organized
        source: PathBuf,

        /// Root the category folders are created under
        #[arg(short, long)]
        target: PathBuf,

        /// Rules file (overrides the configured one)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Only show what would happen
        #[arg(long)]
        dry_run: bool,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Reverse a batch (the most recent one when no id is given)
    Undo {
        batch_id: Option<String>,

        /// Only check whether the batch can be undone
        #[arg(long)]
        check: bool,
    },

    /// Show recent batches
    History {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Find duplicate files
    Duplicates {
        /// Directories to scan
        #[arg(required = true)]
        dirs: Vec<PathBuf>,

        /// Also group visually similar images
        #[arg(long)]
        similar: bool,

        /// Only scan the top level of each directory
        #[arg(long)]
        no_recurse: bool,

        /// Delete every copy but the first in each exact group
        #[arg(long)]
        delete: bool,

        /// With --delete, only report what would be removed
        #[arg(long)]
        dry_run: bool,
    },

    /// List, clean up or restore backups
    Backups {
        /// Remove backups older than this many days
        #[arg(long)]
        cleanup: Option<u32>,

        /// Name of a backup to restore
        #[arg(long, requires = "to")]
        restore: Option<String>,

        /// Where a restored backup is written
        #[arg(long)]
        to: Option<PathBuf>,
    },

    /// Work with rule files
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum RulesCommand {
    /// Validate a rules file and optionally test it against files
    Check {
        file: PathBuf,

        /// Files to evaluate against the rules
        #[arg(short, long)]
        path: Vec<PathBuf>,
    },
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    file_organizer::init_tracing_with_default(if cli.verbose { "debug" } else { "warn" });

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(OrganizerConfig::default_path);
    let config = OrganizerConfig::load(&config_path)?;
    let output = Output::new(cli.json, cli.verbose);

    match cli.command {
        Commands::Plan {
            source,
            target,
            classifications,
            recursive,
        } => run_plan(
            config,
            &output,
            &source,
            &target,
            classifications.as_deref(),
            recursive,
        ),
        Commands::Organize {
            source,
            target,
            rules,
            dry_run,
            recursive,
        } => {
            let config = match rules {
                Some(rules_path) => OrganizerConfig {
                    rules_path,
                    ..config
                },
                None => config,
            };
            run_organize(config, &output, &source, &target, dry_run, recursive)
        }
        Commands::Undo { batch_id, check } => run_undo(config, &output, batch_id, check),
        Commands::History { limit } => run_history(config, &output, limit),
        Commands::Duplicates {
            dirs,
            similar,
            no_recurse,
            delete,
            dry_run,
        } => run_duplicates(config, &output, &dirs, similar, !no_recurse, delete, dry_run),
        Commands::Backups {
            cleanup,
            restore,
            to,
        } => run_backups(config, &output, cleanup, restore, to),
        Commands::Rules {
            command: RulesCommand::Check { file, path },
        } => run_rules_check(&output, &file, &path),
    }
}

/// Where results go: styled text, or JSON when `--json` is set
struct Output {
    term: Term,
    json: bool,
    verbose: bool,
}

impl Output {
    fn new(json: bool, verbose: bool) -> Self {
        Self {
            term: Term::stdout(),
            json,
            verbose,
        }
    }

    fn line(&self, text: impl AsRef<str>) {
        if !self.json {
            self.term.write_line(text.as_ref()).ok();
        }
    }

    fn blank(&self) {
        self.line("");
    }

    fn header(&self, title: &str) {
        self.line(format!(
            "{} {}",
            style(title).bold().cyan(),
            style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim()
        ));
        self.blank();
    }

    fn emit_json<T: Serialize>(&self, value: &T) {
        if self.json {
            match serde_json::to_string_pretty(value) {
                Ok(text) => println!("{}", text),
                Err(e) => eprintln!("Failed to serialize output: {}", e),
            }
        }
    }
}

fn run_plan(
    config: OrganizerConfig,
    output: &Output,
    source: &Path,
    target: &Path,
    classifications: Option<&Path>,
    recursive: bool,
) -> Result<()> {
    output.header("File Organizer");
    let organizer = Organizer::new(config)?;

    let plan = match classifications {
        Some(path) => {
            let files = organizer.collect_files(source, recursive)?;
            let classifications = read_classifications(path)?;
            let mut plan = organizer.create_plan(&files, &classifications, target);
            plan.source_dir = source.to_path_buf();
            plan
        }
        None => organizer.plan_directory(source, target, recursive)?,
    };

    let issues = organizer.validate_plan(&plan);
    let plan = organizer.resolve_conflicts(plan);

    if output.json {
        let issues: Vec<String> = issues.iter().map(ToString::to_string).collect();
        output.emit_json(&serde_json::json!({
            "plan": plan,
            "issues": issues,
        }));
        return Ok(());
    }

    print_plan(output, &plan);
    print_issues(output, &issues);
    Ok(())
}

fn read_classifications(path: &Path) -> Result<Vec<Classification>> {
    let unreadable = |reason: String| PlanError::Classifications {
        path: path.to_path_buf(),
        reason,
    };
    let text = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
    let classifications = serde_json::from_str(&text).map_err(|e| unreadable(e.to_string()))?;
    Ok(classifications)
}

fn run_organize(
    config: OrganizerConfig,
    output: &Output,
    source: &Path,
    target: &Path,
    dry_run: bool,
    recursive: bool,
) -> Result<()> {
    output.header("File Organizer");

    let (sender, receiver) = EventChannel::new();
    let progress = progress_bar(output);
    let event_thread = spawn_progress(receiver, progress.clone(), output.verbose);

    let result = {
        // The organizer holds senders; dropping it lets the event thread finish
        let organizer = Organizer::new(config)?.with_events(sender);
        let plan = organizer.plan_directory(source, target, recursive)?;
        let plan = organizer.resolve_conflicts(plan);

        if plan.is_empty() {
            output.line(format!(
                "  {} No rule matched any of {} files",
                style("ℹ").blue(),
                plan.total_files
            ));
        }
        if !output.json && (dry_run || output.verbose) {
            print_plan(output, &plan);
        }

        organizer.execute_plan(&plan, dry_run)
    };

    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    if output.json {
        output.emit_json(&result);
    } else {
        print_execution(output, &result);
    }
    Ok(())
}

fn run_undo(
    config: OrganizerConfig,
    output: &Output,
    batch_id: Option<String>,
    check: bool,
) -> Result<()> {
    let (sender, receiver) = EventChannel::new();
    let verbose = output.verbose && !output.json;
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            if let Event::Undo(UndoEvent::Reverted { source, target }) = event {
                if verbose {
                    eprintln!("  {} → {}", target.display(), source.display());
                }
            }
        }
    });

    let outcome = (|| -> Result<UndoOutcome> {
        let organizer = Organizer::new(config)?.with_events(sender);

        if check {
            let batch_id = match batch_id {
                Some(id) => id,
                None => organizer
                    .history(1)?
                    .into_iter()
                    .next()
                    .map(|b| b.batch_id)
                    .ok_or(UndoError::NothingToUndo)?,
            };
            let (possible, problems) = organizer.verify_undo_possible(&batch_id)?;
            return Ok(UndoOutcome::Check {
                batch_id,
                possible,
                problems,
            });
        }

        let result = match batch_id {
            Some(id) => organizer.undo_batch(&id)?,
            None => organizer.undo_last()?,
        };
        Ok(UndoOutcome::Undone(result))
    })();

    event_thread.join().ok();

    match outcome? {
        UndoOutcome::Check {
            batch_id,
            possible,
            problems,
        } => {
            if output.json {
                output.emit_json(&serde_json::json!({
                    "batch_id": batch_id,
                    "possible": possible,
                    "problems": problems,
                }));
            } else if possible {
                output.line(format!(
                    "{} Batch {} can be undone",
                    style("✓").green().bold(),
                    style(&batch_id).cyan()
                ));
            } else {
                output.line(format!(
                    "{} Batch {} cannot be fully undone:",
                    style("✗").red().bold(),
                    style(&batch_id).cyan()
                ));
                for problem in &problems {
                    output.line(format!("    {}", problem));
                }
            }
        }
        UndoOutcome::Undone(result) => {
            if output.json {
                output.emit_json(&result);
            } else {
                print_undo(output, &result);
            }
        }
    }
    Ok(())
}

enum UndoOutcome {
    Check {
        batch_id: String,
        possible: bool,
        problems: Vec<String>,
    },
    Undone(UndoResult),
}

fn run_history(config: OrganizerConfig, output: &Output, limit: usize) -> Result<()> {
    let organizer = Organizer::new(config)?;
    let history = organizer.history(limit)?;

    if output.json {
        output.emit_json(&history);
        return Ok(());
    }

    if history.is_empty() {
        output.line(format!("  {} No batches recorded yet", style("ℹ").blue()));
        return Ok(());
    }

    output.line(format!("{}", style("Recent batches:").bold().underlined()));
    output.blank();
    for batch in &history {
        let status = if batch.is_fully_undone() {
            style("undone".to_string()).dim()
        } else if batch.undone_count > 0 {
            style(format!("{} pending", batch.pending_count())).yellow()
        } else {
            style("active".to_string()).green()
        };
        output.line(format!(
            "  {}  {}  {} ops  {}",
            style(&batch.batch_id).cyan(),
            format_timestamp(batch.started_at),
            batch.operation_count,
            status
        ));
    }
    Ok(())
}

fn run_duplicates(
    config: OrganizerConfig,
    output: &Output,
    dirs: &[PathBuf],
    similar: bool,
    recursive: bool,
    delete: bool,
    dry_run: bool,
) -> Result<()> {
    output.header("File Organizer");

    let (sender, receiver) = EventChannel::new();
    let progress = progress_bar(output);
    let event_thread = spawn_progress(receiver, progress.clone(), output.verbose);

    let scanned = (|| -> Result<_> {
        let organizer = Organizer::new(config)?.with_events(sender);
        let result = organizer.find_duplicates_in_dirs(dirs, recursive, true, similar)?;
        let report = delete.then(|| {
            organizer
                .duplicates()
                .delete_all_but_one(&result.exact_duplicates, dry_run)
        });
        Ok((result, report))
    })();

    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let (result, report) = scanned?;

    if output.json {
        output.emit_json(&serde_json::json!({
            "result": result,
            "deletion": report,
        }));
        return Ok(());
    }

    print_duplicates(output, &result);

    if let Some(report) = report {
        let verb = if report.dry_run { "Would delete" } else { "Deleted" };
        output.line(format!(
            "{} {} {} files, {} freed",
            style("✓").green().bold(),
            verb,
            style(report.deleted.len()).cyan(),
            style(format_bytes(report.bytes_freed)).yellow()
        ));
        for error in &report.errors {
            output.line(format!("  {} {}", style("✗").red(), error));
        }
    } else {
        output.line(format!(
            "{}",
            style("No files were deleted. Review carefully before taking action.").dim()
        ));
    }
    Ok(())
}

fn run_backups(
    config: OrganizerConfig,
    output: &Output,
    cleanup: Option<u32>,
    restore: Option<String>,
    to: Option<PathBuf>,
) -> Result<()> {
    let organizer = Organizer::new(config)?;

    if let Some(days) = cleanup {
        let removed = organizer.backups().cleanup_old_backups(days)?;
        output.emit_json(&serde_json::json!({ "removed": removed }));
        output.line(format!(
            "{} Removed {} backups older than {} days",
            style("✓").green().bold(),
            style(removed).cyan(),
            days
        ));
        return Ok(());
    }

    if let (Some(name), Some(to)) = (restore, to) {
        let backup_dir = organizer.backups().root().join(&name);
        let restored = organizer.backups().restore_backup(&backup_dir, &to)?;
        output.emit_json(&serde_json::json!({ "restored": restored, "backup": name }));
        output.line(format!(
            "{} Restored {} files from {} into {}",
            style("✓").green().bold(),
            style(restored).cyan(),
            name,
            to.display()
        ));
        return Ok(());
    }

    let backups = organizer.list_backups()?;
    if output.json {
        output.emit_json(&backups);
        return Ok(());
    }

    if backups.is_empty() {
        output.line(format!("  {} No backups found", style("ℹ").blue()));
        return Ok(());
    }

    output.line(format!("{}", style("Backups:").bold().underlined()));
    output.blank();
    for backup in &backups {
        output.line(format!(
            "  {}  {} files  {}  {} days old",
            style(&backup.name).cyan(),
            backup.file_count,
            format_bytes(backup.total_bytes),
            backup.age_days
        ));
    }
    Ok(())
}

fn run_rules_check(output: &Output, file: &Path, paths: &[PathBuf]) -> Result<()> {
    let rules = RuleStore::load(file)?;

    let problems: Vec<(String, String)> = rules
        .iter()
        .filter_map(|rule| rule.validate().err().map(|e| (rule.name.clone(), e.to_string())))
        .collect();

    let evaluations = if problems.is_empty() && !paths.is_empty() {
        RuleMatcher::new(rules.clone())?.evaluate_all(paths)
    } else {
        Vec::new()
    };

    if output.json {
        output.emit_json(&serde_json::json!({
            "rules": rules.len(),
            "problems": problems
                .iter()
                .map(|(rule, error)| serde_json::json!({ "rule": rule, "error": error }))
                .collect::<Vec<_>>(),
            "evaluations": evaluations
                .iter()
                .map(|(path, result)| serde_json::json!({ "path": path, "result": result }))
                .collect::<Vec<_>>(),
        }));
        return Ok(());
    }

    if problems.is_empty() {
        output.line(format!(
            "{} {} rules are valid",
            style("✓").green().bold(),
            style(rules.len()).cyan()
        ));
    } else {
        output.line(format!(
            "{} {} of {} rules have problems:",
            style("✗").red().bold(),
            problems.len(),
            rules.len()
        ));
        for (rule, error) in &problems {
            output.line(format!("  {} {}", style(rule).bold(), error));
        }
    }

    for (path, result) in &evaluations {
        let verdict = match (&result.target_category, result.matched) {
            (Some(category), true) => style(format!("→ {}", category)).green(),
            _ => style("no match".to_string()).dim(),
        };
        output.line(format!("  {} {}", path.display(), verdict));
        if output.verbose && result.matched {
            output.line(format!("    {}", style(&result.reasoning).dim()));
        }
    }
    Ok(())
}

fn progress_bar(output: &Output) -> Option<ProgressBar> {
    if output.json {
        return None;
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    Some(pb)
}

/// Drive the progress bar from execution and scan events until every sender is gone
fn spawn_progress(
    receiver: EventReceiver,
    progress: Option<ProgressBar>,
    verbose: bool,
) -> thread::JoinHandle<()> {
    use file_organizer::events::DuplicateEvent;

    thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress else { continue };
            match event {
                Event::Execute(ExecuteEvent::Started { total, .. }) => {
                    pb.set_length(total as u64);
                    pb.set_message("organizing");
                }
                Event::Execute(ExecuteEvent::Progress {
                    index,
                    total,
                    current,
                }) => {
                    pb.set_length(total as u64);
                    pb.set_position(index as u64);
                    if verbose {
                        pb.set_message(current);
                    }
                }
                Event::Execute(ExecuteEvent::OperationFailed { source, message }) => {
                    pb.println(format!(
                        "  {} {}: {}",
                        style("✗").red(),
                        source.display(),
                        message
                    ));
                }
                Event::Duplicate(DuplicateEvent::Started { total_files }) => {
                    pb.set_length(total_files as u64);
                    pb.set_message("hashing");
                }
                Event::Duplicate(DuplicateEvent::Hashed {
                    completed, path, ..
                }) => {
                    pb.set_position(completed as u64);
                    if verbose {
                        pb.set_message(
                            path.file_name()
                                .unwrap_or_default()
                                .to_string_lossy()
                                .into_owned(),
                        );
                    }
                }
                Event::Execute(ExecuteEvent::Completed { .. })
                | Event::Duplicate(DuplicateEvent::Completed { .. }) => pb.finish_and_clear(),
                _ => {}
            }
        }
    })
}

fn print_plan(output: &Output, plan: &OrganizationPlan) {
    output.line(format!(
        "{} {} ({} of {} files)",
        style("Plan").bold().underlined(),
        style(&plan.batch_id).dim(),
        style(plan.planned_files).cyan(),
        plan.total_files
    ));
    output.blank();

    for op in &plan.operations {
        output.line(format!(
            "  {} {} → {}",
            style(format!("[{}]", op.kind)).yellow(),
            display_path(&op.source),
            display_path(&op.destination)
        ));
        if output.verbose && !op.reasoning.is_empty() {
            output.line(format!(
                "      {} ({:.0}%)",
                style(&op.reasoning).dim(),
                op.confidence * 100.0
            ));
        }
    }
    output.blank();
}

fn print_issues(output: &Output, issues: &[ValidationIssue]) {
    if issues.is_empty() {
        output.line(format!("{} Plan is valid", style("✓").green().bold()));
        return;
    }
    output.line(format!(
        "{} {} problems found:",
        style("✗").red().bold(),
        issues.len()
    ));
    for issue in issues {
        output.line(format!("  {} {}", style("•").red(), issue));
    }
}

fn print_execution(output: &Output, result: &ExecutionResult) {
    let (mark, title) = match (result.success, result.dry_run) {
        (true, true) => (style("✓").green().bold(), "Dry Run Complete"),
        (true, false) => (style("✓").green().bold(), "Organize Complete"),
        (false, _) if result.cancelled => (style("!").yellow().bold(), "Organize Cancelled"),
        (false, _) => (style("✗").red().bold(), "Organize Finished With Errors"),
    };
    output.line(format!("{} {}", mark, title));
    output.blank();
    output.line(format!(
        "  {} operations completed in {:.1}s",
        style(result.operations_completed).cyan(),
        result.duration_ms as f64 / 1000.0
    ));
    if result.operations_failed > 0 {
        output.line(format!(
            "  {} operations failed",
            style(result.operations_failed).red()
        ));
    }
    if let Some(ref backup) = result.backup_path {
        output.line(format!("  Backup: {}", style(display_path(backup)).dim()));
    }
    if !result.dry_run && result.operations_completed > 0 {
        output.line(format!(
            "  Undo with: {}",
            style(format!("file-organize undo {}", result.batch_id)).bold()
        ));
    }
    for error in &result.errors {
        output.line(format!("  {} {}", style("✗").red(), error));
    }
}

fn print_undo(output: &Output, result: &UndoResult) {
    let mark = if result.success {
        style("✓").green().bold()
    } else {
        style("✗").red().bold()
    };
    output.line(format!(
        "{} Undid {} operations from batch {}",
        mark,
        style(result.operations_undone).cyan(),
        style(&result.batch_id).dim()
    ));
    if result.operations_failed > 0 {
        output.line(format!(
            "  {} operations could not be undone",
            style(result.operations_failed).red()
        ));
    }
    for error in &result.errors {
        output.line(format!("  {} {}", style("✗").red(), error));
    }
}

fn print_duplicates(output: &Output, result: &DuplicateDetectionResult) {
    output.line(format!("{} Scan Complete", style("✓").green().bold()));
    output.blank();
    output.line(format!(
        "  {} files scanned in {:.1}s",
        style(result.files_scanned).cyan(),
        result.duration_ms as f64 / 1000.0
    ));
    output.line(format!(
        "  {} duplicate files",
        style(result.total_duplicates()).cyan()
    ));
    output.line(format!(
        "  {} potential space savings",
        style(format_bytes(result.wasted_space())).yellow()
    ));
    output.blank();

    if result.exact_duplicates.is_empty() && result.similar_images.is_empty() {
        output.line(format!("  {} No duplicates found!", style("🎉").green()));
        output.blank();
        return;
    }

    let groups = result
        .exact_duplicates
        .iter()
        .chain(result.similar_images.iter());
    for (i, group) in groups.enumerate() {
        print_group(output, i + 1, group);
    }

    if output.verbose {
        for error in &result.errors {
            output.line(format!("  {} {}", style("!").yellow(), error));
        }
    }
}

fn print_group(output: &Output, number: usize, group: &DuplicateGroup) {
    let label = match group.similarity {
        Some(similarity) => format!("similar {:.0}%", similarity * 100.0),
        None => "exact".to_string(),
    };
    output.line(format!(
        "  {} {} ({} files, {})",
        style(format!("Group {}:", number)).bold(),
        style(label).yellow(),
        group.files.len(),
        format_bytes(group.wasted_bytes())
    ));
    for (idx, file) in group.files.iter().enumerate() {
        let marker = if idx == 0 {
            style("★").green().to_string()
        } else {
            style("○").dim().to_string()
        };
        output.line(format!("    {} {}", marker, display_path(file)));
    }
    output.blank();
}

fn display_path(path: &Path) -> String {
    let home = dirs::home_dir().unwrap_or_default();
    match path.strip_prefix(&home) {
        Ok(rest) if !home.as_os_str().is_empty() => format!("~/{}", rest.display()),
        _ => path.display().to_string(),
    }
}

fn format_timestamp(epoch_seconds: f64) -> String {
    chrono::DateTime::from_timestamp(epoch_seconds as i64, 0)
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
