// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Culler: review and classify per-user image folders

use chrono::Local;
use clap::{Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::{error, info, warn};

use culler::analysis::analyze_history;
use culler::annotations::{AnnotationSource, JsonAnnotations, NoAnnotations};
use culler::config::AppConfig;
use culler::enumerator::FolderEnumerator;
use culler::finalize::{FinalizeEngine, FinalizeOutcome, Persistence};
use culler::history::HistoryIndex;
use culler::navigator::{AdvancePolicy, Prompt, Reply, ReviewNavigator, StayReason, Step};
use culler::period::{latest_period, previous_week_key, PeriodLayout};
use culler::progress::{spawn_progress_scan, ScanProgress};
use culler::report::ReportGenerator;
use culler::resume::ResumeMarker;
use culler::session::{Position, ReviewSession};
use culler::store::ClassificationStore;
use culler::{CullerError, Result};

/// Culler CLI - image folder review and classification
#[derive(Parser, Debug)]
#[command(name = "culler")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "0.3.0")]
#[command(about = "Review per-user image folders and record classifications", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "culler.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Review user folders interactively
    Review {
        /// Folder holding one sub-folder per user (default: last used, then
        /// the latest period's data folder)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// What to do when leaving a user with nothing marked
        #[arg(long, value_parser = ["confirm", "silent"])]
        policy: Option<String>,
    },

    /// Show a user's classifications in earlier periods
    History {
        /// User id to look up
        user_id: String,

        /// Maximum number of periods to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Period to leave out (normally the one under review)
        #[arg(short, long)]
        period: Option<String>,
    },

    /// Per-period classification statistics
    Analyze,

    /// Show review progress of a period
    Status {
        /// Period key (default: latest)
        #[arg(short, long)]
        period: Option<String>,
    },

    /// Export a period's classifications to JSON
    Export {
        /// Output file
        output: PathBuf,

        /// Period key (default: latest)
        #[arg(short, long)]
        period: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Create a review period and a default configuration
    Init {
        /// Directory to initialize (default: current)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Period key (default: last Monday-to-Sunday week)
        #[arg(short, long)]
        period: Option<String>,

        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "culler.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    // The log file is configurable, so the config is read before logging
    // starts and its errors are reported afterwards
    let config = AppConfig::load(&cli.config);
    let log_file = config.as_ref().ok().and_then(|c| c.logging.file.clone());
    init_tracing(filter, log_file.as_deref())?;
    let config = config?;

    match cli.command {
        Some(Commands::Review { root, policy }) => run_review(config, root, policy).await,
        Some(Commands::History { user_id, limit, period }) => run_history(config, &user_id, limit, period),
        Some(Commands::Analyze) => run_analyze(config),
        Some(Commands::Status { period }) => run_status(config, period),
        Some(Commands::Export { output, period }) => run_export(config, &output, period),
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config),
        Some(Commands::Init { dir, period, force }) => run_init(dir, period, force),
        None => run_review(config, None, None).await,
    }
}

fn init_tracing(filter: &str, file: Option<&str>) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}

/// Layout of `period`, or of the latest period under the history folder
fn select_period(config: &AppConfig, period: Option<String>) -> Option<PeriodLayout> {
    let history_dir = config.history_path();
    match period {
        Some(key) => Some(PeriodLayout::new(&history_dir.join(key), &config.review)),
        None => latest_period(&history_dir, &config.review),
    }
}

/// Run an interactive review
async fn run_review(config: AppConfig, root: Option<PathBuf>, policy: Option<String>) -> Result<()> {
    let settings_path = config.settings_path();
    let history_dir = config.history_path();

    let root = match root {
        Some(root) => root,
        None => ResumeMarker::load(&settings_path)
            .existing_folder()
            .map(Path::to_path_buf)
            .or_else(|| latest_period(&history_dir, &config.review).map(|l| l.data_dir))
            .ok_or_else(|| CullerError::RootNotFound(history_dir.clone()))?,
    };

    let layout = PeriodLayout::for_root(&root, &config.review)?;
    info!("Review root: {:?} (period {})", root, layout.key);

    let marker = ResumeMarker { last_folder: Some(root.clone()) };
    if let Err(e) = marker.save(&settings_path) {
        warn!("Failed to save resume marker {:?}: {}", settings_path, e);
    }

    let store = ClassificationStore::load(&layout.store_path);
    let queue = FolderEnumerator::new(&root)
        .reserve(&config.review.archive_dir_name)
        .enumerate(&store)?;

    if queue.is_empty() {
        println!("Nothing to review in {:?}", root);
        return Ok(());
    }
    info!("{} users to review", queue.len());

    let policy = match policy.as_deref() {
        Some("silent") => AdvancePolicy::Silent,
        Some(_) => AdvancePolicy::Confirm,
        None => config.review.advance_policy,
    };

    let annotations: Box<dyn AnnotationSource> = match &config.annotations {
        Some(path) => Box::new(JsonAnnotations::load(Path::new(path))),
        None => Box::new(NoAnnotations),
    };

    let engine = FinalizeEngine::new(store, layout.clone(), Box::new(config.review.date_rule));
    let reviewer = Reviewer {
        navigator: ReviewNavigator::new(policy, config.review.labels.clone(), engine),
        session: ReviewSession::new(&root, queue, config.review.image_extensions.clone()),
        history: HistoryIndex::open(&history_dir, Some(layout.key.as_str())),
        history_limit: config.history.display_limit,
        annotations,
        progress: spawn_progress_scan(root.clone(), config.review.image_extensions.clone()),
        shown_user: None,
    };

    // dialoguer blocks on the terminal
    let (mut reviewer, outcome) = tokio::task::spawn_blocking(move || {
        let mut reviewer = reviewer;
        let outcome = reviewer.run();
        (reviewer, outcome)
    })
    .await?;

    let store = reviewer.navigator.engine_mut().store_mut();
    if !store.unsaved().is_empty() {
        match store.flush_unsaved() {
            Ok(written) => info!("Wrote {} pending classifications", written),
            Err(e) => error!(
                "{} classifications could not be saved to {:?}: {}",
                store.unsaved().len(),
                store.path(),
                e
            ),
        }
    }

    if !outcome? {
        println!("Review stopped. Run the review again to continue where you left off.");
        return Ok(());
    }

    let generator = ReportGenerator::new(
        config.review.labels.clone(),
        config.report.format,
        config.report.file_prefix.clone(),
    );
    let report = generator.generate(&reviewer.session);
    println!("\n{}", report.render_text());
    if let Some(path) = generator.write(&report, &layout.dir) {
        println!("Report saved to {:?}", path);
    }

    Ok(())
}

/// Terminal front end for one review session
struct Reviewer {
    navigator: ReviewNavigator,
    session: ReviewSession,
    history: HistoryIndex,
    history_limit: usize,
    annotations: Box<dyn AnnotationSource>,
    progress: watch::Receiver<ScanProgress>,
    shown_user: Option<String>,
}

impl Reviewer {
    /// Drive the navigator until the queue is done (`true`) or the reviewer
    /// quits (`false`)
    fn run(&mut self) -> Result<bool> {
        let mut step = self.navigator.begin(&mut self.session);

        loop {
            step = match step {
                Step::Moved { position, finalized, skipped } => {
                    self.show_leaving(finalized.as_ref(), &skipped);
                    self.show_position(&position);
                    match self.next_command()? {
                        Some(step) => step,
                        None => return Ok(false),
                    }
                }
                Step::Prompt(prompt) => {
                    let reply = ask(&prompt)?;
                    match self.navigator.resolve(&mut self.session, reply) {
                        Ok(step) => step,
                        Err(e) => {
                            warn!("{}", e);
                            Step::Prompt(prompt)
                        }
                    }
                }
                Step::Stayed(reason) => {
                    println!("{}", stay_message(reason));
                    if let Some(position) = self.session.position() {
                        self.show_position(&position);
                    }
                    match self.next_command()? {
                        Some(step) => step,
                        None => return Ok(false),
                    }
                }
                Step::Complete { finalized, skipped } => {
                    self.show_leaving(finalized.as_ref(), &skipped);
                    return Ok(true);
                }
            };
        }
    }

    fn next_command(&mut self) -> Result<Option<Step>> {
        loop {
            let input: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt("[n]ext [p]rev [t]oggle [u]ser [q]uit")
                .default("n".to_string())
                .interact_text()?;

            let step = match input.trim() {
                "n" => self.navigator.advance_image(&mut self.session),
                "p" => self.navigator.retreat_image(&mut self.session),
                "u" => self.navigator.advance_user(&mut self.session),
                "t" => {
                    match self.navigator.toggle_current(&mut self.session) {
                        Ok(marked) => println!(
                            "  {} ({} marked)",
                            if marked { "Marked as problem" } else { "Unmarked" },
                            self.session.totals().marked
                        ),
                        Err(e) => warn!("{}", e),
                    }
                    continue;
                }
                "q" => return Ok(None),
                other => {
                    println!("Unknown command: {}", other);
                    continue;
                }
            };
            return Ok(Some(step));
        }
    }

    fn show_position(&mut self, position: &Position) {
        if self.shown_user.as_deref() != Some(position.user_id.as_str()) {
            println!();
            println!("User {}/{}: {}", position.user_index + 1, position.user_count, position.user_id);
            match self.history.summary(&position.user_id, self.history_limit) {
                Some(summary) => println!("  History: {}", summary),
                None => println!("  History: none"),
            }
            let progress = *self.progress.borrow();
            if progress.done {
                println!("  Images left under root: {}", progress.images);
            } else {
                println!("  Counting files... {:.0}%", progress.percent());
            }
            self.shown_user = Some(position.user_id.clone());
        }

        let path = self.session.root().join(&position.user_id).join(&position.image);
        let mark = if position.is_problem { " [PROBLEM]" } else { "" };
        println!("  [{}/{}] {}{}", position.image_index + 1, position.image_count, path.display(), mark);
        if let Some(annotation) = self.annotations.annotate(&position.user_id, &position.image) {
            println!("    {}", annotation);
        }
    }

    fn show_leaving(&self, finalized: Option<&FinalizeOutcome>, skipped: &[String]) {
        for user in skipped {
            println!("Skipped {} (folder gone or empty)", user);
        }
        let Some(outcome) = finalized else {
            return;
        };

        let label = outcome
            .label
            .as_deref()
            .map(|l| format!(", classified {}", l))
            .unwrap_or_default();
        println!(
            "{}: {} deleted, {} archived{}",
            outcome.user_id,
            outcome.deleted.len(),
            outcome.moved.len(),
            label
        );
        for failure in &outcome.failures {
            println!("  ! {:?} {}: {}", failure.action, failure.path.display(), failure.error);
        }
        if let Persistence::Failed(e) = &outcome.persistence {
            println!("  ! classification kept in memory only: {}", e);
        }
    }
}

fn ask(prompt: &Prompt) -> Result<Reply> {
    let theme = ColorfulTheme::default();
    let reply = match prompt {
        Prompt::ConfirmNoProblem { user_id } => {
            let yes = Confirm::with_theme(&theme)
                .with_prompt(format!("No problem images marked for {}. Delete all its images?", user_id))
                .default(true)
                .interact()?;
            if yes { Reply::Yes } else { Reply::No }
        }
        Prompt::ChooseLabel { user_id, problem_count, labels } => {
            let mut items = labels.clone();
            items.push("(stay)".to_string());
            let choice = Select::with_theme(&theme)
                .with_prompt(format!("{} problem image(s) for {}. Classification", problem_count, user_id))
                .items(&items)
                .default(0)
                .interact()?;
            labels.get(choice).map(|l| Reply::Label(l.clone())).unwrap_or(Reply::No)
        }
        Prompt::StaleFolder { user_id, missing, .. } => {
            let state = if *missing { "no longer exists" } else { "has no images left" };
            let yes = Confirm::with_theme(&theme)
                .with_prompt(format!("Folder of {} {}. Go back further?", user_id, state))
                .default(true)
                .interact()?;
            if yes { Reply::Yes } else { Reply::No }
        }
    };
    Ok(reply)
}

fn stay_message(reason: StayReason) -> &'static str {
    match reason {
        StayReason::Declined => "Staying here",
        StayReason::AtStart => "Already at the first image",
        StayReason::NoEarlierFolder => "No earlier folder with images",
    }
}

/// Show prior-period classifications of one user
fn run_history(config: AppConfig, user_id: &str, limit: Option<usize>, period: Option<String>) -> Result<()> {
    let index = HistoryIndex::open(&config.history_path(), period.as_deref());
    let limit = limit.unwrap_or(config.history.display_limit);
    let entries = index.lookup(user_id);

    if entries.is_empty() {
        println!("No history for {}", user_id);
        return Ok(());
    }

    println!("History of {} ({} of {} periods):", user_id, entries.len().min(limit), entries.len());
    for entry in entries.iter().take(limit) {
        println!("  {} ({}): {}", entry.period_start(), entry.period_key, entry.classification);
    }

    Ok(())
}

/// Print per-period statistics
fn run_analyze(config: AppConfig) -> Result<()> {
    let stats = analyze_history(&config.history_path())?;
    if stats.is_empty() {
        println!("No classification stores under {:?}", config.history_path());
        return Ok(());
    }
    for period in &stats {
        print!("{}", period);
    }
    Ok(())
}

/// Run status check
fn run_status(config: AppConfig, period: Option<String>) -> Result<()> {
    let Some(layout) = select_period(&config, period) else {
        println!("No review periods under {:?}", config.history_path());
        return Ok(());
    };

    println!("Culler v0.3.0 Status");
    println!("====================");
    println!("Period: {}", layout.key);

    if !layout.data_dir.is_dir() {
        println!("Data folder: missing ({:?})", layout.data_dir);
        return Ok(());
    }
    println!("Data folder: {:?}", layout.data_dir);

    let store = ClassificationStore::load(&layout.store_path);
    let pending = FolderEnumerator::new(&layout.data_dir)
        .reserve(&config.review.archive_dir_name)
        .enumerate(&store)?;

    println!("  Classified users: {}", store.len());
    println!("  Pending folders: {}", pending.len());
    println!("  Review complete: {}", if pending.is_empty() { "yes" } else { "no" });

    Ok(())
}

/// Export a period's classifications
fn run_export(config: AppConfig, output: &Path, period: Option<String>) -> Result<()> {
    let layout = select_period(&config, period)
        .ok_or_else(|| CullerError::RootNotFound(config.history_path()))?;
    let store = ClassificationStore::load(&layout.store_path);
    let count = store.export(output)?;
    println!("Exported {} classifications of {} to {:?}", count, layout.key, output);
    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            println!("Configuration at {:?} is valid", config_path);
            println!("  History folder: {}", config.history_dir);
            println!("  Labels: {}", config.review.labels.join(", "));
            println!("  Date rule: {}", config.review.date_rule);
            println!("  Image extensions: {:?}", config.review.image_extensions);
        }
    }

    Ok(())
}

/// Initialize a review period
fn run_init(dir: Option<PathBuf>, period: Option<String>, force: bool) -> Result<()> {
    let target = dir.unwrap_or_else(|| PathBuf::from("."));
    let config_path = target.join("culler.json");

    if config_path.exists() && !force {
        return Err(CullerError::Config(
            "culler.json already exists. Use --force to overwrite".to_string(),
        ));
    }

    let mut config = AppConfig::default();
    let history_dir = target.join(&config.history_dir);
    let key = period.unwrap_or_else(|| previous_week_key(Local::now().date_naive()));
    let layout = PeriodLayout::new(&history_dir.join(&key), &config.review);

    std::fs::create_dir_all(&layout.data_dir)?;
    std::fs::create_dir_all(&layout.archive_dir)?;

    config.history_dir = history_dir.to_string_lossy().to_string();
    config.save(&config_path)?;

    println!("Culler initialized in {:?}", target);
    println!("\nCreated:");
    println!("  - culler.json");
    println!("  - {}/", layout.data_dir.display());
    println!("  - {}/", layout.archive_dir.display());
    println!("\nNext steps:");
    println!("  1. Copy user folders into {}", layout.data_dir.display());
    println!("  2. Start reviewing: culler review");

    Ok(())
}
