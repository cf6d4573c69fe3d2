//! # cs-cli
//!
//! `claude-setup`: compile and reconcile the coding assistant's permission
//! policy for a project.
//!
//! A run detects the existing setup, plans the actions it needs, and carries
//! them out:
//! - fresh project → full setup (settings, command templates, project note, docs)
//! - stale settings → backup, recompile, merge user fields, validate, write
//! - `--docs-only` / `--commands-only` / `--settings-only` → that step alone
//!
//! Project languages and frameworks come from `--profile FILE` (written by
//! the project analyzer) and/or `--language` / `--framework`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cs_policy::{PolicyCompiler, PolicyDocument, ProjectProfile};
use cs_setup::{
    load_profile_or_default, plan, Action, DetectionPolicy, Executor, ExistingSetupState,
    RunOptions, SetupConfig, SetupContext, StubDocumentation,
};

/// Claude Setup: compile and reconcile assistant permission policies.
#[derive(Parser, Debug)]
#[command(name = "claude-setup", version, about)]
struct Cli {
    /// Analyze and print the plan without making changes.
    #[arg(short = 'd', long)]
    dry_run: bool,
    /// Skip confirmation prompts (runs never prompt; kept for compatibility).
    #[arg(short = 'y', long)]
    yes: bool,
    /// Minimal output (only errors and warnings).
    #[arg(short = 'q', long)]
    quiet: bool,
    /// Detailed output with debug information.
    #[arg(short = 'v', long)]
    verbose: bool,
    /// Only fetch documentation.
    #[arg(long)]
    docs_only: bool,
    /// Skip documentation fetching.
    #[arg(long)]
    no_docs: bool,
    /// Only update command templates.
    #[arg(long)]
    commands_only: bool,
    /// Only regenerate the settings file.
    #[arg(long)]
    settings_only: bool,
    /// Reconcile the existing setup even if it is current.
    #[arg(long)]
    update: bool,
    /// Start fresh (removes the existing setup; backups are kept).
    #[arg(long)]
    reset: bool,
    /// Only include read-only permissions.
    #[arg(long)]
    safe_only: bool,
    /// Allow reversible, path-scoped destructive operations.
    #[arg(long)]
    include_destructive: bool,
    /// Force specific frameworks (comma-separated).
    #[arg(long, value_delimiter = ',')]
    framework: Vec<String>,
    /// Force specific languages (comma-separated).
    #[arg(long, value_delimiter = ',')]
    language: Vec<String>,
    /// Project directory (defaults to the current directory).
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Setup config file (TOML or JSON).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Development mode with debug logging.
    #[arg(long)]
    dev: bool,
    /// Project profile produced by the analyzer (JSON or YAML).
    #[arg(long)]
    profile: Option<PathBuf>,
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            dry_run: self.dry_run,
            yes: self.yes,
            quiet: self.quiet,
            verbose: self.verbose,
            docs_only: self.docs_only,
            no_docs: self.no_docs,
            commands_only: self.commands_only,
            settings_only: self.settings_only,
            update: self.update,
            reset: self.reset,
            safe_only: self.safe_only,
            include_destructive: self.include_destructive,
            framework: self.framework.clone(),
            language: self.language.clone(),
            output_dir: self.output_dir.clone(),
            config: self.config.clone(),
            dev: self.dev,
        }
    }

    fn log_level(&self) -> &'static str {
        if self.verbose || self.dev {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

/// What `--dry-run` prints to stdout.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DryRunReport<'a> {
    project_root: &'a Path,
    profile: &'a ProjectProfile,
    existing: &'a ExistingSetupState,
    status: String,
    actions: &'a [Action],
    document: PolicyDocument,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so dry-run JSON on stdout stays parseable.
    // RUST_LOG, when set, wins over the flags.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(cli.dev)
        .init();

    let config = match &cli.config {
        Some(path) => SetupConfig::load_or_default(path),
        None => SetupConfig::default(),
    };
    let options = cli.run_options().merged_over(&config.options);

    let root = options
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let root = root.canonicalize().unwrap_or(root);

    let profile = match &cli.profile {
        Some(path) => load_profile_or_default(path),
        None => {
            tracing::debug!("no --profile given, starting from an empty profile");
            ProjectProfile::default()
        }
    };
    let profile = options.apply_overrides(profile);

    let compiler = PolicyCompiler::with_builtin_registry(config.target_version.clone())
        .context("failed to build capability registry")?;
    let paths = config.layout.resolve(&root);
    let policy = DetectionPolicy::new(config.target_version.clone())
        .with_note_max_age_days(config.note_max_age_days);
    let existing = ExistingSetupState::detect(&paths, &policy).apply_reset(options.reset);
    tracing::info!(
        root = %root.display(),
        status = %existing.status(),
        "existing setup detected"
    );

    let actions = plan(&existing, &profile, &options);

    if options.dry_run {
        let document = compiler
            .compile(&profile, &options.compiler_options())
            .context("policy compilation failed")?;
        let report = DryRunReport {
            project_root: &root,
            profile: &profile,
            existing: &existing,
            status: existing.status().to_string(),
            actions: &actions,
            document,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if actions.is_empty() {
        tracing::info!("project is already configured, nothing to do");
        return Ok(());
    }

    let docs = StubDocumentation::new();
    let executor = Executor::new(SetupContext {
        paths,
        profile: &profile,
        options: &options,
        config: &config,
        compiler: &compiler,
        docs: &docs,
    });
    let report = executor
        .run(&actions, existing.status())
        .context("setup failed")?;

    if !options.dry_run {
        for backup in &report.backups {
            tracing::info!(backup = %backup.display(), "previous settings backed up");
        }
        tracing::info!(
            actions = report.completed.len(),
            files = report.written.len(),
            status = %report.status,
            "setup complete"
        );
    }
    Ok(())
}
