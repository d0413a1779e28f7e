//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use file_shredder::core::config::Config;
use file_shredder::core::errors::ShredError;
use file_shredder::core::paths::resolve_absolute_path;
use file_shredder::core::signals::register_os_signals;
use file_shredder::logger::dual::{ActivityLoggerHandle, spawn_logger};
#[cfg(feature = "sqlite")]
use file_shredder::logger::sqlite::SqliteLogger;
use file_shredder::shredder::pattern::FillMode;
use file_shredder::shredder::session::{ShredConfig, ShredOutcome, ShredReport, ShredSession};
use file_shredder::shredder::walker::SkipReason;

/// fshred: overwrite, rename and delete files beyond easy recovery.
#[derive(Debug, Parser)]
#[command(
    name = "fshred",
    author,
    version,
    about = "Secure file shredder",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Shred individual files.
    Files(FilesArgs),
    /// Shred every file under a directory.
    Dir(DirArgs),
    /// Inspect configuration.
    Config(ConfigArgs),
    /// Show recent shred activity from the SQLite log.
    #[cfg(feature = "sqlite")]
    History(HistoryArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
    /// Show version and optional build metadata.
    Version(VersionArgs),
}

/// Per-run overrides layered over the loaded config.
#[derive(Debug, Clone, Args, Default)]
struct ShredArgs {
    /// Overwrite pattern: zero, max or random.
    #[arg(long, value_name = "MODE")]
    fill: Option<FillMode>,
    /// Rename passes per file.
    #[arg(long, value_name = "N")]
    passes: Option<u32>,
    /// Skip rename obfuscation.
    #[arg(long)]
    no_rename: bool,
    /// Leave emptied subfolders in place.
    #[arg(long)]
    keep_folders: bool,
    /// Worker threads.
    #[arg(long, value_name = "N")]
    jobs: Option<usize>,
    /// List targets without touching them.
    #[arg(long)]
    dry_run: bool,
    /// Do not ask for confirmation.
    #[arg(short = 'y', long)]
    yes: bool,
}

#[derive(Debug, Clone, Args)]
struct FilesArgs {
    /// Files to shred.
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,
    #[command(flatten)]
    shred: ShredArgs,
}

#[derive(Debug, Clone, Args)]
struct DirArgs {
    /// Directory whose files are shredded. The directory itself is kept.
    #[arg(value_name = "ROOT")]
    root: PathBuf,
    #[command(flatten)]
    shred: ShredArgs,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config subcommand.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print the config file path.
    Path,
    /// Print the effective configuration.
    Show,
    /// Validate the configuration.
    Validate,
}

#[cfg(feature = "sqlite")]
#[derive(Debug, Clone, Args)]
struct HistoryArgs {
    /// Number of rows to show.
    #[arg(long, default_value_t = 20, value_name = "N")]
    limit: u32,
    /// Delete rows older than this many days first.
    #[arg(long, value_name = "DAYS")]
    prune: Option<u32>,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Args, Default)]
struct VersionArgs {
    /// Include build metadata.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input, or the user declined.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// Some targets were not shredded.
    #[error("{0}")]
    Partial(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
            Self::Partial(_) => 4,
        }
    }
}

impl From<ShredError> for CliError {
    fn from(error: ShredError) -> Self {
        match error {
            ShredError::InvalidConfig { .. }
            | ShredError::MissingConfig { .. }
            | ShredError::ConfigParse { .. }
            | ShredError::NotADirectory { .. }
            | ShredError::NotRegularFile { .. }
            | ShredError::NotFound { .. }
            | ShredError::PermissionDenied { .. } => Self::User(error.to_string()),
            ShredError::Runtime { .. } => Self::Internal(error.to_string()),
            _ => Self::Runtime(error.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Files(args) => run_files(cli, args),
        Command::Dir(args) => run_dir(cli, args),
        Command::Config(args) => run_config(cli, args),
        #[cfg(feature = "sqlite")]
        Command::History(args) => run_history(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
        Command::Version(args) => emit_version(cli, args),
    }
}

// ---------------------------------------------------------------------------
// Shredding
// ---------------------------------------------------------------------------

/// A target removed from the plan before the session started.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DroppedTarget {
    path: PathBuf,
    reason: String,
}

fn run_files(cli: &Cli, args: &FilesArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let shred_config = effective_shred_config(&config, &args.shred);

    let targets: Vec<PathBuf> = args.paths.iter().map(|p| resolve_absolute_path(p)).collect();
    let (accepted, dropped) = prevalidate_targets(&targets);
    let mode = output_mode(cli);
    if mode == OutputMode::Human && !cli.quiet {
        for target in &dropped {
            eprintln!(
                "{} {}: {}",
                "skipping".yellow(),
                target.path.display(),
                target.reason
            );
        }
    }
    if accepted.is_empty() {
        if mode == OutputMode::Json {
            write_json_line(&json!({
                "command": "files",
                "targets": 0,
                "dropped": dropped_json(&dropped),
            }))?;
        }
        return Err(CliError::User("no shreddable targets".to_string()));
    }

    let mut session = ShredSession::new(shred_config)?;
    session.add_files(&accepted)?;
    execute_session(cli, &config, "files", session, &args.shred, &dropped)
}

fn run_dir(cli: &Cli, args: &DirArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let shred_config = effective_shred_config(&config, &args.shred);

    let mut session = ShredSession::new(shred_config)?;
    session.collect_directory(&resolve_absolute_path(&args.root), true)?;
    execute_session(cli, &config, "dir", session, &args.shred, &[])
}

fn effective_shred_config(config: &Config, args: &ShredArgs) -> ShredConfig {
    let mut shred = config.shred_config();
    if let Some(fill) = args.fill {
        shred.fill_mode = Some(fill);
    }
    if let Some(passes) = args.passes {
        shred.rename_passes = passes;
    }
    if args.no_rename {
        shred.rename_enabled = false;
    }
    if args.keep_folders {
        shred.delete_container_folder = false;
    }
    if let Some(jobs) = args.jobs {
        shred.parallelism = jobs;
    }
    shred
}

/// Split `paths` into regular files we can read and write, and the rest.
fn prevalidate_targets(paths: &[PathBuf]) -> (Vec<PathBuf>, Vec<DroppedTarget>) {
    let mut accepted = Vec::with_capacity(paths.len());
    let mut dropped = Vec::new();
    for path in paths {
        match check_target(path) {
            Ok(()) => accepted.push(path.clone()),
            Err(reason) => dropped.push(DroppedTarget {
                path: path.clone(),
                reason,
            }),
        }
    }
    (accepted, dropped)
}

fn check_target(path: &Path) -> Result<(), String> {
    let meta = std::fs::symlink_metadata(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => "does not exist".to_string(),
        _ => format!("cannot stat: {e}"),
    })?;
    if meta.file_type().is_symlink() {
        return Err("is a symbolic link".to_string());
    }
    if !meta.is_file() {
        return Err("not a regular file".to_string());
    }
    check_access(path)
}

#[cfg(unix)]
fn check_access(path: &Path) -> Result<(), String> {
    use nix::unistd::{AccessFlags, access};
    access(path, AccessFlags::R_OK | AccessFlags::W_OK)
        .map_err(|errno| format!("not readable and writable: {}", errno.desc()))
}

#[cfg(not(unix))]
fn check_access(path: &Path) -> Result<(), String> {
    let meta = std::fs::metadata(path).map_err(|e| e.to_string())?;
    if meta.permissions().readonly() {
        return Err("read-only".to_string());
    }
    Ok(())
}

fn execute_session(
    cli: &Cli,
    config: &Config,
    command: &str,
    mut session: ShredSession,
    args: &ShredArgs,
    dropped: &[DroppedTarget],
) -> Result<(), CliError> {
    let mode = output_mode(cli);

    if args.dry_run {
        emit_dry_run(cli, mode, command, session.targets())?;
        session.abort()?;
        return Ok(());
    }

    // An empty plan changes nothing on disk, folders included.
    if session.targets().is_empty() {
        session.abort()?;
        match mode {
            OutputMode::Human => {
                if !cli.quiet {
                    println!("Nothing to shred.");
                }
            }
            OutputMode::Json => write_json_line(&json!({
                "command": command,
                "targets": 0,
                "succeeded": 0,
                "failed": 0,
                "folder_cleanup": Value::Null,
                "dropped": dropped_json(dropped),
            }))?,
        }
        return Ok(());
    }

    if !args.yes && !confirm_interactively(session.targets().len())? {
        session.abort()?;
        if mode == OutputMode::Human && !cli.quiet {
            println!("Aborted.");
        }
        return Err(CliError::User("aborted by user".to_string()));
    }

    if cli.verbose && mode == OutputMode::Human {
        eprintln!("[FSH-CLI] config hash {}", config.stable_hash()?);
    }
    let logger = start_logger(config);
    if let Some((handle, _)) = &logger {
        session = session.with_logger(handle.clone());
    }
    session = session.with_cancellation(register_os_signals());

    session.confirm()?;
    let result = session.run();
    stop_logger(logger);
    let report = result?;

    match mode {
        OutputMode::Human => print_report_human(cli, &report, dropped),
        OutputMode::Json => write_json_line(&report_json(command, &report, dropped))?,
    }

    if report.cancelled {
        return Err(CliError::Partial(format!(
            "cancelled: {} of {} targets shredded",
            report.succeeded(),
            report.outcomes.len()
        )));
    }
    if report.failed() > 0 || !dropped.is_empty() {
        return Err(CliError::Partial(format!(
            "{} target(s) not shredded",
            report.failed() + dropped.len()
        )));
    }
    Ok(())
}

fn confirm_interactively(count: usize) -> Result<bool, CliError> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Err(CliError::User(
            "refusing to shred without --yes when stdin is not a terminal".to_string(),
        ));
    }
    print!("Shred {count} file(s)? This cannot be undone. [y/N] ");
    io::stdout().flush()?;
    let mut input = String::new();
    stdin.read_line(&mut input)?;
    Ok(is_affirmative(&input))
}

fn is_affirmative(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

type LoggerParts = (ActivityLoggerHandle, JoinHandle<()>);

fn start_logger(config: &Config) -> Option<LoggerParts> {
    let logger_config = config.logger_config()?;
    match spawn_logger(logger_config) {
        Ok(parts) => Some(parts),
        Err(e) => {
            eprintln!("[FSH-CLI] activity log disabled: {e}");
            None
        }
    }
}

fn stop_logger(logger: Option<LoggerParts>) {
    if let Some((handle, join)) = logger {
        handle.shutdown();
        if join.join().is_err() {
            eprintln!("[FSH-CLI] logger thread panicked");
        }
    }
}

fn emit_dry_run(
    cli: &Cli,
    mode: OutputMode,
    command: &str,
    targets: &[PathBuf],
) -> Result<(), CliError> {
    match mode {
        OutputMode::Human => {
            if !cli.quiet {
                println!("Dry run: {} file(s) would be shredded.", targets.len());
                for target in targets {
                    println!("  {}", target.display());
                }
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": command,
                "dry_run": true,
                "targets": targets.iter().map(|p| p.to_string_lossy()).collect::<Vec<_>>(),
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn print_report_human(cli: &Cli, report: &ShredReport, dropped: &[DroppedTarget]) {
    for outcome in &report.outcomes {
        match outcome {
            ShredOutcome::Success {
                path,
                bytes_overwritten,
            } => {
                if cli.verbose {
                    println!(
                        "  {} {} ({})",
                        "shredded".green(),
                        path.display(),
                        format_bytes(*bytes_overwritten)
                    );
                }
            }
            ShredOutcome::Failed {
                path,
                reason,
                residual_path,
            } => {
                eprintln!("  {} {}: {reason}", "failed".red(), path.display());
                if let Some(residual) = residual_path.as_ref().filter(|r| r != &path) {
                    eprintln!("    left at {}", residual.display());
                }
            }
        }
    }

    if let Some(cleanup) = &report.folder_cleanup {
        if cli.verbose {
            for folder in &cleanup.removed {
                println!("  {} {}", "removed".green(), folder.display());
            }
            for failure in &cleanup.failures {
                println!(
                    "  kept {} ({}): {}",
                    failure.path.display(),
                    failure.kind,
                    failure.reason
                );
            }
        }
    }
    if cli.verbose {
        for skipped in &report.skipped_directories {
            println!(
                "  {} {}: {}",
                "skipped".yellow(),
                skipped.path.display(),
                skip_reason_label(&skipped.reason)
            );
        }
    }

    if cli.quiet {
        return;
    }
    let summary = format!(
        "Shredded {} of {} file(s), {} overwritten in {:.2}s.",
        report.succeeded(),
        report.outcomes.len() + dropped.len(),
        format_bytes(report.bytes_overwritten()),
        report.duration.as_secs_f64()
    );
    if report.is_clean() && dropped.is_empty() {
        println!("{}", summary.bold());
    } else {
        println!("{}", summary.yellow().bold());
    }
    if report.cancelled {
        println!("{}", "Cancelled before all targets were processed.".yellow());
    }
}

fn report_json(command: &str, report: &ShredReport, dropped: &[DroppedTarget]) -> Value {
    let outcomes: Vec<Value> = report
        .outcomes
        .iter()
        .map(|outcome| match outcome {
            ShredOutcome::Success {
                path,
                bytes_overwritten,
            } => json!({
                "path": path.to_string_lossy(),
                "ok": true,
                "bytes_overwritten": bytes_overwritten,
            }),
            ShredOutcome::Failed {
                path,
                reason,
                residual_path,
            } => json!({
                "path": path.to_string_lossy(),
                "ok": false,
                "kind": reason.kind(),
                "error_code": reason.code(),
                "error": reason.to_string(),
                "residual_path": residual_path.as_ref().map(|p| p.to_string_lossy()),
            }),
        })
        .collect();

    let folder_cleanup = report.folder_cleanup.as_ref().map(|cleanup| {
        json!({
            "removed": cleanup.removed.iter().map(|p| p.to_string_lossy()).collect::<Vec<_>>(),
            "failures": cleanup.failures.iter().map(|f| json!({
                "path": f.path.to_string_lossy(),
                "kind": f.kind.as_str(),
                "reason": f.reason,
            })).collect::<Vec<_>>(),
        })
    });

    let skipped: Vec<Value> = report
        .skipped_directories
        .iter()
        .map(|s| {
            json!({
                "path": s.path.to_string_lossy(),
                "reason": skip_reason_label(&s.reason),
            })
        })
        .collect();

    json!({
        "command": command,
        "targets": report.outcomes.len(),
        "succeeded": report.succeeded(),
        "failed": report.failed(),
        "bytes_overwritten": report.bytes_overwritten(),
        "cancelled": report.cancelled,
        "duration_ms": u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
        "outcomes": outcomes,
        "folder_cleanup": folder_cleanup,
        "skipped_directories": skipped,
        "dropped": dropped_json(dropped),
    })
}

fn dropped_json(dropped: &[DroppedTarget]) -> Vec<Value> {
    dropped
        .iter()
        .map(|d| {
            json!({
                "path": d.path.to_string_lossy(),
                "reason": d.reason,
            })
        })
        .collect()
}

fn skip_reason_label(reason: &SkipReason) -> String {
    match reason {
        SkipReason::Unreadable(detail) => format!("unreadable: {detail}"),
        SkipReason::OtherDevice => "on another filesystem".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Config, history, version
// ---------------------------------------------------------------------------

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;

            match output_mode(cli) {
                OutputMode::Human => {
                    let rendered = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Internal(format!("serialize config: {e}")))?;
                    println!("{rendered}");
                }
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config.stable_hash()?;
                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("Configuration is valid.");
                        println!("  Source: {}", config.paths.config_file.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        write_json_line(&json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
                            "hash": hash,
                        }))?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => eprintln!("Configuration is INVALID: {e}"),
                    OutputMode::Json => {
                        write_json_line(&json!({
                            "command": "config validate",
                            "valid": false,
                            "error_code": e.code(),
                            "error": e.to_string(),
                        }))?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

#[cfg(feature = "sqlite")]
fn run_history(cli: &Cli, args: &HistoryArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let db_path = &config.paths.sqlite_db;
    if !db_path.exists() {
        return Err(CliError::User(format!(
            "no activity database at {}",
            db_path.display()
        )));
    }
    let db = SqliteLogger::open(db_path)?;
    let pruned = match args.prune {
        Some(days) => db.prune_activity_log(days)?,
        None => 0,
    };
    let rows = db.recent_activity(args.limit)?;
    let since = (chrono::Utc::now() - chrono::Duration::days(1))
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    let files_24h = db.count_events_since("file_shred", &since)?;
    let bytes_24h = db.bytes_shredded_since(&since)?;

    match output_mode(cli) {
        OutputMode::Human => {
            if pruned > 0 {
                println!("Pruned {pruned} old row(s).");
            }
            println!(
                "Last 24h: {files_24h} file event(s), {} overwritten.",
                format_bytes(u64::try_from(bytes_24h).unwrap_or(0))
            );
            for row in &rows {
                let status = if row.success == 1 {
                    "ok".green()
                } else {
                    "fail".red()
                };
                println!(
                    "  {} {:<16} {:<4} {}",
                    row.timestamp,
                    row.event_type,
                    status,
                    row.path.as_deref().unwrap_or("-")
                );
            }
        }
        OutputMode::Json => {
            let entries: Vec<Value> = rows
                .iter()
                .map(|row| {
                    json!({
                        "ts": row.timestamp,
                        "event": row.event_type,
                        "severity": row.severity,
                        "path": row.path,
                        "residual_path": row.residual_path,
                        "size": row.size_bytes,
                        "ok": row.success == 1,
                        "error_code": row.error_code,
                    })
                })
                .collect();
            write_json_line(&json!({
                "command": "history",
                "pruned": pruned,
                "files_24h": files_24h,
                "bytes_24h": bytes_24h,
                "entries": entries,
            }))?;
        }
    }
    Ok(())
}

fn emit_version(cli: &Cli, args: &VersionArgs) -> Result<(), CliError> {
    let version = env!("CARGO_PKG_VERSION");
    let package = env!("CARGO_PKG_NAME");
    let target = option_env!("TARGET").unwrap_or("unknown");
    let profile = option_env!("PROFILE").unwrap_or("unknown");
    let git_sha = option_env!("GIT_SHA").unwrap_or("unknown");

    match output_mode(cli) {
        OutputMode::Human => {
            println!("fshred {version}");
            if args.verbose {
                println!("package: {package}");
                println!("target: {target}");
                println!("profile: {profile}");
                println!("git_sha: {git_sha}");
                println!("sqlite: {}", cfg!(feature = "sqlite"));
            }
        }
        OutputMode::Json => {
            write_json_line(&json!({
                "binary": "fshred",
                "version": version,
                "package": package,
                "build": {
                    "target": target,
                    "profile": profile,
                    "git_sha": git_sha,
                    "sqlite": cfg!(feature = "sqlite"),
                }
            }))?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

#[allow(clippy::cast_precision_loss)]
fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;

    if bytes >= GIB {
        format!("{:.1} GB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("FSHRED_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
