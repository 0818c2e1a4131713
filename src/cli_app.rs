//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use integrity_monitor::core::clock::SystemClock;
use integrity_monitor::core::config::Config;
use integrity_monitor::core::errors::{ErrorCategory, ImonError};
use integrity_monitor::engine::{Alert, BaselineEngine, EngineConfig};
use integrity_monitor::fingerprint::algorithm::HashAlgorithm;
use integrity_monitor::logger::alert_log::AlertLog;
use integrity_monitor::store::history::HistoryStore;

/// File integrity monitor: baseline files, then detect removal, modification
/// and reverted ("spoofed") content.
#[derive(Debug, Parser)]
#[command(
    name = "imon",
    author,
    version,
    about = "File integrity monitor",
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
    /// Quiet mode (alerts and errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Override the baseline document location.
    #[arg(long, global = true, value_name = "PATH")]
    baseline_file: Option<PathBuf>,
    /// Override the history document location.
    #[arg(long, global = true, value_name = "PATH")]
    history_file: Option<PathBuf>,
    /// Override the alert log location.
    #[arg(long, global = true, value_name = "PATH")]
    alert_log: Option<PathBuf>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Record a new baseline for files and directories.
    Baseline(BaselineArgs),
    /// Compare baselined files against their current state.
    Check,
    /// Show the recorded fingerprint timeline for one path.
    History(HistoryArgs),
    /// View configuration state.
    Config(ConfigArgs),
    /// Show version and supported digests.
    Version(VersionArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct BaselineArgs {
    /// Files or directories (falls back to `monitor.monitored_paths` when omitted).
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct HistoryArgs {
    /// Path exactly as it appears in the baseline.
    #[arg(value_name = "PATH")]
    path: String,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Args, Default)]
struct VersionArgs {
    /// Also list digests and the default config location.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
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
            Self::Json(_) => 3,
        }
    }
}

impl From<ImonError> for CliError {
    fn from(err: ImonError) -> Self {
        match err.category() {
            ErrorCategory::Configuration | ErrorCategory::NotFound => Self::User(err.to_string()),
            ErrorCategory::Io | ErrorCategory::Persistence => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Baseline(args) => run_baseline(cli, args),
        Command::Check => run_check(cli),
        Command::History(args) => run_history(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Version(args) => emit_version(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

/// Config file + env overrides + CLI location flags, validated.
fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = &cli.baseline_file {
        config.paths.baseline_file.clone_from(path);
    }
    if let Some(path) = &cli.history_file {
        config.paths.history_file.clone_from(path);
    }
    if let Some(path) = &cli.alert_log {
        config.paths.alert_log.clone_from(path);
    }
    config.validate()?;
    Ok(config)
}

fn build_engine(config: &Config) -> Result<BaselineEngine, CliError> {
    let sink = AlertLog::new(&config.paths.alert_log, &config.alert_log);
    let engine = BaselineEngine::new(
        EngineConfig::from_config(config),
        Box::new(sink),
        Arc::new(SystemClock),
    )?;
    Ok(engine)
}

fn run_baseline(cli: &Cli, args: &BaselineArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let paths = if args.paths.is_empty() {
        config.monitor.monitored_paths.clone()
    } else {
        args.paths.clone()
    };

    let mut engine = build_engine(&config)?;
    let report = engine.create_baseline(&paths)?;

    match output_mode(cli) {
        OutputMode::Human => {
            for issue in &report.walk_issues {
                if !cli.quiet {
                    eprintln!(
                        "{} {}: {}",
                        "warning:".yellow(),
                        issue.path.display(),
                        issue.details
                    );
                }
            }
            for alert in &report.read_failures {
                println!("{}", paint_alert(alert));
            }
            if !cli.quiet {
                if cli.verbose {
                    for (path, _) in &engine.baseline_store().load()? {
                        println!("  {path}");
                    }
                }
                println!("Baseline created successfully.");
                println!(
                    "Initial history entries created. ({} files, {} history entries)",
                    report.files_recorded, report.history_seeded
                );
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "baseline",
                "baseline_file": config.paths.baseline_file.to_string_lossy(),
                "history_file": config.paths.history_file.to_string_lossy(),
                "report": serde_json::to_value(&report)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_check(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let mut engine = build_engine(&config)?;
    let report = engine.check_integrity()?;
    let log_name = engine.alert_destination();

    match output_mode(cli) {
        OutputMode::Human => {
            for alert in &report.alerts {
                println!("{}", paint_alert(alert));
            }
            if !cli.quiet {
                if report.alert_count > 0 {
                    println!("\n{} new log entries added to {log_name}", report.alert_count);
                } else {
                    println!("\nNo new log entries added to {log_name}");
                }
                if report.is_clean() {
                    println!("{}", "No integrity violations detected.".green());
                }
                if cli.verbose {
                    println!(
                        "  checked {} files, {} history entries appended",
                        report.files_checked, report.history_appended
                    );
                }
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "check",
                "alert_log": log_name,
                "clean": report.is_clean(),
                "report": serde_json::to_value(&report)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_history(cli: &Cli, args: &HistoryArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let history = HistoryStore::new(&config.paths.history_file).load()?;
    let entries = history.entries(&args.path);

    match output_mode(cli) {
        OutputMode::Human => {
            if entries.is_empty() {
                println!("No history recorded for {}", args.path);
                return Ok(());
            }
            println!("{} ({} entries)", args.path.bold(), entries.len());
            for entry in entries {
                println!(
                    "  {}  {}  {:>10} bytes  modified {}",
                    entry.check_timestamp, entry.hash, entry.size, entry.file_modified
                );
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "history",
                "path": args.path,
                "entries": serde_json::to_value(entries)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn paint_alert(alert: &Alert) -> String {
    let message = alert.console_message();
    match alert {
        Alert::FileRemoved { .. } | Alert::FileModified { .. } => message.red().to_string(),
        Alert::SpoofingSuspected { .. } => message.magenta().bold().to_string(),
        Alert::ReadFailed { .. } => message.yellow().to_string(),
    }
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => config_path(cli),
        Some(ConfigCommand::Show) => config_show(cli),
        Some(ConfigCommand::Validate) => config_validate(cli),
    }
}

fn config_path(cli: &Cli) -> Result<(), CliError> {
    let path = cli.config.clone().unwrap_or_else(Config::default_path);
    let exists = path.exists();
    if output_mode(cli) == OutputMode::Json {
        return write_json_line(&json!({
            "command": "config path",
            "path": path.to_string_lossy(),
            "exists": exists,
        }));
    }
    println!("{}", path.display());
    if !exists {
        println!("  (not found; built-in defaults apply)");
    }
    Ok(())
}

fn config_show(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    if output_mode(cli) == OutputMode::Json {
        return write_json_line(&json!({
            "command": "config show",
            "hash": config.stable_hash()?,
            "config": serde_json::to_value(&config)?,
        }));
    }
    let rendered = toml::to_string_pretty(&config)
        .map_err(|e| CliError::Runtime(format!("render config: {e}")))?;
    println!("# effective configuration, hash {}", config.stable_hash()?);
    println!("{rendered}");
    Ok(())
}

/// Exit code 1 when the merged configuration is rejected.
fn config_validate(cli: &Cli) -> Result<(), CliError> {
    let config = match load_config(cli) {
        Ok(config) => config,
        Err(e) => {
            if output_mode(cli) == OutputMode::Json {
                write_json_line(&json!({
                    "command": "config validate",
                    "valid": false,
                    "error": e.to_string(),
                }))?;
            } else {
                eprintln!("{} {e}", "invalid configuration:".red());
            }
            return Err(CliError::User(format!("invalid config: {e}")));
        }
    };

    let monitor = &config.monitor;
    if output_mode(cli) == OutputMode::Json {
        return write_json_line(&json!({
            "command": "config validate",
            "valid": true,
            "path": config.paths.config_file.to_string_lossy(),
            "hash": config.stable_hash()?,
            "monitored_paths": monitor.monitored_paths.len(),
            "hash_algorithm": monitor.hash_algorithm,
            "spoof_seed_policy": monitor.spoof_seed_policy,
        }));
    }
    println!("{}", "Configuration is valid.".green());
    println!("  source: {}", config.paths.config_file.display());
    println!(
        "  monitoring {} paths with {} (seed entries: {})",
        monitor.monitored_paths.len(),
        monitor.hash_algorithm,
        monitor.spoof_seed_policy
    );
    println!("  hash: {}", config.stable_hash()?);
    Ok(())
}

fn emit_version(cli: &Cli, args: &VersionArgs) -> Result<(), CliError> {
    let version = env!("CARGO_PKG_VERSION");
    let digests: Vec<&str> = HashAlgorithm::ALL.iter().map(|a| a.name()).collect();
    let default_config = Config::default_path();

    if output_mode(cli) == OutputMode::Json {
        return write_json_line(&json!({
            "binary": "imon",
            "version": version,
            "package": env!("CARGO_PKG_NAME"),
            "digests": digests,
            "default_digest": HashAlgorithm::default(),
            "default_config": default_config.to_string_lossy(),
        }));
    }
    println!("imon {version}");
    if args.verbose {
        println!("digests: {} (default {})", digests.join(", "), HashAlgorithm::default());
        println!("default config: {}", default_config.display());
    }
    Ok(())
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("IMON_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

/// `--json` wins, then `IMON_OUTPUT_FORMAT`, then human on a TTY and JSON otherwise.
fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    let requested = env_mode.map(|raw| raw.trim().to_ascii_lowercase());
    match (json_flag, requested.as_deref()) {
        (true, _) | (false, Some("json")) => OutputMode::Json,
        (false, Some("human")) => OutputMode::Human,
        _ if stdout_is_tty => OutputMode::Human,
        _ => OutputMode::Json,
    }
}
