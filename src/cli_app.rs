//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use chrono::{Local, Utc};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use aigent_dashboard::analytics::{AnalyticsOptions, AnalyticsResult, Locale, aggregate_documents};
use aigent_dashboard::core::config::Config;
use aigent_dashboard::core::errors::AgdError;
use aigent_dashboard::dashboard::{antenna_view, equipment_view};
use aigent_dashboard::parse::{parse_date_str_in, parse_duration_str};
use aigent_dashboard::records::normalize_document;
use aigent_dashboard::store::jsonl::{export_file, import_file};
use aigent_dashboard::store::{StoreHandle, StoredDocument};

/// aigent dashboard backend: log analytics, catalog CRUD and form proxying.
#[derive(Debug, Parser)]
#[command(
    name = "agd",
    author,
    version,
    about = "Aigent dashboard backend",
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

impl Cli {
    /// Default diagnostics filter implied by `-v` / `-q`.
    pub const fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Aggregate stored execution logs into dashboard analytics.
    Analytics(AnalyticsArgs),
    /// Show recent execution logs in normalized form.
    Logs(LogsArgs),
    /// Import documents from a JSONL file.
    Import(ImportArgs),
    /// Export documents to a JSONL file.
    Export(ExportArgs),
    /// Manage the equipment catalog.
    Equipment(CatalogArgs),
    /// Manage the antenna catalog.
    Antennas(CatalogArgs),
    /// Try the duration and date parsers on a value.
    Parse(ParseArgs),
    /// View and validate configuration.
    Config(ConfigArgs),
    /// Run the HTTP API.
    #[cfg(feature = "server")]
    Serve(ServeArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
    /// Show version and optional build metadata.
    Version(VersionArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct AnalyticsArgs {
    /// Days in the trend series (clamped to analytics.max_trend_days).
    #[arg(long, value_name = "DAYS")]
    trend_days: Option<u32>,
    /// Manual-flow baseline used for time saved.
    #[arg(long, value_name = "MINUTES")]
    manual_flow_minutes: Option<f64>,
    /// Weekday label language (es, en).
    #[arg(long, value_name = "LOCALE")]
    locale: Option<Locale>,
}

#[derive(Debug, Clone, Args)]
struct LogsArgs {
    /// Maximum entries to show.
    #[arg(long, default_value_t = 20, value_name = "N")]
    limit: u32,
}

#[derive(Debug, Clone, Args)]
struct ImportArgs {
    /// JSONL file to read.
    #[arg(value_name = "FILE")]
    file: PathBuf,
    /// Target collection (defaults to the logs collection).
    #[arg(long, value_name = "NAME")]
    collection: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct ExportArgs {
    /// JSONL file to write.
    #[arg(value_name = "FILE")]
    file: PathBuf,
    /// Source collection (defaults to the logs collection).
    #[arg(long, value_name = "NAME")]
    collection: Option<String>,
    /// Maximum documents, newest first.
    #[arg(long, default_value_t = 100_000, value_name = "N")]
    limit: u32,
}

#[derive(Debug, Clone, Args)]
struct CatalogArgs {
    /// Catalog operation to run.
    #[command(subcommand)]
    command: CatalogCommand,
}

#[derive(Debug, Clone, Subcommand)]
enum CatalogCommand {
    /// List items, newest first.
    List {
        /// Maximum items to show.
        #[arg(long, default_value_t = 50, value_name = "N")]
        limit: u32,
    },
    /// Show one item.
    Show {
        /// Document id.
        id: String,
    },
    /// Add an item from a JSON object.
    Add {
        /// Item body, e.g. '{"name": "Router", "price": 49.9}'.
        #[arg(value_name = "JSON")]
        body: String,
    },
    /// Remove one item.
    Remove {
        /// Document id.
        id: String,
    },
}

#[derive(Debug, Clone, Args)]
struct ParseArgs {
    /// Parser to run.
    #[command(subcommand)]
    command: ParseCommand,
}

#[derive(Debug, Clone, Subcommand)]
enum ParseCommand {
    /// Parse a free-form duration into minutes.
    Duration {
        /// Value such as "1h 30m" or "45s".
        value: String,
    },
    /// Parse a timestamp (ISO, RFC 2822 or day-first DD/MM/YYYY).
    Date {
        /// Value such as "15/03/2024 10:30:00".
        value: String,
    },
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[cfg(feature = "server")]
#[derive(Debug, Clone, Args)]
struct ServeArgs {
    /// Override server.bind_addr.
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Args, Default)]
struct VersionArgs {
    /// Include additional build metadata fields.
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
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// Operation partially succeeded.
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

impl From<AgdError> for CliError {
    fn from(value: AgdError) -> Self {
        match value {
            AgdError::InvalidConfig { .. }
            | AgdError::MissingConfig { .. }
            | AgdError::ConfigParse { .. }
            | AgdError::InvalidDocument { .. }
            | AgdError::InvalidRequest { .. }
            | AgdError::NotFound { .. } => Self::User(value.to_string()),
            AgdError::Serialization { .. } => Self::Internal(value.to_string()),
            _ => Self::Runtime(value.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Analytics(args) => run_analytics(cli, args),
        Command::Logs(args) => run_logs(cli, args),
        Command::Import(args) => run_import(cli, args),
        Command::Export(args) => run_export(cli, args),
        Command::Equipment(args) => run_catalog(cli, Catalog::Equipment, args),
        Command::Antennas(args) => run_catalog(cli, Catalog::Antennas, args),
        Command::Parse(args) => run_parse(cli, args),
        Command::Config(args) => run_config(cli, args),
        #[cfg(feature = "server")]
        Command::Serve(args) => run_serve(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
        Command::Version(args) => emit_version(cli, args),
    }
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(
        path = %config.paths.config_file.display(),
        hash = config.stable_hash().unwrap_or_default(),
        "configuration loaded"
    );
    Ok(config)
}

fn open_store(config: &Config) -> StoreHandle {
    StoreHandle::new(&config.paths.sqlite_db)
}

// ──────────────────── analytics & logs ────────────────────

fn run_analytics(cli: &Cli, args: &AnalyticsArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let cfg = &config.analytics;

    let mut options = AnalyticsOptions::from_config(cfg);
    if let Some(days) = args.trend_days {
        options = options.with_trend_days(days.clamp(1, cfg.max_trend_days));
    }
    if let Some(minutes) = args.manual_flow_minutes {
        if !minutes.is_finite() || minutes < 0.0 {
            return Err(CliError::User(format!(
                "--manual-flow-minutes must be a finite value >= 0, got {minutes}"
            )));
        }
        options = options.with_manual_flow_minutes(minutes);
    }
    if let Some(locale) = args.locale {
        options.locale = locale;
    }

    let store = open_store(&config);
    let docs = store.with(|s| s.list_recent(&config.store.logs_collection, cfg.fetch_limit))?;
    let bodies: Vec<Value> = docs.into_iter().map(|doc| doc.body).collect();
    let result = aggregate_documents(&bodies, Utc::now(), &Local, &options);

    match output_mode(cli) {
        OutputMode::Human => print_analytics_human(&result),
        OutputMode::Json => {
            let payload = json!({
                "command": "analytics",
                "analytics": serde_json::to_value(&result)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn print_analytics_human(result: &AnalyticsResult) {
    let m = &result.metrics;
    let w = &result.windows;
    println!("{}", "Executions".bold());
    println!("  today:         {}", m.executions.day);
    println!("  last {:>3} days: {}", w.week_days, m.executions.week);
    println!("  last {:>3} days: {}", w.month_days, m.executions.month);
    println!("  last {:>3} days: {}", w.year_days, m.executions.year);
    println!();
    println!(
        "Average execution: {} min ({} samples)",
        format_minutes(m.avg_execution_minutes),
        result.totals.execution_samples
    );
    println!(
        "Time saved:        {} min",
        format_minutes(m.time_saved_minutes)
    );
    println!();

    println!("{}", format!("Trend (last {} days)", w.trend_days).bold());
    let peak = result
        .trend
        .iter()
        .map(|p| p.executions)
        .max()
        .unwrap_or(0)
        .max(1);
    for point in &result.trend {
        println!(
            "  {} {:<4} {:>5}  {}",
            point.date,
            point.label,
            point.executions,
            bar(point.executions, peak, 30).green()
        );
    }

    if !result.popular_kits.is_empty() {
        println!();
        println!("{}", "Popular kits".bold());
        for kit in &result.popular_kits {
            println!(
                "  {:<24} {:>5}  {:>5.1}%",
                kit.label,
                kit.count,
                kit.ratio * 100.0
            );
        }
    }
}

fn run_logs(cli: &Cli, args: &LogsArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let limit = args.limit.clamp(1, config.analytics.fetch_limit);
    let store = open_store(&config);
    let docs = store.with(|s| s.list_recent(&config.store.logs_collection, limit))?;

    let rows: Vec<(String, Value)> = docs
        .into_iter()
        .filter_map(|doc| {
            let entry = normalize_document(&doc.body)?;
            serde_json::to_value(entry).ok().map(|value| (doc.id, value))
        })
        .collect();

    match output_mode(cli) {
        OutputMode::Human => {
            if rows.is_empty() {
                println!("No execution logs with a resolvable timestamp.");
            }
            for (id, entry) in &rows {
                println!(
                    "{}  {}  {:>8}  {}  {}",
                    id.dimmed(),
                    entry["timestamp"].as_str().unwrap_or("-"),
                    entry["executionMinutes"]
                        .as_f64()
                        .map_or_else(|| "-".to_string(), |m| format!("{} min", format_minutes(m))),
                    entry["aigentId"].as_str().unwrap_or("-"),
                    entry["kitConfirmation"].as_str().unwrap_or("-"),
                );
            }
        }
        OutputMode::Json => {
            let entries: Vec<Value> = rows
                .into_iter()
                .map(|(id, mut entry)| {
                    entry["id"] = Value::String(id);
                    entry
                })
                .collect();
            write_json_line(&json!({ "command": "logs", "entries": entries }))?;
        }
    }
    Ok(())
}

// ──────────────────── import / export ────────────────────

fn run_import(cli: &Cli, args: &ImportArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let collection = args
        .collection
        .clone()
        .unwrap_or_else(|| config.store.logs_collection.clone());
    let store = open_store(&config);
    let report = store.with(|s| import_file(s, &collection, &args.file))?;

    match output_mode(cli) {
        OutputMode::Human => {
            println!(
                "Imported {} document(s) into {collection}.",
                report.imported
            );
            if report.skipped_blank > 0 {
                println!("  Skipped {} blank line(s).", report.skipped_blank);
            }
            for rejected in &report.rejected {
                eprintln!(
                    "  {} line {}: {}",
                    "rejected".red(),
                    rejected.line,
                    rejected.reason
                );
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "import",
                "collection": collection,
                "report": serde_json::to_value(&report)?,
            });
            write_json_line(&payload)?;
        }
    }

    if report.rejected.is_empty() {
        Ok(())
    } else {
        Err(CliError::Partial(format!(
            "{} line(s) could not be imported",
            report.rejected.len()
        )))
    }
}

fn run_export(cli: &Cli, args: &ExportArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let collection = args
        .collection
        .clone()
        .unwrap_or_else(|| config.store.logs_collection.clone());
    let store = open_store(&config);
    let written = store.with(|s| export_file(s, &collection, args.limit, &args.file))?;

    match output_mode(cli) {
        OutputMode::Human => println!(
            "Exported {written} document(s) from {collection} to {}.",
            args.file.display()
        ),
        OutputMode::Json => write_json_line(&json!({
            "command": "export",
            "collection": collection,
            "path": args.file.to_string_lossy(),
            "written": written,
        }))?,
    }
    Ok(())
}

// ──────────────────── catalogs ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Catalog {
    Equipment,
    Antennas,
}

impl Catalog {
    const fn label(self) -> &'static str {
        match self {
            Self::Equipment => "equipment",
            Self::Antennas => "antennas",
        }
    }

    fn collection(self, config: &Config) -> &str {
        match self {
            Self::Equipment => &config.store.equipment_collection,
            Self::Antennas => &config.store.antennas_collection,
        }
    }

    fn view(self, doc: &StoredDocument) -> Result<Value, CliError> {
        let value = match self {
            Self::Equipment => equipment_view(&doc.id, &doc.body).map(serde_json::to_value),
            Self::Antennas => antenna_view(&doc.id, &doc.body).map(serde_json::to_value),
        };
        Ok(value.transpose()?.unwrap_or(Value::Null))
    }
}

fn run_catalog(cli: &Cli, catalog: Catalog, args: &CatalogArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let collection = catalog.collection(&config);
    let store = open_store(&config);
    let mode = output_mode(cli);
    let command = format!("{} {}", catalog.label(), catalog_command_label(&args.command));

    match &args.command {
        CatalogCommand::List { limit } => {
            let docs = store.with(|s| s.list_recent(collection, (*limit).max(1)))?;
            let views = docs
                .iter()
                .map(|doc| catalog.view(doc))
                .collect::<Result<Vec<_>, _>>()?;
            match mode {
                OutputMode::Human => {
                    if views.is_empty() {
                        println!("No {} items.", catalog.label());
                    }
                    for view in &views {
                        print_catalog_line(view);
                    }
                }
                OutputMode::Json => {
                    write_json_line(&json!({ "command": command, "items": views }))?;
                }
            }
        }
        CatalogCommand::Show { id } => {
            let doc = store
                .with(|s| s.get(collection, id))?
                .ok_or_else(|| AgdError::not_found(collection, id))?;
            let view = catalog.view(&doc)?;
            match mode {
                OutputMode::Human => println!("{}", serde_json::to_string_pretty(&view)?),
                OutputMode::Json => {
                    write_json_line(&json!({ "command": command, "item": view }))?;
                }
            }
        }
        CatalogCommand::Add { body } => {
            let body: Value = serde_json::from_str(body)
                .map_err(|e| CliError::User(format!("item body is not valid JSON: {e}")))?;
            let doc = store.with(|s| s.insert(collection, &body))?;
            let view = catalog.view(&doc)?;
            match mode {
                OutputMode::Human => {
                    println!("Added {} {}.", catalog.label(), doc.id);
                    print_catalog_line(&view);
                }
                OutputMode::Json => {
                    write_json_line(&json!({ "command": command, "item": view }))?;
                }
            }
        }
        CatalogCommand::Remove { id } => {
            store.with(|s| s.delete(collection, id))?;
            match mode {
                OutputMode::Human => println!("Removed {} {id}.", catalog.label()),
                OutputMode::Json => {
                    write_json_line(&json!({ "command": command, "removed": id }))?;
                }
            }
        }
    }
    Ok(())
}

const fn catalog_command_label(command: &CatalogCommand) -> &'static str {
    match command {
        CatalogCommand::List { .. } => "list",
        CatalogCommand::Show { .. } => "show",
        CatalogCommand::Add { .. } => "add",
        CatalogCommand::Remove { .. } => "remove",
    }
}

fn print_catalog_line(view: &Value) {
    let price = view["price"]
        .as_f64()
        .map_or_else(|| "-".to_string(), |p| format!("{p:.2}"));
    let stock = view["stock"]
        .as_i64()
        .map_or_else(|| "-".to_string(), |s| s.to_string());
    println!(
        "{}  {:<32} price {:>10}  stock {:>5}",
        view["id"].as_str().unwrap_or("-").dimmed(),
        view["name"].as_str().unwrap_or("-"),
        price,
        stock
    );
}

// ──────────────────── parse ────────────────────

fn run_parse(cli: &Cli, args: &ParseArgs) -> Result<(), CliError> {
    match &args.command {
        ParseCommand::Duration { value } => {
            let minutes = parse_duration_str(value);
            match output_mode(cli) {
                OutputMode::Human => match minutes {
                    Some(m) => println!("{} min", format_minutes(m)),
                    None => println!("unparseable duration"),
                },
                OutputMode::Json => write_json_line(&json!({
                    "command": "parse duration",
                    "input": value,
                    "minutes": minutes,
                }))?,
            }
            if minutes.is_none() {
                return Err(CliError::User(format!("unparseable duration: {value:?}")));
            }
        }
        ParseCommand::Date { value } => {
            let instant = parse_date_str_in(value, &Local);
            match output_mode(cli) {
                OutputMode::Human => match instant {
                    Some(ts) => {
                        println!("utc:   {}", ts.to_rfc3339());
                        println!("local: {}", ts.with_timezone(&Local).to_rfc3339());
                    }
                    None => println!("unparseable date"),
                },
                OutputMode::Json => write_json_line(&json!({
                    "command": "parse date",
                    "input": value,
                    "utc": instant.map(|ts| ts.to_rfc3339()),
                    "local": instant.map(|ts| ts.with_timezone(&Local).to_rfc3339()),
                }))?,
            }
            if instant.is_none() {
                return Err(CliError::User(format!("unparseable date: {value:?}")));
            }
        }
    }
    Ok(())
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match args.command {
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
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let mut config = load_config(cli)?;
            if config.server.dashboard_password.is_some() {
                config.server.dashboard_password = Some("********".to_string());
            }

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Runtime(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    let value = serde_json::to_value(&config)?;
                    let payload = json!({
                        "command": "config show",
                        "config": value,
                    });
                    write_json_line(&payload)?;
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
                        let payload = json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
                            "hash": hash,
                        });
                        write_json_line(&payload)?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => {
                        eprintln!("Configuration is INVALID: {e}");
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": false,
                            "error": e.to_string(),
                            "code": e.code(),
                        });
                        write_json_line(&payload)?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

// ──────────────────── serve ────────────────────

#[cfg(feature = "server")]
fn run_serve(cli: &Cli, args: &ServeArgs) -> Result<(), CliError> {
    use std::sync::Arc;

    use aigent_dashboard::server::{AppState, serve};

    let mut config = load_config(cli)?;
    if let Some(bind) = &args.bind {
        config.server.bind_addr.clone_from(bind);
    }
    if config.server.dashboard_password.is_none() {
        tracing::warn!("no dashboard password configured; dashboard routes are open");
    }

    let state = Arc::new(AppState::new(config)?);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(format!("start async runtime: {e}")))?;
    runtime.block_on(serve(state))?;
    Ok(())
}

// ──────────────────── version & output helpers ────────────────────

fn emit_version(cli: &Cli, args: &VersionArgs) -> Result<(), CliError> {
    let version = env!("CARGO_PKG_VERSION");
    let package = env!("CARGO_PKG_NAME");
    let target = option_env!("TARGET").unwrap_or("unknown");
    let profile = option_env!("PROFILE").unwrap_or("unknown");
    let git_sha = option_env!("GIT_SHA").unwrap_or("unknown");

    match output_mode(cli) {
        OutputMode::Human => {
            println!("agd {version}");
            if args.verbose {
                println!("package: {package}");
                println!("target: {target}");
                println!("profile: {profile}");
                println!("git_sha: {git_sha}");
                println!("features: {}", enabled_features().join(", "));
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "binary": "agd",
                "version": version,
                "package": package,
                "features": enabled_features(),
                "build": {
                    "target": target,
                    "profile": profile,
                    "git_sha": git_sha,
                }
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn enabled_features() -> Vec<&'static str> {
    let mut features = vec!["cli"];
    if cfg!(feature = "sqlite") {
        features.push("sqlite");
    }
    if cfg!(feature = "server") {
        features.push("server");
    }
    features
}

fn format_minutes(minutes: f64) -> String {
    let rounded = (minutes * 100.0).round() / 100.0;
    if (rounded - rounded.trunc()).abs() < f64::EPSILON {
        format!("{rounded:.0}")
    } else {
        format!("{rounded:.2}")
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn bar(value: u64, peak: u64, width: usize) -> String {
    if value == 0 || peak == 0 {
        return String::new();
    }
    let filled = ((value as f64 / peak as f64) * width as f64).ceil() as usize;
    "█".repeat(filled.clamp(1, width))
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("AGD_OUTPUT_FORMAT").ok();
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_before_and_after_subcommand() {
        let before = Cli::try_parse_from([
            "agd",
            "--config",
            "/tmp/agd.toml",
            "--json",
            "--no-color",
            "-v",
            "analytics",
        ]);
        assert!(before.is_ok());

        let after = Cli::try_parse_from(["agd", "logs", "--json", "--no-color", "-q"]);
        assert!(after.is_ok());
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["agd", "-v", "-q", "logs"]).is_err());
    }

    #[test]
    fn parses_every_subcommand() {
        let cases = [
            vec!["agd", "analytics", "--trend-days", "14", "--manual-flow-minutes", "25"],
            vec!["agd", "analytics", "--locale", "en-US"],
            vec!["agd", "logs", "--limit", "5"],
            vec!["agd", "import", "logs.jsonl", "--collection", "logs"],
            vec!["agd", "export", "out.jsonl", "--limit", "10"],
            vec!["agd", "equipment", "list", "--limit", "3"],
            vec!["agd", "equipment", "show", "65f0"],
            vec!["agd", "antennas", "add", "{\"name\": \"Omni\"}"],
            vec!["agd", "antennas", "remove", "65f0"],
            vec!["agd", "parse", "duration", "1h 30m"],
            vec!["agd", "parse", "date", "15/03/2024 10:30:00"],
            vec!["agd", "config", "path"],
            vec!["agd", "config", "validate"],
            vec!["agd", "version", "--verbose"],
        ];

        for case in cases {
            let parsed = Cli::try_parse_from(case.clone());
            assert!(parsed.is_ok(), "failed to parse case: {case:?}");
        }
    }

    #[cfg(feature = "server")]
    #[test]
    fn serve_accepts_bind_override() {
        assert!(Cli::try_parse_from(["agd", "serve", "--bind", "0.0.0.0:9000"]).is_ok());
    }

    #[test]
    fn unknown_locale_is_rejected_by_parser() {
        assert!(Cli::try_parse_from(["agd", "analytics", "--locale", "fr"]).is_err());
    }

    #[test]
    fn completions_support_bash_zsh_and_fish() {
        for shell in ["bash", "zsh", "fish"] {
            let parsed = Cli::try_parse_from(["agd", "completions", shell]);
            assert!(parsed.is_ok(), "failed shell parse for {shell}");
        }
    }

    #[test]
    fn output_mode_resolution_honors_precedence() {
        assert_eq!(
            resolve_output_mode(true, Some("human"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode(false, Some("json"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode(false, Some("human"), false),
            OutputMode::Human
        );
        assert_eq!(
            resolve_output_mode(false, Some("auto"), true),
            OutputMode::Human
        );
        assert_eq!(resolve_output_mode(false, None, false), OutputMode::Json);
    }

    #[test]
    fn store_errors_map_to_exit_codes() {
        assert_eq!(
            CliError::from(AgdError::not_found("equipment", "x")).exit_code(),
            1
        );
        assert_eq!(
            CliError::from(AgdError::Sql {
                context: "",
                details: String::new()
            })
            .exit_code(),
            2
        );
        assert_eq!(CliError::Partial(String::new()).exit_code(), 4);
    }

    #[test]
    fn log_filter_follows_verbosity() {
        let cli = Cli::try_parse_from(["agd", "-v", "logs"]).unwrap();
        assert_eq!(cli.default_log_filter(), "debug");
        let cli = Cli::try_parse_from(["agd", "-q", "logs"]).unwrap();
        assert_eq!(cli.default_log_filter(), "warn");
        let cli = Cli::try_parse_from(["agd", "logs"]).unwrap();
        assert_eq!(cli.default_log_filter(), "info");
    }

    #[test]
    fn minutes_format_drops_needless_decimals() {
        assert_eq!(format_minutes(90.0), "90");
        assert_eq!(format_minutes(0.75), "0.75");
        assert_eq!(format_minutes(1.0 / 3.0), "0.33");
    }

    #[test]
    fn bars_scale_to_peak() {
        assert_eq!(bar(0, 10, 30), "");
        assert_eq!(bar(10, 10, 30).chars().count(), 30);
        assert_eq!(bar(1, 1000, 30).chars().count(), 1);
    }
}
