//! Dilemma Flux CLI - Command-line interface for Dilemma Flux
//!
//! Commands:
//! - process: Reconcile every participant unit under a root directory
//! - unit: Reconcile a single participant directory
//! - inspect: Show which files and extraction path each unit would use
//! - schema: Print the output table schema

use clap::{Parser, Subcommand, ValueEnum};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use dilemma_flux::pipeline::{SessionDriver, UnitInspection};
use dilemma_flux::report::{RunReport, UnitReport, UnitStatus};
use dilemma_flux::types::CANONICAL_COLUMNS;
use dilemma_flux::{ReconcileConfig, ReconcileError, FLUX_VERSION, PRODUCER_NAME};

/// Dilemma Flux - Reconcile dilemma trial logs with eye-tracker summaries
#[derive(Parser)]
#[command(name = "dilemma-flux")]
#[command(author = "Synheart AI Inc")]
#[command(version = FLUX_VERSION)]
#[command(about = "Build per-participant trial tables from PsychoPy and eye-tracker logs", long_about = None)]
struct Cli {
    /// JSON configuration overriding column names and tokens
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Diagnostic log format
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile every participant directory under ROOT
    Process {
        /// Root directory with one subdirectory per participant
        #[arg(default_value = "participants")]
        root: PathBuf,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconcile a single participant directory
    Unit {
        /// Participant directory
        dir: PathBuf,

        /// Print the unit report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show input files and extraction path per unit without writing outputs
    Inspect {
        /// Root directory with one subdirectory per participant
        #[arg(default_value = "participants")]
        root: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the output table schema
    Schema {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    /// Human-readable lines
    Pretty,
    /// One JSON object per line
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);

    let _ = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

fn load_config(path: Option<&Path>) -> Result<ReconcileConfig, FluxCliError> {
    match path {
        Some(path) => Ok(ReconcileConfig::load(path)?),
        None => Ok(ReconcileConfig::default()),
    }
}

fn run(cli: Cli) -> Result<(), FluxCliError> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Process { root, json } => cmd_process(config, &root, json),
        Commands::Unit { dir, json } => cmd_unit(config, &dir, json),
        Commands::Inspect { root, json } => cmd_inspect(config, &root, json),
        Commands::Schema { json } => cmd_schema(json),
    }
}

fn cmd_process(config: ReconcileConfig, root: &Path, json: bool) -> Result<(), FluxCliError> {
    let driver = SessionDriver::new(config);
    let report = driver.run(root)?;

    if json {
        let output = JsonRunReport {
            producer: PRODUCER_NAME,
            version: FLUX_VERSION,
            report: &report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_run_report(&report);
    }

    Ok(())
}

fn cmd_unit(config: ReconcileConfig, dir: &Path, json: bool) -> Result<(), FluxCliError> {
    if !dir.is_dir() {
        return Err(FluxCliError::Reconcile(ReconcileError::RootNotFound(dir.to_path_buf())));
    }

    let driver = SessionDriver::new(config);
    let report = driver.process_unit(dir);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_unit_line(&report);
    }

    match report.status {
        UnitStatus::Failed => Err(FluxCliError::UnitFailed(report.reason.unwrap_or_default())),
        _ => Ok(()),
    }
}

fn cmd_inspect(config: ReconcileConfig, root: &Path, json: bool) -> Result<(), FluxCliError> {
    let driver = SessionDriver::new(config);
    let units = driver.inspect(root)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&units)?);
    } else {
        println!("Units under {}", root.display());
        println!("==========={}", "=".repeat(root.display().to_string().len()));
        for unit in &units {
            print_inspection(unit);
        }
    }

    Ok(())
}

fn cmd_schema(json: bool) -> Result<(), FluxCliError> {
    let columns: Vec<SchemaColumn> = CANONICAL_COLUMNS
        .iter()
        .map(|&name| SchemaColumn {
            name,
            description: column_description(name),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&columns)?);
    } else {
        println!("Output Schema: {{unit}}_processed_data.csv / .xlsx");
        println!();
        for column in &columns {
            println!("- {}: {}", column.name, column.description);
        }
        println!();
        println!("Event-matched tables append every other event-summary column after these.");
    }

    Ok(())
}

// Helper functions

fn column_description(name: &str) -> &'static str {
    match name {
        "participant" => "Participant identifier",
        "event" => "MAIN (onset) or CHOICE (response screen) event name",
        "key_pressed" => "Raw key response (CHOICE rows)",
        "response_side" => "left or right, empty when the key names neither",
        "is_correct" => "True/False against the ground-truth label, empty when undecidable",
        "reaction_time_custom_s" => "Choice stop minus mean option onset, in seconds",
        _ => "",
    }
}

fn print_unit_line(report: &UnitReport) {
    let icon = match report.status {
        UnitStatus::Processed => "[OK]  ",
        UnitStatus::Skipped => "[SKIP]",
        UnitStatus::Failed => "[ERR] ",
    };
    match report.status {
        UnitStatus::Processed => println!(
            "  {} {}: {} rows ({})",
            icon,
            report.unit,
            report.rows,
            report.path.map(|p| p.as_str()).unwrap_or("unknown"),
        ),
        _ => println!(
            "  {} {}: {}",
            icon,
            report.unit,
            report.reason.as_deref().unwrap_or("no reason given"),
        ),
    }
}

fn print_run_report(report: &RunReport) {
    println!("Dilemma Flux Run Report");
    println!("=======================");
    println!("Run:      {}", report.run_id);
    println!("Root:     {}", report.root.display());
    println!("Started:  {}", report.started_at.to_rfc3339());
    println!("Finished: {}", report.finished_at.to_rfc3339());
    println!("\nUnits:");
    for unit in &report.units {
        print_unit_line(unit);
    }
    println!(
        "\nProcessed: {}  Skipped: {}  Failed: {}",
        report.processed(),
        report.skipped(),
        report.failed()
    );
}

fn print_inspection(unit: &UnitInspection) {
    let name = |p: &Option<PathBuf>| {
        p.as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "-".to_string())
    };
    println!(
        "  {}: behavior={} summary={} path={}",
        unit.unit,
        name(&unit.files.behavior),
        name(&unit.files.summary),
        unit.path.map(|p| p.as_str()).unwrap_or("skip"),
    );
}

// Error types

#[derive(Debug)]
enum FluxCliError {
    Io(io::Error),
    Reconcile(ReconcileError),
    Json(serde_json::Error),
    UnitFailed(String),
}

impl From<io::Error> for FluxCliError {
    fn from(e: io::Error) -> Self {
        FluxCliError::Io(e)
    }
}

impl From<ReconcileError> for FluxCliError {
    fn from(e: ReconcileError) -> Self {
        FluxCliError::Reconcile(e)
    }
}

impl From<serde_json::Error> for FluxCliError {
    fn from(e: serde_json::Error) -> Self {
        FluxCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FluxCliError> for CliError {
    fn from(e: FluxCliError) -> Self {
        match e {
            FluxCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FluxCliError::Reconcile(e @ ReconcileError::RootNotFound(_)) => CliError {
                code: "ROOT_NOT_FOUND".to_string(),
                message: e.to_string(),
                hint: Some("Create the directory with one subdirectory per participant".to_string()),
            },
            FluxCliError::Reconcile(e @ ReconcileError::InvalidConfig(_))
            | FluxCliError::Reconcile(e @ ReconcileError::JsonError(_)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the --config file".to_string()),
            },
            FluxCliError::Reconcile(e) => CliError {
                code: "RECONCILE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            FluxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            FluxCliError::UnitFailed(reason) => CliError {
                code: "UNIT_FAILED".to_string(),
                message: reason,
                hint: Some("Run 'dilemma-flux inspect' on the parent directory".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct JsonRunReport<'a> {
    producer: &'static str,
    version: &'static str,
    #[serde(flatten)]
    report: &'a RunReport,
}

#[derive(serde::Serialize)]
struct SchemaColumn {
    name: &'static str,
    description: &'static str,
}
