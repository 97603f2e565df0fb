// Tabula CLI - clinical summary tables, headless

mod config;
mod exit_codes;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use tabula_engine::classify::{classify, DEFAULT_DISTINCT_THRESHOLD};
use tabula_engine::{Blueprint, DataFrame, Registry};
use tabula_render::{render, OutputFormat};

use config::TableConfig;
use exit_codes::{EXIT_ERROR, EXIT_IO, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "tabula")]
#[command(about = "Clinical summary tables (Table 1) from CSV data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a summary table from a CSV file and a TOML table config
    #[command(after_help = "\
Examples:
  tabula build --data trial.csv --config table.toml
  tabula build --data trial.csv --config table.toml --format latex -o table.tex
  tabula build --data trial.csv --config table.toml --format html --quiet")]
    Build {
        /// Input CSV file (header row required)
        #[arg(long)]
        data: PathBuf,

        /// Table config (TOML)
        #[arg(long)]
        config: PathBuf,

        /// Output format
        #[arg(long, short = 'f', default_value = "text")]
        format: Format,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Suppress the build summary on stderr
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Report per-column classification and missingness for a CSV file
    #[command(after_help = "\
Examples:
  tabula inspect --data trial.csv
  tabula inspect --data trial.csv --threshold 5")]
    Inspect {
        /// Input CSV file (header row required)
        #[arg(long)]
        data: PathBuf,

        /// Distinct-value cutoff for the continuous/categorical decision
        #[arg(long, default_value_t = DEFAULT_DISTINCT_THRESHOLD)]
        threshold: usize,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Html,
    Latex,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputFormat::Text,
            Format::Html => OutputFormat::Html,
            Format::Latex => OutputFormat::Latex,
        }
    }
}

pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    fn error(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // clap prints its own message; keep the usage exit-code contract
            let _ = e.print();
            let code = if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS };
            return ExitCode::from(code);
        }
    };
    match run(cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("tabula: {}", e.message);
            if let Some(hint) = &e.hint {
                eprintln!("  hint: {hint}");
            }
            ExitCode::from(e.code)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Build { data, config, format, out, quiet } => {
            cmd_build(data, config, format, out, quiet)
        }
        Commands::Inspect { data, threshold } => cmd_inspect(data, threshold),
    }
}

fn cmd_build(
    data_path: PathBuf,
    config_path: PathBuf,
    format: Format,
    out: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let csv_data = std::fs::read_to_string(&data_path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", data_path.display())))?;
    let frame = DataFrame::from_csv(&csv_data)
        .map_err(|e| CliError::parse(format!("{}: {e}", data_path.display())))?;

    let config_text = std::fs::read_to_string(&config_path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", config_path.display())))?;
    let config = TableConfig::from_toml(&config_text)
        .map_err(|e| CliError::parse(format!("{}: {e}", config_path.display())))?;

    let registry = Registry::with_builtins();
    let mut blueprint = Blueprint::build(&config.table, &config.options, &frame, &registry)
        .map_err(|e| {
            CliError::error(e.to_string())
                .with_hint("check [table] and [options] against the CSV header")
        })?;
    blueprint.title = config.title.clone();

    let rendered = render(&blueprint, &frame, format.into(), &config.theme)
        .map_err(|e| CliError::error(e.to_string()))?;

    match &out {
        Some(path) => std::fs::write(path, &rendered)
            .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?,
        None => print!("{rendered}"),
    }

    if !quiet {
        let (hits, misses) = blueprint.cache_stats();
        eprintln!(
            "build: {}x{} table, {} populated cells, cache {hits} hits / {misses} misses",
            blueprint.row_count(),
            blueprint.col_count(),
            blueprint.populated_len(),
        );
        for diag in blueprint.diagnostics() {
            eprintln!(
                "warning: cell failed for '{}' (reads {}): {}",
                diag.variable,
                diag.deps.join(", "),
                diag.message
            );
        }
        if let Some(path) = &out {
            eprintln!("  wrote {}", path.display());
        }
    }
    Ok(())
}

fn cmd_inspect(data_path: PathBuf, threshold: usize) -> Result<(), CliError> {
    let csv_data = std::fs::read_to_string(&data_path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", data_path.display())))?;
    let frame = DataFrame::from_csv(&csv_data)
        .map_err(|e| CliError::parse(format!("{}: {e}", data_path.display())))?;

    println!("{} rows", frame.n_rows());
    for column in frame.columns() {
        println!(
            "{}: {}, {} distinct, {} missing",
            column.name,
            classify(column, threshold),
            column.distinct_non_missing(),
            column.missing_count()
        );
    }
    Ok(())
}
