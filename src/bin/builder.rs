//! tagpivot CLI
//!
//! Builds a pivoted CSV model from a saved query dump of raw tag records.
//!
//! # Commands
//!
//! - `build` - Fetch, aggregate, and write the model (default)
//! - `check-config` - Validate the configuration file and print a summary
//!
//! # Configuration
//!
//! Read from, in order:
//! 1. `--config <path>` flag
//! 2. `TAGPIVOT_CONFIG` environment variable (path to TOML file)
//! 3. `./tagpivot.toml` in the current directory
//! 4. Built-in defaults
//!
//! Validation and connectivity failures exit with status 1.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use tagpivot::config::Config;
use tagpivot::model::{ModelRequest, ModelRunner};
use tagpivot::source::CsvSource;

/// tagpivot - Pivoted CSV model builder for event-sourced tag records
#[derive(Parser)]
#[command(name = "tagpivot")]
#[command(version)]
#[command(about = "Build fixed-interval pivoted CSV models from raw tag records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (overrides TAGPIVOT_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the pivoted model (default)
    Build {
        /// Sample date, YYYY-MM-DD
        #[arg(long)]
        date: String,

        /// Sample time, HH:MM:SS
        #[arg(long)]
        time: String,

        /// Lookback span in hours
        #[arg(long, default_value_t = 1.0)]
        span: f64,

        /// Record dump CSV to read raw records from
        #[arg(short, long)]
        input: PathBuf,

        /// Override the model output directory
        #[arg(long)]
        model_dir: Option<PathBuf>,

        /// Override the query dump output directory
        #[arg(long)]
        query_dir: Option<PathBuf>,
    },

    /// Validate configuration file without running a build
    CheckConfig,
}

fn load_config(cli: &Cli) -> Result<Config, tagpivot::Error> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    config.validate()?;
    Ok(config)
}

fn print_config_summary(config: &Config) {
    println!("Configuration is valid!");
    println!();
    println!("Source Settings:");
    println!("  Server: {}", config.source.server);
    println!("  Database: {}", config.source.database);
    println!("  Table: {}", config.source.table);
    println!("  User: {}", config.source.user);
    println!("  Chunk size: {} rows", config.source.chunk_size);
    println!();
    println!("Columns:");
    println!("  Tag column: {}", config.columns.tag);
    println!("  Index column: {}", config.columns.index);
    println!();
    println!("Aggregation:");
    println!(
        "  Max concurrent workers: {}",
        config.aggregation.max_concurrent_workers
    );
    match config.aggregation.timeout_secs {
        Some(secs) => println!("  Timeout: {} seconds", secs),
        None => println!("  Timeout: none"),
    }
}

async fn cmd_build(
    config: Config,
    date: &str,
    time: &str,
    span: f64,
    input: PathBuf,
    model_dir: Option<PathBuf>,
    query_dir: Option<PathBuf>,
) -> Result<(), tagpivot::Error> {
    let mut config = config;
    if model_dir.is_some() {
        config.output.model_dir = model_dir;
    }
    if query_dir.is_some() {
        config.output.query_dir = query_dir;
    }

    info!(
        server = %config.source.server,
        database = %config.source.database,
        table = %config.source.table,
        user = %config.source.user,
        "Connection details"
    );

    let request = ModelRequest::parse(date, time, span)?;
    let source = CsvSource::new(input);

    let report = ModelRunner::new(config).run(&source, &request).await?;

    info!(
        rows = report.rows,
        columns = report.columns,
        records = report.records,
        model = %report.model_path.display(),
        query = %report.query_path.display(),
        "Model build complete"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.monitoring.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Starting tagpivot v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Some(Commands::CheckConfig) => {
            print_config_summary(&config);
            Ok(())
        }
        Some(Commands::Build {
            date,
            time,
            span,
            input,
            model_dir,
            query_dir,
        }) => cmd_build(config, &date, &time, span, input, model_dir, query_dir).await,
        None => {
            eprintln!("No command given; see `tagpivot --help`");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
