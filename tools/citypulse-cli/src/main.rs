//! CityPulse CLI: pipeline stages, local runs, queries, and export.
//!
//! Usage:
//!   citypulse normalize          Turn a raw dump into JSON lines
//!   citypulse validate           Validate raw records
//!   citypulse fuse               Join GPS and emission samples (sorted input)
//!   citypulse map                Re-key fused records by zone
//!   citypulse reduce             Aggregate zone samples (sorted input)
//!   citypulse sort               Sort lines by key
//!   citypulse run --input <F>    Run the whole pipeline locally
//!   citypulse query <RESULTS>    Query zone results
//!   citypulse export <RESULTS>   Write analytics batches
//!   citypulse config [--save]    Show or write the configuration
//!
//! Stage commands read stdin and write stdout unless given paths.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use citypulse_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "citypulse",
    about = "Streaming urban telemetry aggregation",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn a document-store dump into one JSON object per line
    Normalize {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate raw JSON records into keyed lines
    Validate {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seed for ambient noise sampling
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Join GPS and emission lines per vehicle and timestamp
    Fuse {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-key fused records by zone and timestamp
    Map {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Aggregate zone samples into zone results
    Reduce {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Stable sort of lines by the text before the first tab
    Sort {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run validate, fuse, map, and reduce over one input file
    Run {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Partition workers for fusion and reduction
        #[arg(long)]
        workers: Option<usize>,

        /// Seed for ambient noise sampling
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Query zone results
    Query {
        /// Zone results (JSON lines)
        results: PathBuf,

        #[command(subcommand)]
        query: commands::query::QueryCommand,
    },

    /// Export zone results as analytics batches
    Export {
        /// Zone results (JSON lines)
        results: PathBuf,

        /// Directory for batch files
        #[arg(long)]
        out_dir: PathBuf,

        /// Rows per batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// JSON object mapping zone names to ids
        #[arg(long)]
        zone_ids: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config {
        /// Write it to the `--config` path or the default location
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?,
        None => AppConfig::load(),
    };

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    citypulse_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Normalize { input, output } => commands::stages::normalize(input, output),
        Commands::Validate {
            input,
            output,
            seed,
        } => commands::stages::validate(&config, input, output, seed),
        Commands::Fuse { input, output } => commands::stages::fuse(input, output),
        Commands::Map { input, output } => commands::stages::map(&config, input, output),
        Commands::Reduce { input, output } => commands::stages::reduce(input, output),
        Commands::Sort { input, output } => commands::stages::sort(input, output),
        Commands::Run {
            input,
            output,
            workers,
            seed,
        } => commands::run::run(&config, input, output, workers, seed).await,
        Commands::Query { results, query } => commands::query::run(&config, results, query),
        Commands::Export {
            results,
            out_dir,
            batch_size,
            zone_ids,
        } => commands::export::run(&config, results, out_dir, batch_size, zone_ids),
        Commands::Config { save } => commands::config::run(&config, cli.config.as_deref(), save),
    }
}
