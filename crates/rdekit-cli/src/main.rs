//! rdekit - registry data escrow analysis and import

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod analyze;
mod display;
mod import;
mod show;

/// rdekit - analyse RDE deposits and replay them into a target registry
#[derive(Parser, Debug)]
#[command(name = "rdekit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse and validate a deposit, writing the analysis artifact
    Analyze(AnalyzeArgs),

    /// Replay an analysed deposit into the target registry
    Import(ImportArgs),

    /// Summarise an analysis artifact
    Show {
        /// Analysis artifact
        #[arg(short, long)]
        analysis: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct AnalyzeArgs {
    /// Deposit XML file
    #[arg(short, long)]
    file: PathBuf,

    /// Analysis artifact path [default: <deposit>.analysis.json]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Registrar override table (JSON object: source id -> target client id)
    #[arg(short, long)]
    mapping: Option<PathBuf>,

    /// Keep source ROIDs in the generated commands
    #[arg(long)]
    preserve_ids: bool,

    /// Target registry API; when set, its registrar directory drives the mapping
    #[arg(long, env = "RDEKIT_API_URL")]
    api_url: Option<String>,
}

#[derive(clap::Args, Debug)]
struct ImportArgs {
    /// Deposit XML file the artifact was built from
    #[arg(short, long)]
    file: PathBuf,

    /// Analysis artifact
    #[arg(short, long)]
    analysis: PathBuf,

    /// Extra registrar overrides, applied add-only on top of the artifact's map
    #[arg(short, long)]
    mapping: Option<PathBuf>,

    /// Import result log [default: <deposit>.import.json]
    #[arg(short, long)]
    result: Option<PathBuf>,

    /// Target registry API base URL
    #[arg(long, env = "RDEKIT_API_URL")]
    api_url: String,

    /// Chunks submitted concurrently
    #[arg(long, env = "RDEKIT_WORKERS", default_value = "4")]
    workers: usize,

    /// Commands per chunk (values below 1 mean 1)
    #[arg(long, env = "RDEKIT_CHUNK_SIZE", default_value = "50", allow_negative_numbers = true)]
    chunk_size: i64,

    /// Per-request timeout
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Retries for transient API failures
    #[arg(long, default_value = "2")]
    retries: u32,

    /// Skip commands whose registrar is unmapped instead of refusing to start
    #[arg(long)]
    tolerate_unmapped: bool,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze(args) => analyze::run(args).await,
        Commands::Import(args) => import::run(args).await,
        Commands::Show { analysis } => show::run(&analysis),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    tracing::debug!("rdekit v{}", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rdekit error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
