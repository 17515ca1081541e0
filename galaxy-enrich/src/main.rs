//! galaxy-enrich - one reconciliation run from a JSON request file
//!
//! Reads a `ReconcileRequest`, resolves the person in the configured author
//! directories and writes the merged profile as pretty JSON (stdout or file).

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use galaxy_common::config::TomlConfig;
use galaxy_enrich::{default_adapters, Orchestrator, ReconcileContext, ReconcileRequest};
use tracing::info;

/// Command-line arguments for galaxy-enrich
#[derive(Parser, Debug)]
#[command(name = "galaxy-enrich")]
#[command(about = "Resolve a researcher across author directories and merge their records")]
#[command(version)]
struct Args {
    /// Request JSON file (name, evidence, document-derived profile)
    #[arg(short, long)]
    input: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the merged profile here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = galaxy_common::logging::init_tracing("info").context("Failed to initialize logging")?;

    let config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    log_filter
        .apply_level(&config.logging.level)
        .context("Failed to apply configured log level")?;

    info!("Starting galaxy-enrich {}", env!("CARGO_PKG_VERSION"));

    let request = ReconcileRequest::from_file(&args.input)
        .with_context(|| format!("Failed to load request {}", args.input.display()))?;

    let adapters = default_adapters(&config).context("Failed to build directory clients")?;
    let orchestrator = Orchestrator::new(&config, adapters);

    let mut ctx = ReconcileContext::new();
    info!("Run id: {}", ctx.run_id());
    let merged = orchestrator
        .reconcile(&request, &mut ctx)
        .await
        .context("Reconciliation failed")?;

    match &args.output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
            merged
                .write_json(BufWriter::new(file))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Merged profile written to {}", path.display());
        }
        None => merged
            .write_json(std::io::stdout().lock())
            .context("Failed to write merged profile")?,
    }

    Ok(())
}
