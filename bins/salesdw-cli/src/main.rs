//! Command-line runner for the salesdw hybrid-join ETL engine.
//!
//! Reads the three master/stream CSVs, resolves configuration from
//! compiled-in defaults, an optional YAML file, and CLI flags (in that
//! overlay order), then drives the producer and joiner threads to
//! completion against either a Postgres warehouse or an in-memory sink.

use anyhow::{Context, Result};
use clap::Parser;
use salesdw_core::{ConfigFile, EngineConfig, WarehouseSink};
use salesdw_io::{MemorySink, PostgresSink};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for the salesdw ETL run.
#[derive(Parser, Debug)]
#[command(name = "salesdw-cli")]
#[command(about = "Hybrid-join ETL: stream sales transactions into a dimensional warehouse")]
struct Args {
    /// Transactional stream CSV (orderID, Customer_ID, Product_ID, quantity, date).
    #[arg(long)]
    transactional_csv: PathBuf,

    /// Product master CSV.
    #[arg(long)]
    product_master_csv: PathBuf,

    /// Customer master CSV.
    #[arg(long)]
    customer_master_csv: PathBuf,

    /// Optional YAML file overlaying any of the knobs below.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Postgres connection string. Omit to run against an in-memory sink
    /// (useful for dry runs and smoke-testing a new stream file).
    #[arg(long, env = "SALESDW_POSTGRES_URL")]
    postgres_url: Option<String>,

    /// Hash slot cap (`HS`).
    #[arg(long)]
    hs: Option<usize>,

    /// Partition size (`VP`).
    #[arg(long)]
    vp: Option<usize>,

    /// Producer yield duration in microseconds, applied every 1,000 rows.
    #[arg(long)]
    stream_sleep_micros: Option<u64>,

    /// Facts accumulated before a commit is issued.
    #[arg(long)]
    commit_batch: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = EngineConfig::with_paths(
        args.transactional_csv.clone(),
        args.product_master_csv.clone(),
        args.customer_master_csv.clone(),
    );

    let mut file_postgres_url = None;
    if let Some(config_path) = &args.config {
        let raw = std::fs::read_to_string(config_path)
            .with_context(|| format!("reading config file {}", config_path.display()))?;
        let file: ConfigFile = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", config_path.display()))?;
        file_postgres_url = file.postgres_url.clone();
        config = config.overlay(&file);
    }

    let cli_overlay = ConfigFile {
        hs: args.hs,
        vp: args.vp,
        stream_sleep_micros: args.stream_sleep_micros,
        commit_batch: args.commit_batch,
        transactional_csv: None,
        product_master_csv: None,
        customer_master_csv: None,
        postgres_url: None,
    };
    config = config.overlay(&cli_overlay);

    let postgres_url = args.postgres_url.or(file_postgres_url);

    let mut postgres_sink;
    let mut memory_sink;
    let sink: &mut dyn WarehouseSink = match &postgres_url {
        Some(url) => {
            postgres_sink = PostgresSink::connect(url)?;
            &mut postgres_sink
        }
        None => {
            tracing::warn!("no --postgres-url given, running against an in-memory sink");
            memory_sink = MemorySink::new();
            &mut memory_sink
        }
    };

    let report = salesdw_engine::run(&config, sink)?;

    println!(
        "loaded {} products, {} customers; read {} transactions ({} duplicates suppressed); \
         emitted {} facts ({} unknown-product rows dropped) across {} commits",
        report.products_loaded,
        report.customers_loaded,
        report.transactions_read,
        report.duplicates_suppressed,
        report.facts_emitted,
        report.dropped_unknown_product,
        report.commits,
    );

    Ok(())
}
