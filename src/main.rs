use anyhow::Context;
use clap::Parser;
use geo_enrich::app::enrich_use_case::EnrichUseCase;
use geo_enrich::common::constants::DEFAULT_OUTPUT_FILE;
use geo_enrich::config::Config;
use geo_enrich::infra::credentials::provider_for;
use geo_enrich::infra::csv_io::{load_input, write_output};
use geo_enrich::infra::locallogic::LocalLogicClient;
use geo_enrich::infra::pacer::FixedDelayPacer;
use geo_enrich::logging;
use geo_enrich::observability::metrics::init_metrics;
use geo_enrich::pipeline::normalize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "geo_enrich")]
#[command(about = "Enrich a latitude/longitude table with Local Logic neighborhood data")]
#[command(version = "0.1.0")]
struct Cli {
    /// CSV or .xlsx file with `latitude` and `longitude` columns
    #[arg(long)]
    input: PathBuf,
    /// Where to write the enriched table
    #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
    output: PathBuf,
    /// Optional TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Delay between rows in milliseconds (overrides config)
    #[arg(long)]
    delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging();
    let metrics = init_metrics()?;

    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(delay_ms) = cli.delay_ms {
        config.pacing.delay_ms = delay_ms;
    }
    let auth = config.auth.method()?;

    let table = load_input(&cli.input)
        .with_context(|| format!("loading input {}", cli.input.display()))?;

    let http = LocalLogicClient::http_client(&config.api)?;
    let credentials = provider_for(auth, http.clone());
    let geodata = Arc::new(LocalLogicClient::new(http, credentials, &config.api));
    let pacer = Arc::new(FixedDelayPacer(config.pacing.delay()));

    info!(
        "Using {} (level {}, POI radius {})",
        config.api.base_url, config.api.geography_level, config.api.poi_radius
    );
    let run = EnrichUseCase::new(geodata, pacer).run(&table.rows).await;

    let flat = normalize(&table, &run.records)?;
    write_output(&cli.output, &flat)
        .with_context(|| format!("writing output {}", cli.output.display()))?;

    info!("Run metrics:\n{}", metrics.render());

    println!("\n📊 Enrichment results:");
    println!("   Rows: {}", run.summary.total_rows);
    println!("   Geographies resolved: {}", run.summary.geographies_resolved);
    println!("   Lookup chain failures: {}", run.summary.chain_failures);
    println!("   POI failures: {}", run.summary.poi_failures);
    println!("   Columns: {}", flat.columns.len());
    println!("✅ Saved as {}", cli.output.display());

    Ok(())
}
