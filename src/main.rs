use clap::Parser;
use dge_engine::application::financing::{FinancingConfig, FinancingEngine};
use dge_engine::application::orchestrator::Orchestrator;
use dge_engine::domain::ports::{EventNotifierBox, ExporterHistoryBox, ListingStoreBox};
use dge_engine::domain::stage_graph::StageGraph;
use dge_engine::infrastructure::in_memory::{
    InMemoryExporterHistory, InMemoryListingStore, NoopNotifier,
};
use dge_engine::interfaces::csv::listing_writer::ListingWriter;
use dge_engine::interfaces::csv::request_reader::{IntakeReader, RequestReader};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// CSV file of exporter listing intakes
    listings: PathBuf,

    /// CSV file of transition requests to apply in order
    requests: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Bound on optimistic commit retries per request
    #[arg(long, default_value_t = dge_engine::application::orchestrator::DEFAULT_MAX_RETRIES)]
    max_retries: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let store: ListingStoreBox = make_store(&cli)?;
    let history: ExporterHistoryBox = Box::new(InMemoryExporterHistory::new());
    let notifier: EventNotifierBox = Box::new(NoopNotifier);
    let orchestrator = Orchestrator::new(
        store,
        Arc::new(StageGraph::standard()),
        FinancingEngine::new(FinancingConfig::default(), history),
        notifier,
    )
    .with_max_retries(cli.max_retries);

    let listings = File::open(&cli.listings).into_diagnostic()?;
    for intake in IntakeReader::new(listings).intakes() {
        match intake {
            Ok(intake) => {
                if let Err(e) = orchestrator.submit_listing(intake).await {
                    eprintln!("Error submitting listing: {e}");
                }
            }
            Err(e) => eprintln!("Error reading intake row: {e}"),
        }
    }

    let requests = File::open(&cli.requests).into_diagnostic()?;
    for request in RequestReader::new(requests).requests() {
        match request {
            Ok(request) => {
                if let Err(e) = orchestrator.submit_transition(request).await {
                    eprintln!("Error applying transition: {e}");
                }
            }
            Err(e) => eprintln!("Error reading request row: {e}"),
        }
    }

    let final_state = orchestrator.listings().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = ListingWriter::new(stdout.lock());
    writer.write_listings(&final_state).into_diagnostic()?;

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn make_store(cli: &Cli) -> Result<ListingStoreBox> {
    use dge_engine::infrastructure::rocksdb::RocksDbListingStore;
    Ok(match &cli.db_path {
        Some(path) => Box::new(RocksDbListingStore::open(path).into_diagnostic()?),
        None => Box::new(InMemoryListingStore::new()),
    })
}

#[cfg(not(feature = "storage-rocksdb"))]
fn make_store(_cli: &Cli) -> Result<ListingStoreBox> {
    Ok(Box::new(InMemoryListingStore::new()))
}
