//! Attachment Search RPC Server - JSON-RPC backend for the search surface.
//!
//! Hosts the attachment index, keeps it up to date on a timer, and answers
//! `search`/`goto` protocol messages over HTTP.

mod handlers;
mod navigator;
mod server;

use anyhow::{Context, Result};
use attachment_search::config::{DataApiConfig, IndexConfig};
use attachment_search::{AttachmentSearch, DataApiClient, OrphanPolicy};
use clap::Parser;
use navigator::StdoutNavigator;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "attachment-search-rpc")]
#[command(about = "JSON-RPC server for attachment full-text search")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Directory for the index database (defaults to the user data dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory where the host stores attachment files
    #[arg(long)]
    resource_dir: PathBuf,

    /// Base URL of the host's data API
    #[arg(long, default_value = DataApiConfig::DEFAULT_URL)]
    data_api_url: String,

    /// Token for the host's data API
    #[arg(long)]
    data_api_token: Option<String>,

    /// Seconds between index updates (0 disables the timer)
    #[arg(long, default_value_t = IndexConfig::DEFAULT_INTERVAL.as_secs())]
    index_interval_secs: u64,

    /// Leave out matches that no note references
    #[arg(long)]
    omit_orphans: bool,

    /// Re-examine unsupported attachments on every update
    #[arg(long)]
    recheck_unsupported: bool,
}

fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("attachment-search"))
        .context("Could not determine a data directory; pass --data-dir")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Attachment Search RPC Server");

    let data_dir = match args.data_dir {
        Some(path) => path,
        None => default_data_dir()?,
    };
    info!("Data directory: {}", data_dir.display());
    info!("Resource directory: {}", args.resource_dir.display());

    let data_api = Arc::new(
        DataApiClient::new(&args.data_api_url, args.data_api_token)
            .context("Invalid data API configuration")?,
    );
    let orphan_policy = if args.omit_orphans {
        OrphanPolicy::Omit
    } else {
        OrphanPolicy::Include
    };

    let search = AttachmentSearch::builder(&data_dir, &args.resource_dir)
        .catalog(data_api.clone())
        .notes(data_api)
        .navigator(Arc::new(StdoutNavigator))
        .orphan_policy(orphan_policy)
        .mark_unsupported_indexed(!args.recheck_unsupported)
        .build()
        .context("Failed to open attachment index")?;

    let scheduler = (args.index_interval_secs > 0).then(|| {
        search.start_scheduler(Duration::from_secs(args.index_interval_secs))
    });

    let addr = server::start_server(search, &args.host, args.port).await?;

    // Print port for the host shell to read (intentional stdout for IPC)
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    if let Some(scheduler) = scheduler {
        scheduler.join().await;
    }

    Ok(())
}
