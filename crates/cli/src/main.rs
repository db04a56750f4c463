//! CLI for the Vantage Solana explorer data core.
//!
//! Every command builds one client over the configured endpoint pool, runs a
//! single query and prints either a text report or JSON.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::{Duration, Instant};
use vantage_analyzer::reporter::{self, BlockReport};
use vantage_analyzer::sink::json_stream::JsonStreamSink;
use vantage_analyzer::sink::{unix_now, BlockRow, SinkTarget, WindowRow};
use vantage_analyzer::{aggregate_windows, BlockFeed};
use vantage_core::config::{ClientConfig, DEFAULT_RPC_URL};
use vantage_core::EndpointRegistry;
use vantage_provider::ExplorerClient;

#[derive(Parser, Debug)]
#[command(name = "vantage", version, about = "Solana explorer data core")]
struct Cli {
    /// RPC endpoint, optionally with auth headers: `URL|Header:Value`.
    /// Repeat for failover, in priority order.
    #[arg(
        long = "rpc-url",
        env = "VANTAGE_RPC_URLS",
        value_delimiter = ',',
        default_value = DEFAULT_RPC_URL,
        global = true
    )]
    rpc_urls: Vec<String>,

    /// Per-attempt timeout in milliseconds.
    #[arg(long, default_value_t = 5_000, global = true)]
    timeout_ms: u64,

    /// Block fetches in flight at once.
    #[arg(long, default_value_t = 8, global = true)]
    max_concurrent_blocks: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Network dashboard: slot, epoch, throughput, supply, stake.
    Snapshot {
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Newest blocks, classified by transaction category.
    Blocks {
        #[arg(short, long, default_value_t = 10)]
        count: usize,

        #[arg(long, default_value_t = false)]
        json: bool,

        /// Sink output: "ndjson" writes NDJSON to stdout,
        /// "ndjson:/path/to/file" writes to file.
        #[arg(long)]
        sink: Option<String>,
    },

    /// Throughput windows split by the ratio seen in recent blocks.
    Windows {
        /// Performance samples to fetch (one per minute).
        #[arg(long, default_value_t = 60)]
        samples: usize,

        /// Samples per window.
        #[arg(long, default_value_t = 10)]
        window: usize,

        /// Recent blocks used to learn the category ratio.
        #[arg(long, default_value_t = 10)]
        blocks: usize,

        #[arg(long, default_value_t = false)]
        json: bool,

        #[arg(long)]
        sink: Option<String>,
    },

    /// Validators by stake, with identities and skip rates.
    Validators {
        #[arg(short, long, default_value_t = 25)]
        limit: usize,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Balance, owner and recent signatures of an address.
    Account {
        address: String,

        #[arg(long, default_value_t = 10)]
        signatures: usize,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Largest holders of an SPL token mint.
    Holders {
        mint: String,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let registry = EndpointRegistry::parse(&cli.rpc_urls)?;
    let mut config = ClientConfig::default();
    config.dispatcher.request_timeout = Duration::from_millis(cli.timeout_ms);
    config.feed.max_concurrent_blocks = cli.max_concurrent_blocks;
    let client = ExplorerClient::connect(registry, &config)?;
    let endpoints = client.rpc.dispatcher().endpoints();
    tracing::info!(
        endpoints = endpoints.len(),
        primary = %endpoints.get(0),
        timeout_ms = cli.timeout_ms,
        "connected"
    );

    match cli.command {
        Commands::Snapshot { json } => {
            let snapshot = client.snapshots.get_snapshot().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print!("{}", reporter::render_snapshot(&snapshot));
            }
        }

        Commands::Blocks { count, json, sink } => {
            let t0 = Instant::now();
            let feed = BlockFeed::new(Arc::new(client.rpc.clone()), &config.feed);
            let blocks = feed.recent_blocks(count).await?;
            let fetch_time = t0.elapsed();
            tracing::info!(
                blocks = blocks.len(),
                elapsed_ms = fetch_time.as_millis(),
                "fetched blocks"
            );

            let report = BlockReport::build(&blocks, fetch_time);
            if let Some(ref spec) = sink {
                let target: SinkTarget = spec.parse()?;
                let now = unix_now();
                let rows: Vec<BlockRow> = blocks.iter().map(|b| BlockRow::new(b, now)).collect();
                let mut s = JsonStreamSink::open(&target)?;
                s.write_rows(&rows)?;
                let n = s.finish()?;
                tracing::info!(rows = n, ?target, "ndjson sink: wrote block rows");

                // Still print report to stderr so it's visible.
                eprint!("{}", report.render());
            } else if json {
                println!("{}", serde_json::to_string_pretty(&blocks)?);
            } else {
                print!("{}", report.render());
            }
        }

        Commands::Windows {
            samples,
            window,
            blocks,
            json,
            sink,
        } => {
            let feed = BlockFeed::new(Arc::new(client.rpc.clone()), &config.feed);
            let (history, ratio) = tokio::join!(
                client.rpc.get_recent_performance_samples(samples),
                feed.window_ratio(blocks),
            );
            let buckets = aggregate_windows(&history?, window, &ratio);
            tracing::info!(windows = buckets.len(), vote_ratio = ratio.vote, "aggregated windows");

            if let Some(ref spec) = sink {
                let target: SinkTarget = spec.parse()?;
                let now = unix_now();
                let rows: Vec<WindowRow> = buckets.iter().map(|b| WindowRow::new(b, now)).collect();
                let mut s = JsonStreamSink::open(&target)?;
                s.write_rows(&rows)?;
                let n = s.finish()?;
                tracing::info!(rows = n, ?target, "ndjson sink: wrote window rows");
                eprint!("{}", reporter::render_windows(&buckets));
            } else if json {
                println!("{}", serde_json::to_string_pretty(&buckets)?);
            } else {
                print!("{}", reporter::render_windows(&buckets));
            }
        }

        Commands::Validators { limit, json } => {
            // Names are cosmetic; the table still renders without them.
            if let Err(e) = client.identities.initialize().await {
                tracing::warn!(error = %e, "identity directory unavailable");
            }
            let mut validators = client.validators.list().await?;
            validators.truncate(limit);
            if json {
                println!("{}", serde_json::to_string_pretty(&validators)?);
            } else {
                print!("{}", reporter::render_validators(&validators));
            }
        }

        Commands::Account {
            address,
            signatures,
            json,
        } => {
            let overview = client.accounts.account_overview(&address, signatures).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&overview)?);
            } else {
                print!("{}", reporter::render_account(&overview));
            }
        }

        Commands::Holders { mint, limit, json } => {
            let holders = client.accounts.token_holders(&mint, limit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&holders)?);
            } else {
                print!("{}", reporter::render_holders(&holders));
            }
        }
    }

    let stats = client.rpc.dispatcher().stats();
    tracing::debug!(
        requests = stats.requests,
        cache_hits = stats.cache_hits,
        attempts = stats.attempts,
        failovers = stats.failovers,
        "dispatcher stats"
    );

    Ok(())
}
