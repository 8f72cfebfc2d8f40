// src/main.rs

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use herald::config::CoverageConfig;
use herald::coverage::sqlite::SqliteCoverageStore;
use herald::coverage::types::{CandidateItem, CandidateSource, CoverageGap};
use herald::engine::CoverageEngine;
use herald::events::{RoomEvent, spawn_event_consumer};
use herald::metrics::spawn_reporter;
use herald::registry::DestinationRegistry;

#[derive(Parser, Debug)]
#[command(name = "herald", about = "Coverage safeguard engine for an automated room presence")]
struct Args {
    /// SQLite database URL
    #[arg(long, env = "HERALD_DATABASE_URL", default_value = "sqlite:./herald.db")]
    database_url: String,

    /// TOML file with the registered destinations
    #[arg(long, env = "HERALD_ROOMS_FILE", default_value = "rooms.toml")]
    rooms: PathBuf,

    /// Optional JSON file with current candidate items, re-read every tick
    #[arg(long, env = "HERALD_CANDIDATES_FILE")]
    candidates: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "HERALD_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// Candidate feed backed by a JSON file the selection component keeps
/// fresh. Missing or unparsable file means no candidates this tick.
struct JsonFileCandidates {
    path: Option<PathBuf>,
}

#[async_trait]
impl CandidateSource for JsonFileCandidates {
    async fn candidates(&self) -> Vec<CandidateItem> {
        let Some(path) = &self.path else {
            return Vec::new();
        };
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(items) => items,
                Err(e) => {
                    warn!("Ignoring invalid candidates file {}: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = Level::from_str(&args.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting herald coverage engine");

    let config = CoverageConfig::from_env();
    config.validate()?;
    info!("{}", config.summary());

    // Storage
    let connect_options =
        SqliteConnectOptions::from_str(&args.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await?;
    let backend = Arc::new(SqliteCoverageStore::new(pool));
    backend.init_schema().await?;

    // Destinations
    let registry = Arc::new(DestinationRegistry::from_toml_file(&args.rooms)?);
    if registry.is_empty() {
        warn!("No destinations registered, the pump will idle");
    }

    // Engine
    let engine = Arc::new(CoverageEngine::new(config, registry, backend));
    let hydrated = engine.hydrate().await?;
    info!("Hydrated {} coverage records", hydrated);

    // Eligibility signals out. The content-selection component would
    // consume these; the daemon just surfaces them on the log.
    let (gap_tx, mut gap_rx) = mpsc::channel::<CoverageGap>(64);
    let gap_logger = tokio::spawn(async move {
        while let Some(gap) = gap_rx.recv().await {
            info!("Coverage gap: '{}' is awaiting a broadcast decision", gap.destination_id);
        }
    });

    // Events in: newline-delimited JSON on stdin, one RoomEvent per line.
    let (event_tx, event_rx) = mpsc::channel(256);
    let consumer = spawn_event_consumer(engine.clone(), event_rx);
    let stdin_reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<RoomEvent>(line) {
                        Ok(event) => {
                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Skipping malformed event line: {}", e),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read event stream: {}", e);
                    break;
                }
            }
        }
        info!("Event intake closed");
    });

    let candidates = Arc::new(JsonFileCandidates {
        path: args.candidates,
    });
    let pump = engine.spawn_pump(candidates, gap_tx);
    let reporter = spawn_reporter(engine.metrics(), std::time::Duration::from_secs(3600));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = pump => {
            error!("Coverage pump unexpectedly terminated");
        }
    }

    consumer.abort();
    stdin_reader.abort();
    gap_logger.abort();
    reporter.abort();
    info!("herald stopped");
    Ok(())
}
