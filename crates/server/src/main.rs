//! floodline server entry point.
//!
//! Boots the offline worker, runs install and activate, then serves every
//! inbound HTTP request as a fetch event. Logging goes to stderr as JSON.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use floodline_client::{FLOOD_REPORT_SYNC, FetchClient, FetchConfig, Fetcher, OfflineWorker, RecordingPlatform};
use floodline_core::{AppConfig, CacheDb, CacheStore, MemoryStore};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod admin;
mod error;
mod handler;

use handler::AppState;

#[derive(Debug, Parser)]
#[command(name = "floodline-server", version, about = "Offline caching intermediary for the flood-management app")]
struct Args {
    /// TOML config file (overrides FLOODLINE_CONFIG_FILE).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep caches and the sync queue in memory only.
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    let state = Arc::new(build_state(&config, args.ephemeral).await?);

    let report = state.worker.install().await?;
    if !report.failed.is_empty() {
        tracing::warn!(failed = ?report.failed, "some manifest assets were not preloaded");
    }
    state.worker.activate().await?;

    if let Some(interval) = config.sync_interval() {
        tokio::spawn(sync_loop(Arc::clone(&state), interval));
    }

    let addr: SocketAddr = config.listen_addr.parse().context("listen_addr")?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, origin = %config.origin, version = %config.cache_version, "floodline listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                let io = TokioIo::new(stream);
                let state = Arc::clone(&state);

                tokio::spawn(async move {
                    let service = service_fn(move |req| handler::serve(req, Arc::clone(&state)));
                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        tracing::debug!(%peer, error = %e, "connection closed with error");
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                return Ok(());
            }
        }
    }
}

async fn build_state(config: &AppConfig, ephemeral: bool) -> Result<AppState> {
    let (store, queue): (Arc<dyn CacheStore>, CacheDb) = if ephemeral {
        (Arc::new(MemoryStore::new()), CacheDb::open_in_memory().await?)
    } else {
        let db = CacheDb::open(&config.db_path)
            .await
            .with_context(|| format!("opening {}", config.db_path.display()))?;
        (Arc::new(db.clone()), db)
    };

    let fetcher: Arc<dyn Fetcher> = Arc::new(FetchClient::new(FetchConfig::from(config))?);
    let platform = Arc::new(RecordingPlatform::new());
    let worker = OfflineWorker::new(config, store, queue, fetcher, platform.clone())?;

    Ok(AppState { worker, platform, max_body_bytes: config.max_bytes })
}

/// Replay the flood report queue every `interval`.
async fn sync_loop(state: Arc<AppState>, interval: std::time::Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match state.worker.on_sync(FLOOD_REPORT_SYNC).await {
            Ok(report) if report.replayed > 0 || report.dropped > 0 => {
                tracing::info!(
                    replayed = report.replayed,
                    remaining = report.remaining,
                    dropped = report.dropped,
                    "periodic sync"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "periodic sync failed"),
        }
    }
}
