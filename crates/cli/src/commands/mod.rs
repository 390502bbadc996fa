//! Subcommand implementations. Each writes its output to `out` so it can
//! be checked in tests.

pub mod caches;
pub mod lifecycle;
pub mod queue;

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use floodline_client::{FetchClient, FetchConfig, Fetcher, OfflineWorker, RecordingPlatform};
use floodline_core::{AppConfig, CacheDb};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Table,
    Json,
}

/// A worker over the on-disk database, talking to the configured origin.
fn worker(config: &AppConfig, db: &CacheDb) -> Result<OfflineWorker> {
    let fetcher: Arc<dyn Fetcher> = Arc::new(FetchClient::new(FetchConfig::from(config))?);
    let worker =
        OfflineWorker::new(config, Arc::new(db.clone()), db.clone(), fetcher, Arc::new(RecordingPlatform::new()))?;
    Ok(worker)
}

fn print_json(out: &mut impl Write, value: &Value) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn human_bytes(bytes: u64) -> String {
    match bytes {
        b if b >= 1024 * 1024 => format!("{:.1} MiB", b as f64 / (1024.0 * 1024.0)),
        b if b >= 1024 => format!("{:.1} KiB", b as f64 / 1024.0),
        b => format!("{b} B"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.0 KiB");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.0 MiB");
    }
}
