//! `install` and `activate`.

use std::io::Write;

use anyhow::Result;
use floodline_core::{AppConfig, CacheDb};

use super::{Format, print_json, worker};

pub async fn install(config: &AppConfig, db: &CacheDb, format: Format, out: &mut impl Write) -> Result<()> {
    let report = worker(config, db)?.install().await?;

    if format == Format::Json {
        return print_json(out, &serde_json::to_value(&report)?);
    }

    for path in &report.cached {
        writeln!(out, "cached  {path}")?;
    }
    for path in &report.failed {
        writeln!(out, "failed  {path}")?;
    }
    writeln!(out, "{} cached, {} failed", report.cached.len(), report.failed.len())?;
    Ok(())
}

pub async fn activate(config: &AppConfig, db: &CacheDb, out: &mut impl Write) -> Result<()> {
    let deleted = worker(config, db)?.activate().await?;

    if deleted.is_empty() {
        writeln!(out, "no stale caches")?;
    }
    for name in &deleted {
        writeln!(out, "deleted {name}")?;
    }
    Ok(())
}
