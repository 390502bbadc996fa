//! `caches`, `entries` and `purge`.

use std::io::Write;

use anyhow::{Result, bail};
use floodline_core::{CacheDb, CacheStore};

use super::{Format, human_bytes, print_json};

pub async fn list(db: &CacheDb, format: Format, out: &mut impl Write) -> Result<()> {
    let summaries = db.cache_summaries().await?;

    if format == Format::Json {
        return print_json(out, &serde_json::to_value(&summaries)?);
    }

    if summaries.is_empty() {
        writeln!(out, "no caches")?;
        return Ok(());
    }
    writeln!(out, "{:<28} {:>8} {:>12}", "CACHE", "ENTRIES", "SIZE")?;
    for summary in &summaries {
        writeln!(out, "{:<28} {:>8} {:>12}", summary.name, summary.entries, human_bytes(summary.bytes))?;
    }
    Ok(())
}

pub async fn entries(db: &CacheDb, cache: &str, format: Format, out: &mut impl Write) -> Result<()> {
    let entries = db.list_entries(cache).await?;

    if format == Format::Json {
        return print_json(out, &serde_json::to_value(&entries)?);
    }

    for entry in &entries {
        writeln!(
            out,
            "{:<6} {:>3} {:>10}  {}  {}",
            entry.method,
            entry.status,
            human_bytes(entry.size),
            entry.stored_at,
            entry.url
        )?;
    }
    writeln!(out, "{} entries in {cache}", entries.len())?;
    Ok(())
}

pub async fn purge(db: &CacheDb, cache: &str, out: &mut impl Write) -> Result<()> {
    if !db.delete_cache(cache).await? {
        bail!("no cache named {cache}");
    }
    writeln!(out, "deleted {cache}")?;
    Ok(())
}
