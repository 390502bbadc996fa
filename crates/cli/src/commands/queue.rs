//! `queue` and `sync`.

use std::io::Write;

use anyhow::Result;
use floodline_core::{AppConfig, CacheDb};

use super::{Format, human_bytes, print_json, worker};

pub async fn list(db: &CacheDb, format: Format, out: &mut impl Write) -> Result<()> {
    let pending = db.pending_writes(None).await?;

    if format == Format::Json {
        return print_json(out, &serde_json::to_value(&pending)?);
    }

    if pending.is_empty() {
        writeln!(out, "queue is empty")?;
        return Ok(());
    }
    for write in &pending {
        writeln!(
            out,
            "#{:<5} {:<18} {:<6} {}  {}  attempts={}{}",
            write.id,
            write.tag,
            write.method,
            write.url,
            human_bytes(write.body.len() as u64),
            write.attempts,
            write.last_error.as_deref().map(|e| format!("  last_error={e}")).unwrap_or_default()
        )?;
    }
    Ok(())
}

pub async fn sync(config: &AppConfig, db: &CacheDb, tag: &str, format: Format, out: &mut impl Write) -> Result<()> {
    let report = worker(config, db)?.on_sync(tag).await?;

    if format == Format::Json {
        return print_json(out, &serde_json::to_value(report)?);
    }
    writeln!(out, "replayed {}, remaining {}, dropped {}", report.replayed, report.remaining, report.dropped)?;
    Ok(())
}
