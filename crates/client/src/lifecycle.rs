//! Install and activate phases.
//!
//! Install seeds the static cache from the asset manifest on a best-effort
//! basis. Activate removes every cache generation that does not belong to
//! the current version.

use std::fmt;

use floodline_core::{CacheNames, CacheStore, Error};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use crate::fetch::resolve;
use crate::http::Request;
use crate::strategy::StrategyContext;

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Constructed, nothing run yet.
    Parsed,
    Installing,
    /// Install finished; waiting is skipped so activation may follow at once.
    Installed,
    Activating,
    /// Controlling clients and intercepting fetches.
    Activated,
    /// Replaced or failed.
    Redundant,
}

impl WorkerState {
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// Outcome of seeding the static cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    /// Manifest paths now in the static cache.
    pub cached: Vec<String>,
    /// Manifest paths that could not be fetched or returned a non-200.
    pub failed: Vec<String>,
}

/// Fetch every manifest path and store the 200 responses in the static
/// cache. Individual failures are logged and skipped; only failing to open
/// the static cache is an error.
pub async fn install(ctx: &StrategyContext, manifest: &[String]) -> Result<InstallReport, Error> {
    let static_name = ctx.names.static_name.as_str();
    ctx.store.open(static_name).await?;

    let preloads = manifest.iter().map(|path| async move {
        let url = match resolve(&ctx.origin, path) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(path = %path, error = %e, "manifest entry is not a valid path");
                return (path.clone(), false);
            }
        };

        let request = Request::get(url);
        match ctx.fetcher.fetch(&request).await {
            Ok(response) if response.is_ok() => {
                ctx.persist(static_name, &request, &response).await;
                (path.clone(), true)
            }
            Ok(response) => {
                tracing::error!(path = %path, status = response.status.as_u16(), "manifest preload rejected");
                (path.clone(), false)
            }
            Err(e) => {
                tracing::error!(path = %path, error = %e, "manifest preload failed");
                (path.clone(), false)
            }
        }
    });

    let mut report = InstallReport::default();
    for (path, ok) in join_all(preloads).await {
        if ok {
            report.cached.push(path);
        } else {
            report.failed.push(path);
        }
    }

    tracing::info!(
        cache = static_name,
        cached = report.cached.len(),
        failed = report.failed.len(),
        "static cache seeded"
    );
    Ok(report)
}

/// Delete every cache that is neither the current static nor the current
/// dynamic cache. Returns the deleted names.
pub async fn activate(store: &dyn CacheStore, names: &CacheNames) -> Result<Vec<String>, Error> {
    let mut deleted = Vec::new();

    for name in store.cache_names().await? {
        if names.is_current(&name) {
            continue;
        }
        if store.delete_cache(&name).await? {
            tracing::info!(cache = %name, "deleted stale cache");
            deleted.push(name);
        }
    }

    Ok(deleted)
}
