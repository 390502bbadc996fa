//! The offline worker: lifecycle state plus the event handlers a host
//! dispatches into it (fetch, sync, push, notification click).

use std::sync::Arc;

use floodline_core::{AppConfig, CacheDb, CacheNames, CacheStore, Error};
use tokio::sync::watch;
use url::Url;

use crate::fetch::{Fetcher, canonicalize};
use crate::http::{Request, Response};
use crate::lifecycle::{self, InstallReport, WorkerState};
use crate::platform::Platform;
use crate::push::{ClickOutcome, Notification, PushMessage, build_notification, resolve_click};
use crate::router::{Route, Router};
use crate::strategy::StrategyContext;
use crate::sync::{BackgroundSync, FLOOD_REPORT_SYNC, SyncReport, queued_response, with_idempotency_key};

pub struct OfflineWorker {
    router: Router,
    ctx: StrategyContext,
    manifest: Vec<String>,
    sync: BackgroundSync,
    platform: Arc<dyn Platform>,
    state: watch::Sender<WorkerState>,
}

impl OfflineWorker {
    /// Build a worker for `config`. Responses are cached in `store`; the
    /// sync queue lives in `queue`.
    pub fn new(
        config: &AppConfig, store: Arc<dyn CacheStore>, queue: CacheDb, fetcher: Arc<dyn Fetcher>,
        platform: Arc<dyn Platform>,
    ) -> Result<Self, Error> {
        let origin = canonicalize(&config.origin)?;
        let router = Router::new(&config.api_patterns)?;
        let sync =
            BackgroundSync::new(queue, Arc::clone(&fetcher), &config.sync_patterns, config.max_sync_attempts)?;
        let ctx = StrategyContext::new(store, fetcher, config.cache_names(), &config.vary_headers, origin);
        let (state, _) = watch::channel(WorkerState::Parsed);

        Ok(Self { router, ctx, manifest: config.static_manifest.clone(), sync, platform, state })
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    pub fn names(&self) -> &CacheNames {
        &self.ctx.names
    }

    pub fn origin(&self) -> &Url {
        &self.ctx.origin
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.ctx.store
    }

    pub fn background_sync(&self) -> &BackgroundSync {
        &self.sync
    }

    fn transition(&self, next: WorkerState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::info!(from = %previous, to = %next, version = %self.ctx.names.version, "worker state changed");
        }
    }

    /// Seed the static cache, then skip waiting.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(WorkerState::Installing);
        match lifecycle::install(&self.ctx, &self.manifest).await {
            Ok(report) => {
                self.transition(WorkerState::Installed);
                Ok(report)
            }
            Err(e) => {
                self.transition(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    /// Delete stale caches and take control of clients. Returns the
    /// deleted cache names.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        let previous = self.state();
        self.transition(WorkerState::Activating);

        let outcome = async {
            let deleted = lifecycle::activate(self.ctx.store.as_ref(), &self.ctx.names).await?;
            self.platform.claim_clients().await?;
            Ok::<_, Error>(deleted)
        }
        .await;

        match outcome {
            Ok(deleted) => {
                self.transition(WorkerState::Activated);
                Ok(deleted)
            }
            Err(e) => {
                tracing::warn!(error = %e, "activation failed");
                self.transition(previous);
                Err(e)
            }
        }
    }

    /// Answer a request the page made.
    ///
    /// Until activation every request goes straight to the network. After
    /// that, GET requests are routed to a strategy and everything else is
    /// passed through.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Response, Error> {
        if !self.state().can_intercept_fetch() {
            return self.passthrough(request).await;
        }

        match self.router.route(request) {
            Route::Passthrough => self.passthrough(request).await,
            Route::Strategy(kind) => {
                tracing::debug!(url = %request.url, strategy = ?kind, "intercepted");
                self.ctx.respond(kind, request).await
            }
        }
    }

    /// Forward `request` uncached.
    ///
    /// A sync-eligible write is sent with an idempotency key. If it cannot
    /// reach the origin it is queued under that key and acknowledged
    /// with 202.
    pub async fn passthrough(&self, request: &Request) -> Result<Response, Error> {
        if !self.sync.should_queue(request) {
            return self.ctx.fetcher.fetch(request).await;
        }

        let keyed = with_idempotency_key(request);
        match self.ctx.fetcher.fetch(&keyed).await {
            Err(e) if e.is_network_unavailable() => match self.sync.enqueue(FLOOD_REPORT_SYNC, &keyed).await {
                Ok(write) => Ok(queued_response(&write)),
                Err(queue_err) => {
                    tracing::warn!(url = %request.url, error = %queue_err, "could not queue offline write");
                    Err(e)
                }
            },
            other => other,
        }
    }

    /// Replay queued writes for `tag`.
    pub async fn on_sync(&self, tag: &str) -> Result<SyncReport, Error> {
        self.sync.replay(tag).await
    }

    /// Show a flood alert for `message`. Returns once the platform has
    /// shown it.
    pub async fn on_push(&self, message: &PushMessage) -> Result<Notification, Error> {
        let notification = build_notification(message);
        self.platform.show_notification(&notification).await?;
        Ok(notification)
    }

    pub async fn on_notification_click(
        &self, notification: &Notification, action: Option<&str>,
    ) -> Result<ClickOutcome, Error> {
        let outcome = resolve_click(notification, action);
        if let ClickOutcome::OpenWindow(url) = &outcome {
            self.platform.open_window(url).await?;
        }
        Ok(outcome)
    }
}
