//! Background sync of writes made while offline.
//!
//! A mutating request to a sync path is sent with an `Idempotency-Key`.
//! If it cannot reach the origin it is queued under that same key and
//! acknowledged with 202. A later replay resubmits queued writes in order
//! with the key, so the origin can discard a write it already received.

use std::sync::Arc;

use floodline_core::cache::{NewPendingWrite, new_idempotency_key};
use floodline_core::{CacheDb, Error, PendingWrite};
use regex::RegexSet;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

use crate::fetch::Fetcher;
use crate::http::{HOP_BY_HOP, Request, Response};

/// Tag under which flood reports are queued.
pub const FLOOD_REPORT_SYNC: &str = "flood-report-sync";

pub const IDEMPOTENCY_KEY: &str = "idempotency-key";

const QUEUED_MESSAGE: &str = "Saved offline. It will be sent when the connection returns.";

/// Outcome of one replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Accepted by the origin and removed.
    pub replayed: usize,
    /// Still queued after the replay.
    pub remaining: usize,
    /// Removed after reaching the attempt limit or being unreadable.
    pub dropped: usize,
}

enum Attempt {
    Accepted,
    Rejected(String),
    Offline(String),
}

/// Queue of offline writes and their replay.
pub struct BackgroundSync {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    patterns: RegexSet,
    max_attempts: u32,
    replay_lock: Mutex<()>,
}

impl BackgroundSync {
    pub fn new(db: CacheDb, fetcher: Arc<dyn Fetcher>, patterns: &[String], max_attempts: u32) -> Result<Self, Error> {
        let patterns = RegexSet::new(patterns).map_err(|e| Error::InvalidInput(format!("sync pattern: {e}")))?;
        Ok(Self { db, fetcher, patterns, max_attempts, replay_lock: Mutex::new(()) })
    }

    /// Whether a failed `request` should be queued instead of reported.
    pub fn should_queue(&self, request: &Request) -> bool {
        let mutating = matches!(request.method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE);
        mutating && self.patterns.is_match(request.url.path())
    }

    /// Queue `request` under the key it was sent with, or a fresh key if
    /// it carried none.
    pub async fn enqueue(&self, tag: &str, request: &Request) -> Result<PendingWrite, Error> {
        let idempotency_key = idempotency_key(request).map_or_else(new_idempotency_key, str::to_string);
        let headers = request
            .headers
            .iter()
            .filter(|(name, _)| {
                !HOP_BY_HOP.contains(&name.as_str()) && name.as_str() != "host" && name.as_str() != IDEMPOTENCY_KEY
            })
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();

        let write = self
            .db
            .enqueue_write(NewPendingWrite {
                tag: tag.to_string(),
                idempotency_key,
                method: request.method.as_str().to_string(),
                url: request.url.to_string(),
                headers,
                body: request.body.to_vec(),
            })
            .await?;

        tracing::info!(tag, id = write.id, url = %write.url, "write queued for sync");
        Ok(write)
    }

    pub async fn pending(&self, tag: Option<&str>) -> Result<Vec<PendingWrite>, Error> {
        self.db.pending_writes(tag).await
    }

    /// Resubmit every queued write for `tag`, oldest first.
    ///
    /// Concurrent calls run one after another. The drain stops at the
    /// first write the network could not deliver.
    pub async fn replay(&self, tag: &str) -> Result<SyncReport, Error> {
        let _guard = self.replay_lock.lock().await;
        let mut report = SyncReport::default();

        for write in self.db.pending_writes(Some(tag)).await? {
            let request = match rebuild(&write) {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!(id = write.id, error = %e, "dropping unreadable queued write");
                    self.db.remove_write(write.id).await?;
                    report.dropped += 1;
                    continue;
                }
            };

            match self.attempt(&request).await {
                Attempt::Accepted => {
                    self.db.remove_write(write.id).await?;
                    report.replayed += 1;
                }
                Attempt::Rejected(reason) => {
                    let attempts = self.db.record_write_failure(write.id, &reason).await?;
                    if attempts >= self.max_attempts {
                        tracing::warn!(
                            id = write.id,
                            url = %write.url,
                            attempts,
                            reason = %reason,
                            "dropping queued write"
                        );
                        self.db.remove_write(write.id).await?;
                        report.dropped += 1;
                    } else {
                        tracing::debug!(id = write.id, attempts, reason = %reason, "queued write rejected");
                    }
                }
                Attempt::Offline(reason) => {
                    tracing::debug!(id = write.id, reason = %reason, "origin unreachable, replay paused");
                    break;
                }
            }
        }

        report.remaining = self.db.pending_writes(Some(tag)).await?.len();
        tracing::info!(
            tag,
            replayed = report.replayed,
            remaining = report.remaining,
            dropped = report.dropped,
            "sync replay finished"
        );
        Ok(report)
    }

    async fn attempt(&self, request: &Request) -> Attempt {
        match self.fetcher.fetch(request).await {
            Ok(response) if response.status.is_success() => Attempt::Accepted,
            Ok(response) => Attempt::Rejected(format!("origin returned {}", response.status)),
            Err(e) if e.is_network_unavailable() => Attempt::Offline(e.to_string()),
            Err(e) => Attempt::Rejected(e.to_string()),
        }
    }
}

fn idempotency_key(request: &Request) -> Option<&str> {
    request.headers.get(IDEMPOTENCY_KEY)?.to_str().ok().filter(|key| !key.is_empty())
}

/// Copy of `request` carrying an `Idempotency-Key`. A key the page already
/// sent is kept.
pub fn with_idempotency_key(request: &Request) -> Request {
    let mut keyed = request.clone();
    if idempotency_key(request).is_none()
        && let Ok(value) = HeaderValue::from_str(&new_idempotency_key())
    {
        keyed.headers.insert(IDEMPOTENCY_KEY, value);
    }
    keyed
}

fn rebuild(write: &PendingWrite) -> Result<Request, Error> {
    let method = Method::from_bytes(write.method.as_bytes())
        .map_err(|e| Error::QueueError(format!("method {}: {e}", write.method)))?;
    let url = Url::parse(&write.url).map_err(|e| Error::QueueError(format!("url {}: {e}", write.url)))?;

    let mut headers = HeaderMap::new();
    for (name, value) in &write.headers {
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            headers.append(name, value);
        }
    }
    let key = HeaderValue::from_str(&write.idempotency_key)
        .map_err(|e| Error::QueueError(format!("idempotency key: {e}")))?;
    headers.insert(IDEMPOTENCY_KEY, key);

    Ok(Request::from_parts(method, url, headers, write.body.clone().into()))
}

/// The 202 acknowledgement sent back for a queued write.
pub fn queued_response(write: &PendingWrite) -> Response {
    let body = serde_json::json!({
        "success": true,
        "queued": true,
        "offline": true,
        "message": QUEUED_MESSAGE,
        "idempotency_key": write.idempotency_key,
    });
    Response::synthesized(StatusCode::ACCEPTED, "application/json", body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::testing::{FakeNetwork, origin};
    use bytes::Bytes;
    use reqwest::header;

    fn report_post(body: &'static str) -> Request {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        let url = origin().join("/api/flood-reports").unwrap();
        Request::from_parts(Method::POST, url, headers, Bytes::from_static(body.as_bytes()))
    }

    async fn sync(network: &Arc<FakeNetwork>, max_attempts: u32) -> BackgroundSync {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher: Arc<dyn Fetcher> = network.clone();
        BackgroundSync::new(db, fetcher, &["^/api/flood-reports".to_string()], max_attempts).unwrap()
    }

    #[tokio::test]
    async fn test_should_queue_only_mutating_sync_paths() {
        let sync = sync(&FakeNetwork::new(), 3).await;
        assert!(sync.should_queue(&report_post("{}")));

        let get = Request::get(origin().join("/api/flood-reports").unwrap());
        assert!(!sync.should_queue(&get));

        let url = origin().join("/api/users").unwrap();
        let other = Request::from_parts(Method::POST, url, HeaderMap::new(), Bytes::new());
        assert!(!sync.should_queue(&other));
    }

    #[tokio::test]
    async fn test_enqueue_drops_connection_headers() {
        let sync = sync(&FakeNetwork::new(), 3).await;
        let write = sync.enqueue(FLOOD_REPORT_SYNC, &report_post(r#"{"level":2}"#)).await.unwrap();

        assert_eq!(write.headers, vec![("content-type".to_string(), "application/json".to_string())]);
        assert_eq!(sync.pending(Some(FLOOD_REPORT_SYNC)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_reuses_key_already_sent() {
        let sync = sync(&FakeNetwork::new(), 3).await;
        let keyed = with_idempotency_key(&report_post("{}"));
        let sent_key = keyed.headers.get(IDEMPOTENCY_KEY).unwrap().to_str().unwrap().to_string();

        let write = sync.enqueue(FLOOD_REPORT_SYNC, &keyed).await.unwrap();

        assert_eq!(write.idempotency_key, sent_key);
        assert!(write.headers.iter().all(|(name, _)| name != IDEMPOTENCY_KEY));
    }

    #[test]
    fn test_with_idempotency_key_keeps_page_key() {
        let mut request = report_post("{}");
        request.headers.insert(IDEMPOTENCY_KEY, HeaderValue::from_static("page-key-1"));

        let keyed = with_idempotency_key(&request);
        assert_eq!(keyed.headers.get(IDEMPOTENCY_KEY).unwrap(), "page-key-1");

        let fresh = with_idempotency_key(&report_post("{}"));
        assert!(!fresh.headers.get(IDEMPOTENCY_KEY).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replay_sends_idempotency_key_and_removes_accepted() {
        let network = FakeNetwork::new();
        network.respond("/api/flood-reports", StatusCode::CREATED, "application/json", r#"{"success":true}"#);
        let sync = sync(&network, 3).await;
        let write = sync.enqueue(FLOOD_REPORT_SYNC, &report_post(r#"{"level":2}"#)).await.unwrap();

        let report = sync.replay(FLOOD_REPORT_SYNC).await.unwrap();

        assert_eq!(report, SyncReport { replayed: 1, remaining: 0, dropped: 0 });
        let sent = &network.calls()[0];
        assert_eq!(sent.method, Method::POST);
        assert_eq!(sent.headers.get(IDEMPOTENCY_KEY).unwrap(), write.idempotency_key.as_str());
        assert_eq!(&sent.body[..], br#"{"level":2}"#);
    }

    #[tokio::test]
    async fn test_rejected_write_is_kept_then_dropped() {
        let network = FakeNetwork::new();
        network.respond("/api/flood-reports", StatusCode::BAD_GATEWAY, "text/plain", "upstream down");
        let sync = sync(&network, 2).await;
        sync.enqueue(FLOOD_REPORT_SYNC, &report_post("{}")).await.unwrap();

        let first = sync.replay(FLOOD_REPORT_SYNC).await.unwrap();
        assert_eq!(first, SyncReport { replayed: 0, remaining: 1, dropped: 0 });
        let pending = sync.pending(None).await.unwrap();
        assert_eq!(pending[0].attempts, 1);
        assert!(pending[0].last_error.as_deref().unwrap().contains("502"));

        let second = sync.replay(FLOOD_REPORT_SYNC).await.unwrap();
        assert_eq!(second, SyncReport { replayed: 0, remaining: 0, dropped: 1 });
    }

    #[tokio::test]
    async fn test_offline_replay_counts_no_attempt() {
        let network = FakeNetwork::new();
        network.set_offline(true);
        let sync = sync(&network, 1).await;
        sync.enqueue(FLOOD_REPORT_SYNC, &report_post("{}")).await.unwrap();
        sync.enqueue(FLOOD_REPORT_SYNC, &report_post("{}")).await.unwrap();

        let report = sync.replay(FLOOD_REPORT_SYNC).await.unwrap();

        assert_eq!(report, SyncReport { replayed: 0, remaining: 2, dropped: 0 });
        assert_eq!(network.call_count(), 1);
        assert!(sync.pending(None).await.unwrap().iter().all(|w| w.attempts == 0));
    }

    #[tokio::test]
    async fn test_queued_response_shape() {
        let sync = sync(&FakeNetwork::new(), 3).await;
        let write = sync.enqueue(FLOOD_REPORT_SYNC, &report_post("{}")).await.unwrap();

        let response = queued_response(&write);
        assert_eq!(response.status, StatusCode::ACCEPTED);

        let json: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(json["queued"], true);
        assert_eq!(json["offline"], true);
        assert_eq!(json["idempotency_key"], write.idempotency_key.as_str());
    }
}
