//! Durable queue of writes awaiting background sync.
//!
//! Mutating requests that could not reach the origin are stored here with
//! the idempotency key they were first sent with. A sync replay drains the queue in
//! enqueue order; successful items are removed, failed ones stay with an
//! incremented attempt counter.

use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use uuid::Uuid;

use super::connection::CacheDb;
use crate::Error;

/// Fresh key for a write that may have to be replayed.
pub fn new_idempotency_key() -> String {
    Uuid::new_v4().to_string()
}

/// A write to enqueue.
#[derive(Debug, Clone)]
pub struct NewPendingWrite {
    pub tag: String,
    /// The key the write carried on its first attempt.
    pub idempotency_key: String,
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// A queued write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingWrite {
    pub id: i64,
    pub tag: String,
    /// Sent as the `Idempotency-Key` header on every replay so the origin
    /// can discard duplicates.
    pub idempotency_key: String,
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub enqueued_at: String,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl CacheDb {
    /// Store a write for later replay and return it with its assigned id.
    ///
    /// Enqueueing a key that is already queued returns the existing write.
    pub async fn enqueue_write(&self, write: NewPendingWrite) -> Result<PendingWrite, Error> {
        if write.tag.is_empty() {
            return Err(Error::InvalidInput("sync tag cannot be empty".into()));
        }
        if write.idempotency_key.is_empty() {
            return Err(Error::InvalidInput("idempotency key cannot be empty".into()));
        }

        let headers_json = serde_json::to_string(&write.headers)?;
        let enqueued_at = chrono::Utc::now().to_rfc3339();

        let key = write.idempotency_key.clone();
        let (tag, method, url, body) = (write.tag.clone(), write.method.clone(), write.url.clone(), write.body.clone());
        let (id, enqueued_at, attempts, last_error) = self
            .conn
            .call(move |conn| -> Result<(i64, String, u32, Option<String>), Error> {
                conn.execute(
                    "INSERT INTO pending_writes (tag, idempotency_key, method, url, headers_json, body, enqueued_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(idempotency_key) DO NOTHING",
                    params![tag, key, method, url, headers_json, body, enqueued_at],
                )
                .map_err(|e| Error::QueueError(e.to_string()))?;
                conn.query_row(
                    "SELECT id, enqueued_at, attempts, last_error FROM pending_writes WHERE idempotency_key = ?1",
                    params![key],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )
                .map_err(|e| Error::QueueError(e.to_string()))
            })
            .await
            .map_err(Error::from)?;

        Ok(PendingWrite {
            id,
            tag: write.tag,
            idempotency_key: write.idempotency_key,
            method: write.method,
            url: write.url,
            headers: write.headers,
            body: write.body,
            enqueued_at,
            attempts,
            last_error,
        })
    }

    /// Pending writes for `tag` (or every tag when `None`), oldest first.
    pub async fn pending_writes(&self, tag: Option<&str>) -> Result<Vec<PendingWrite>, Error> {
        let tag = tag.map(str::to_string);
        self.conn
            .call(move |conn| -> Result<Vec<PendingWrite>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, tag, idempotency_key, method, url, headers_json, body,
                            enqueued_at, attempts, last_error
                     FROM pending_writes
                     WHERE ?1 IS NULL OR tag = ?1
                     ORDER BY id ASC",
                )?;

                let rows = stmt
                    .query_map(params![tag], |row| {
                        Ok((
                            PendingWrite {
                                id: row.get(0)?,
                                tag: row.get(1)?,
                                idempotency_key: row.get(2)?,
                                method: row.get(3)?,
                                url: row.get(4)?,
                                headers: Vec::new(),
                                body: row.get(6)?,
                                enqueued_at: row.get(7)?,
                                attempts: row.get(8)?,
                                last_error: row.get(9)?,
                            },
                            row.get::<_, String>(5)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                rows.into_iter()
                    .map(|(mut write, headers_json)| -> Result<PendingWrite, Error> {
                        write.headers = serde_json::from_str(&headers_json)?;
                        Ok(write)
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }

    /// Remove a write after it was accepted by the origin.
    pub async fn remove_write(&self, id: i64) -> Result<bool, Error> {
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM pending_writes WHERE id = ?1", params![id])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Record a failed replay attempt. Returns the new attempt count.
    pub async fn record_write_failure(&self, id: i64, error: &str) -> Result<u32, Error> {
        let error = error.to_string();
        self.conn
            .call(move |conn| -> Result<u32, Error> {
                conn.execute(
                    "UPDATE pending_writes SET attempts = attempts + 1, last_error = ?2 WHERE id = ?1",
                    params![id, error],
                )?;
                let attempts =
                    conn.query_row("SELECT attempts FROM pending_writes WHERE id = ?1", params![id], |row| row.get(0))?;
                Ok(attempts)
            })
            .await
            .map_err(Error::from)
    }
}
