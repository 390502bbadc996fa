//! Named cache operations on the SQLite backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::store::{CacheKey, CacheStore, CachedResponse};
use crate::Error;

/// Entry count and size of one named cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSummary {
    pub name: String,
    pub entries: u64,
    pub bytes: u64,
}

/// Listing row for a single cached response (body omitted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySummary {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub size: u64,
    pub stored_at: String,
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, cache_name: &str) -> Result<(), Error> {
        let cache_name = cache_name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO named_caches (name, created_at) VALUES (?1, ?2)",
                    params![cache_name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn match_entry(&self, cache_name: &str, key: &CacheKey) -> Result<Option<CachedResponse>, Error> {
        let cache_name = cache_name.to_string();
        let hash = key.hash.clone();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, headers_json, body, stored_at
                     FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![cache_name, hash], |row| {
                    let status: u16 = row.get(0)?;
                    let headers_json: String = row.get(1)?;
                    let body: Vec<u8> = row.get(2)?;
                    let stored_at: String = row.get(3)?;
                    Ok((status, headers_json, body, stored_at))
                });

                match result {
                    Ok((status, headers_json, body, stored_at)) => {
                        let headers = serde_json::from_str(&headers_json)?;
                        Ok(Some(CachedResponse { status, headers, body, stored_at }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, cache_name: &str, key: &CacheKey, response: &CachedResponse) -> Result<(), Error> {
        let cache_name = cache_name.to_string();
        let key = key.clone();
        let headers_json = serde_json::to_string(&response.headers)?;
        let response = response.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO named_caches (name, created_at) VALUES (?1, ?2)",
                    params![cache_name, now],
                )?;
                tx.execute(
                    "INSERT INTO cache_entries (
                        cache_name, key_hash, method, url, status, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(cache_name, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        cache_name,
                        key.hash,
                        key.method,
                        key.url,
                        response.status,
                        headers_json,
                        response.body,
                        response.stored_at,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn cache_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM named_caches ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_cache(&self, cache_name: &str) -> Result<bool, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM cache_entries WHERE cache_name = ?1", params![cache_name])?;
                let deleted = tx.execute("DELETE FROM named_caches WHERE name = ?1", params![cache_name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}

impl CacheDb {
    /// Entry count and body size for every named cache.
    pub async fn cache_summaries(&self) -> Result<Vec<CacheSummary>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<CacheSummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT c.name, COUNT(e.key_hash), COALESCE(SUM(LENGTH(e.body)), 0)
                     FROM named_caches c
                     LEFT JOIN cache_entries e ON e.cache_name = c.name
                     GROUP BY c.name
                     ORDER BY c.name",
                )?;
                let summaries = stmt
                    .query_map([], |row| {
                        Ok(CacheSummary {
                            name: row.get(0)?,
                            entries: row.get::<_, i64>(1)? as u64,
                            bytes: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(summaries)
            })
            .await
            .map_err(Error::from)
    }

    /// List the entries of one cache, newest first.
    ///
    /// Returns `Error::CacheMiss` if the cache does not exist.
    pub async fn list_entries(&self, cache_name: &str) -> Result<Vec<EntrySummary>, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntrySummary>, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM named_caches WHERE name = ?1)",
                    params![cache_name],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(Error::CacheMiss(cache_name));
                }

                let mut stmt = conn.prepare(
                    "SELECT method, url, status, LENGTH(body), stored_at
                     FROM cache_entries WHERE cache_name = ?1
                     ORDER BY stored_at DESC",
                )?;
                let entries = stmt
                    .query_map(params![cache_name], |row| {
                        Ok(EntrySummary {
                            method: row.get(0)?,
                            url: row.get(1)?,
                            status: row.get(2)?,
                            size: row.get::<_, i64>(3)? as u64,
                            stored_at: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }
}
