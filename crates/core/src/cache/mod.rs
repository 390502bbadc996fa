//! Named response caches and the background-sync queue.
//!
//! Response caches are reached through the [`CacheStore`] trait so the
//! strategies never touch a concrete backend. Two backends are provided:
//!
//! - [`CacheDb`]: SQLite via tokio-rusqlite, WAL mode, versioned migrations
//! - [`MemoryStore`]: process-local maps, used by tests and ephemeral runs
//!
//! The queue of writes awaiting background sync lives in the same SQLite
//! database (see [`queue`]).

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod queue;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheSummary, EntrySummary};
pub use memory::MemoryStore;
pub use queue::{NewPendingWrite, PendingWrite, new_idempotency_key};
pub use store::{CacheKey, CacheNames, CacheStore, CachedResponse};
