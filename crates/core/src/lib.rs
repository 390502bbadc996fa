//! Core types and shared functionality for floodline.
//!
//! This crate provides:
//! - Named response caches with SQLite and in-memory backends
//! - The durable queue of writes awaiting background sync
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheKey, CacheNames, CacheStore, CachedResponse, MemoryStore, PendingWrite};
pub use config::AppConfig;
pub use error::Error;
