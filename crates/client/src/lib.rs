//! Client code for floodline.
//!
//! This crate provides the offline caching layer itself: request routing,
//! the four caching strategies, the install/activate lifecycle, push
//! notifications and background sync, plus the outbound fetch pipeline
//! shared by the server and CLI.

pub mod fetch;
pub mod http;
pub mod lifecycle;
pub mod platform;
pub mod push;
pub mod router;
pub mod strategy;
pub mod sync;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Fetcher};
pub use http::{Destination, Request, Response, ResponseSource};
pub use lifecycle::{InstallReport, WorkerState};
pub use platform::{Platform, RecordingPlatform};
pub use push::{ClickOutcome, Notification, PushMessage};
pub use router::{Route, Router, StrategyKind};
pub use strategy::StrategyContext;
pub use sync::{BackgroundSync, FLOOD_REPORT_SYNC, IDEMPOTENCY_KEY, SyncReport};
pub use worker::OfflineWorker;
