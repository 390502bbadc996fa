//! Host platform hooks: client control, notifications and windows.
//!
//! A browser provides these to a service worker. The server records them
//! so they can be inspected over the admin endpoints.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use floodline_core::Error;

use crate::push::Notification;

/// Oldest entries are discarded past this many recorded notifications or
/// opened windows.
const HISTORY_LIMIT: usize = 100;

#[async_trait]
pub trait Platform: Send + Sync {
    /// Take control of every open client page.
    async fn claim_clients(&self) -> Result<(), Error>;

    /// Display a notification. Returns once it is shown.
    async fn show_notification(&self, notification: &Notification) -> Result<(), Error>;

    /// Open a window at `url`, or focus one already there.
    async fn open_window(&self, url: &str) -> Result<(), Error>;
}

#[derive(Debug, Default)]
struct Recorded {
    claimed: bool,
    notifications: VecDeque<Notification>,
    windows: VecDeque<String>,
}

/// [`Platform`] that keeps what it was asked to do in memory.
#[derive(Debug, Default)]
pub struct RecordingPlatform {
    recorded: Mutex<Recorded>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clients_claimed(&self) -> bool {
        self.lock().claimed
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.iter().cloned().collect()
    }

    pub fn notification(&self, index: usize) -> Option<Notification> {
        self.lock().notifications.get(index).cloned()
    }

    pub fn opened_windows(&self) -> Vec<String> {
        self.lock().windows.iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn push_bounded<T>(list: &mut VecDeque<T>, item: T) {
    if list.len() == HISTORY_LIMIT {
        list.pop_front();
    }
    list.push_back(item);
}

#[async_trait]
impl Platform for RecordingPlatform {
    async fn claim_clients(&self) -> Result<(), Error> {
        self.lock().claimed = true;
        tracing::info!("clients claimed");
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(title = %notification.title, body = %notification.body, "notification shown");
        push_bounded(&mut self.lock().notifications, notification.clone());
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<(), Error> {
        tracing::info!(url, "window opened");
        push_bounded(&mut self.lock().windows, url.to_string());
        Ok(())
    }
}
