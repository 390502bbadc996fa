//! Flood alert notifications built from push messages.

use serde::{Deserialize, Serialize};

pub const NOTIFICATION_TITLE: &str = "Flood Alert";
pub const DEFAULT_BODY: &str = "New flood alert in your area";
pub const ALERTS_URL: &str = "/alerts";

const ICON: &str = "/icons/icon-192x192.png";
const BADGE: &str = "/icons/icon-72x72.png";
const VIBRATE_PATTERN: [u32; 3] = [200, 100, 200];

pub const ACTION_VIEW: &str = "view";
pub const ACTION_CLOSE: &str = "close";

/// An incoming push message. The payload is optional and untrusted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushMessage {
    pub data: Option<Vec<u8>>,
}

impl PushMessage {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: Some(data.into()) }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// The payload as text, if there is a non-empty UTF-8 payload.
    pub fn text(&self) -> Option<&str> {
        let text = std::str::from_utf8(self.data.as_deref()?).ok()?;
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub url: String,
}

/// A notification as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Vibration pattern in milliseconds, alternating on and off.
    pub vibrate: Vec<u32>,
    pub actions: Vec<NotificationAction>,
    pub data: NotificationData,
}

/// Build the flood alert for `message`. A missing, empty or non-UTF-8
/// payload falls back to the default body text.
pub fn build_notification(message: &PushMessage) -> Notification {
    Notification {
        title: NOTIFICATION_TITLE.to_string(),
        body: message.text().unwrap_or(DEFAULT_BODY).to_string(),
        icon: ICON.to_string(),
        badge: BADGE.to_string(),
        vibrate: VIBRATE_PATTERN.to_vec(),
        actions: vec![
            NotificationAction { action: ACTION_VIEW.to_string(), title: "View Alert".to_string() },
            NotificationAction { action: ACTION_CLOSE.to_string(), title: "Close".to_string() },
        ],
        data: NotificationData { url: ALERTS_URL.to_string() },
    }
}

/// What a notification click leads to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "url", rename_all = "snake_case")]
pub enum ClickOutcome {
    OpenWindow(String),
    Dismissed,
}

/// Decide the click outcome. The `view` action and a click on the body
/// (no action) open the notification's URL; anything else only closes it.
pub fn resolve_click(notification: &Notification, action: Option<&str>) -> ClickOutcome {
    match action {
        None | Some("") | Some(ACTION_VIEW) => ClickOutcome::OpenWindow(notification.data.url.clone()),
        Some(_) => ClickOutcome::Dismissed,
    }
}
