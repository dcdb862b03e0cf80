//! Push payload decoding and notification display.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use super::{Agent, EventOutcome};
use crate::platform::{Notification, NotificationAction, NotificationOptions};

pub const ACTION_OPEN: &str = "open";
pub const ACTION_CLOSE: &str = "close";

const DEFAULT_TITLE: &str = "FinalPoint";
const DEFAULT_BODY: &str = "You have a new notification";
const DEFAULT_ICON: &str = "/icons/icon-192x192.png";
const DEFAULT_BADGE: &str = "/icons/icon-72x72.png";
const DEFAULT_TAG: &str = "finalpoint-notification";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub data: serde_json::Value,
}

impl Default for NotificationPayload {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            body: DEFAULT_BODY.to_string(),
            icon: DEFAULT_ICON.to_string(),
            badge: DEFAULT_BADGE.to_string(),
            tag: DEFAULT_TAG.to_string(),
            data: serde_json::Value::Null,
        }
    }
}

impl NotificationPayload {
    /// Decode push data and merge it over `defaults`.
    ///
    /// Never fails. Missing data, invalid JSON or a non-object document
    /// yield `defaults` unchanged; a field of the wrong type keeps its
    /// default while the well-typed fields are still taken.
    pub fn decode(data: Option<&[u8]>, defaults: &NotificationPayload) -> Self {
        let Some(bytes) = data.filter(|b| !b.is_empty()) else {
            debug!("Push event carried no data, using default payload");
            return defaults.clone();
        };

        let fields = match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => {
                warn!("Push payload is not a JSON object, using defaults");
                return defaults.clone();
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse push payload, using defaults");
                return defaults.clone();
            }
        };

        let text = |key: &str, default: &str| match fields.get(key) {
            None | Some(Value::Null) => default.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                warn!(field = key, value = %other, "Ignoring mistyped push payload field");
                default.to_string()
            }
        };

        Self {
            title: text("title", &defaults.title),
            body: text("body", &defaults.body),
            icon: text("icon", &defaults.icon),
            badge: text("badge", &defaults.badge),
            tag: text("tag", &defaults.tag),
            data: fields.get("data").cloned().unwrap_or_else(|| defaults.data.clone()),
        }
    }

    pub fn to_notification(&self) -> Notification {
        Notification {
            title: self.title.clone(),
            options: NotificationOptions {
                body: self.body.clone(),
                icon: self.icon.clone(),
                badge: self.badge.clone(),
                tag: self.tag.clone(),
                data: self.data.clone(),
                actions: vec![
                    NotificationAction::new(ACTION_OPEN, "Open App"),
                    NotificationAction::new(ACTION_CLOSE, "Close"),
                ],
                require_interaction: false,
                silent: false,
            },
        }
    }
}

impl Agent {
    /// Handle `push`. The event always settles successfully; a failed
    /// display is logged and reported through `displayed`.
    pub async fn handle_push(&self, data: Option<&[u8]>) -> EventOutcome {
        let payload = NotificationPayload::decode(data, &self.config.default_payload);
        let notification = payload.to_notification();

        let displayed = match self.services.notifier.show(&notification).await {
            Ok(()) => {
                debug!(title = %notification.title, tag = %notification.options.tag, "Notification shown");
                true
            }
            Err(e) => {
                error!(error = %e, title = %notification.title, "Failed to show notification");
                false
            }
        };

        EventOutcome::Push {
            notification,
            displayed,
        }
    }
}
