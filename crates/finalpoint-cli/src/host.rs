//! Terminal implementations of the platform traits.
//!
//! Notifications and window opens are printed. Permission is asked on
//! stdin and remembered in a small host-side store next to the prompt
//! state, together with the last registered push subscription.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use finalpoint_core::platform::{Notification, Notifier, PlatformError, WorkerScope};
use finalpoint_core::prompt::{PermissionPrompter, PermissionState, PushManager, PushSubscription};
use finalpoint_core::storage::KeyValueStore;
use finalpoint_core::Url;
use tracing::{debug, info, warn};

/// Host-store key of the remembered permission decision.
const PERMISSION_KEY: &str = "notification-permission";

/// Host-store key of the last subscription handed out.
const SUBSCRIPTION_KEY: &str = "push-subscription";

pub struct TerminalNotifier;

#[async_trait]
impl Notifier for TerminalNotifier {
    async fn show(&self, notification: &Notification) -> Result<(), PlatformError> {
        let options = &notification.options;
        let actions: Vec<String> = options
            .actions
            .iter()
            .map(|a| format!("[{}] {}", a.action, a.title))
            .collect();

        let mut text = format!(
            "🔔 {}\n   {}\n   tag: {}  icon: {}\n   actions: {}\n",
            notification.title,
            options.body,
            options.tag,
            options.icon,
            actions.join("  ")
        );
        if !options.data.is_null() {
            text.push_str(&format!("   data: {}\n", options.data));
        }
        io::stdout()
            .write_all(text.as_bytes())
            .map_err(|e| PlatformError::Notification(e.to_string()))
    }

    async fn close(&self, tag: &str) -> Result<(), PlatformError> {
        debug!(tag, "Closed notification");
        Ok(())
    }
}

/// A terminal has no clients to claim; opened windows are printed.
pub struct TerminalScope;

#[async_trait]
impl WorkerScope for TerminalScope {
    async fn skip_waiting(&self) -> Result<(), PlatformError> {
        debug!("skip_waiting");
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), PlatformError> {
        debug!("Claimed clients");
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), PlatformError> {
        println!("→ open {}", url);
        Ok(())
    }
}

/// Asks on stdin and remembers the answer.
pub struct StdinPrompter {
    store: Arc<dyn KeyValueStore>,
}

impl StdinPrompter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PermissionPrompter for StdinPrompter {
    async fn current(&self) -> PermissionState {
        match self.store.get(PERMISSION_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, value = %raw, "Ignoring corrupt permission state");
                PermissionState::Default
            }),
            Ok(None) => PermissionState::Default,
            Err(e) => {
                warn!(error = %e, "Failed to read permission state");
                PermissionState::Default
            }
        }
    }

    async fn request(&self) -> Result<PermissionState, PlatformError> {
        let answer = tokio::task::spawn_blocking(|| {
            print!("FinalPoint wants to show notifications. Allow? [y/N] ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok::<_, io::Error>(line)
        })
        .await
        .map_err(|e| PlatformError::Permission(e.to_string()))?
        .map_err(|e| PlatformError::Permission(e.to_string()))?;

        let state = if matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        };

        let raw = serde_json::to_string(&state)
            .map_err(|e| PlatformError::Permission(e.to_string()))?;
        self.store
            .set(PERMISSION_KEY, &raw)
            .map_err(|e| PlatformError::Permission(e.to_string()))?;
        info!(?state, "Permission decided");
        Ok(state)
    }
}

/// Hands out a subscription read from a JSON file, and remembers it so
/// later refreshes can find it.
pub struct FilePushManager {
    source: Option<PathBuf>,
    store: Arc<dyn KeyValueStore>,
}

impl FilePushManager {
    pub fn new(source: Option<PathBuf>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { source, store }
    }

    fn stored(&self) -> Result<Option<PushSubscription>, PlatformError> {
        match self.store.get(SUBSCRIPTION_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| PlatformError::Push(format!("corrupt stored subscription: {}", e))),
            Ok(None) => Ok(None),
            Err(e) => Err(PlatformError::Push(e.to_string())),
        }
    }
}

#[async_trait]
impl PushManager for FilePushManager {
    async fn subscribe(&self, application_server_key: &str) -> Result<PushSubscription, PlatformError> {
        let Some(path) = &self.source else {
            return self
                .stored()?
                .ok_or_else(|| PlatformError::Push("no subscription source".to_string()));
        };

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PlatformError::Push(format!("{}: {}", path.display(), e)))?;
        let subscription: PushSubscription = serde_json::from_str(&contents)
            .map_err(|e| PlatformError::Push(format!("{}: {}", path.display(), e)))?;

        let raw = serde_json::to_string(&subscription)
            .map_err(|e| PlatformError::Push(e.to_string()))?;
        self.store
            .set(SUBSCRIPTION_KEY, &raw)
            .map_err(|e| PlatformError::Push(e.to_string()))?;
        debug!(
            endpoint = %subscription.endpoint,
            key_len = application_server_key.len(),
            "Subscribed"
        );
        Ok(subscription)
    }

    async fn get_subscription(&self) -> Result<Option<PushSubscription>, PlatformError> {
        self.stored()
    }
}
