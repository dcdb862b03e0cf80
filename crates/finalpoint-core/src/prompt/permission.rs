//! Asking for notification permission and registering the push subscription.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::platform::PlatformError;

/// `Notification.permission`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Default,
    Granted,
    Denied,
}

#[async_trait]
pub trait PermissionPrompter: Send + Sync {
    async fn current(&self) -> PermissionState;

    /// Show the system permission dialog.
    async fn request(&self) -> Result<PermissionState, PlatformError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// `PushSubscription.toJSON()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub endpoint: String,
    #[serde(default)]
    pub expiration_time: Option<i64>,
    pub keys: SubscriptionKeys,
}

#[async_trait]
pub trait PushManager: Send + Sync {
    /// Subscribe with the server's VAPID public key, reusing an existing
    /// subscription when there is one.
    async fn subscribe(&self, application_server_key: &str)
        -> Result<PushSubscription, PlatformError>;

    async fn get_subscription(&self) -> Result<Option<PushSubscription>, PlatformError>;
}

/// Where subscriptions are registered (the FinalPoint API).
#[async_trait]
pub trait SubscriptionSink: Send + Sync {
    async fn register(&self, subscription: &PushSubscription) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionOutcome {
    Subscribed(PushSubscription),
    Denied,
    /// Push is not configured for this deployment.
    Unsupported,
    Failed(String),
}

pub struct PermissionFlow {
    prompter: Arc<dyn PermissionPrompter>,
    push: Arc<dyn PushManager>,
    sink: Arc<dyn SubscriptionSink>,
    vapid_public_key: Option<String>,
}

impl PermissionFlow {
    pub fn new(
        prompter: Arc<dyn PermissionPrompter>,
        push: Arc<dyn PushManager>,
        sink: Arc<dyn SubscriptionSink>,
        vapid_public_key: Option<String>,
    ) -> Self {
        Self {
            prompter,
            push,
            sink,
            vapid_public_key: vapid_public_key.filter(|k| !k.is_empty()),
        }
    }

    /// Ask for permission if it has not been decided, then subscribe and
    /// register the subscription.
    pub async fn enable_notifications(&self) -> PermissionOutcome {
        let Some(key) = self.vapid_public_key.as_deref() else {
            warn!("No VAPID public key configured, push notifications unavailable");
            return PermissionOutcome::Unsupported;
        };

        let state = match self.prompter.current().await {
            PermissionState::Default => match self.prompter.request().await {
                Ok(state) => state,
                Err(e) => return PermissionOutcome::Failed(e.to_string()),
            },
            state => state,
        };
        debug!(?state, "Notification permission");

        if state != PermissionState::Granted {
            info!("Notification permission denied");
            return PermissionOutcome::Denied;
        }

        let subscription = match self.push.subscribe(key).await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Push subscription failed");
                return PermissionOutcome::Failed(e.to_string());
            }
        };

        if let Err(e) = self.sink.register(&subscription).await {
            warn!(error = %e, "Failed to register push subscription");
            return PermissionOutcome::Failed(format!("{:#}", e));
        }

        info!(endpoint = %subscription.endpoint, "Push subscription registered");
        PermissionOutcome::Subscribed(subscription)
    }
}
