//! Keeps the server's copy of the push subscription fresh.
//!
//! Push services rotate endpoints and the API prunes stale ones, so while
//! permission stays granted the current subscription is re-registered on a
//! fixed interval.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::prompt::{PermissionPrompter, PermissionState, PushManager, SubscriptionSink};

/// Re-registration interval. Once a day is well inside the API's pruning window.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct SubscriptionRefreshService {
    prompter: Arc<dyn PermissionPrompter>,
    push: Arc<dyn PushManager>,
    sink: Arc<dyn SubscriptionSink>,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SubscriptionRefreshService {
    pub fn new(
        prompter: Arc<dyn PermissionPrompter>,
        push: Arc<dyn PushManager>,
        sink: Arc<dyn SubscriptionSink>,
    ) -> Self {
        Self {
            prompter,
            push,
            sink,
            interval: DEFAULT_REFRESH_INTERVAL,
            task: Mutex::new(None),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start the periodic refresh. The first refresh runs immediately.
    /// Calling this while already running does nothing.
    pub fn initialize(&self) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            debug!("Subscription refresh already running");
            return;
        }

        let prompter = Arc::clone(&self.prompter);
        let push = Arc::clone(&self.push);
        let sink = Arc::clone(&self.sink);
        let period = self.interval;

        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                refresh_once(prompter.as_ref(), push.as_ref(), sink.as_ref()).await;
            }
        }));
        info!(interval_secs = period.as_secs(), "Subscription refresh started");
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    pub fn teardown(&self) {
        if let Some(task) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
            debug!("Subscription refresh stopped");
        }
    }
}

impl Drop for SubscriptionRefreshService {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Re-register the current subscription if permission is granted and one
/// exists. Returns whether anything was registered.
pub async fn refresh_once(
    prompter: &dyn PermissionPrompter,
    push: &dyn PushManager,
    sink: &dyn SubscriptionSink,
) -> bool {
    if prompter.current().await != PermissionState::Granted {
        debug!("Notification permission not granted, skipping refresh");
        return false;
    }

    let subscription = match push.get_subscription().await {
        Ok(Some(s)) => s,
        Ok(None) => {
            debug!("No push subscription to refresh");
            return false;
        }
        Err(e) => {
            warn!(error = %e, "Failed to read push subscription");
            return false;
        }
    };

    match sink.register(&subscription).await {
        Ok(()) => {
            debug!(endpoint = %subscription.endpoint, "Push subscription refreshed");
            true
        }
        Err(e) => {
            warn!(error = ?e, "Failed to refresh push subscription");
            false
        }
    }
}
