//! Decides whether the notification prompt may be shown right now.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, warn};

use super::dismiss::DismissStrategy;
use super::permission::PermissionOutcome;
use super::triggers::{PromptReason, TriggerState, TriggerUpdate};
use crate::clock::Clock;
use crate::storage::{KeyValueStore, StorageError};

/// Set once the user has gone through the permission prompt.
pub const SHOWN_KEY: &str = "notification-prompt-shown";

/// Epoch milliseconds before which the prompt stays hidden.
pub const DISMISSED_UNTIL_KEY: &str = "notification-prompt-dismissed-until";

pub struct NotificationPrompt {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    triggers: TriggerState,
}

impl NotificationPrompt {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            triggers: TriggerState::default(),
        }
    }

    pub fn triggers(&self) -> &TriggerState {
        &self.triggers
    }

    pub fn set_triggers(&mut self, triggers: TriggerState) {
        self.triggers = triggers;
    }

    pub fn update(&mut self, update: TriggerUpdate) {
        self.triggers.apply(update);
    }

    /// Start a new navigation context. Transient triggers are dropped and
    /// the route-derived ones recomputed; persisted suppression is kept.
    pub fn enter_route(&mut self, path: &str) {
        self.triggers = TriggerState::for_route(path);
        debug!(path, triggers = ?self.triggers, "Entered route");
    }

    /// When the current suppression ends, if one is in force.
    ///
    /// Expired or unreadable timestamps are removed from the store.
    pub fn dismissed_until(&self) -> Option<DateTime<Utc>> {
        let raw = match self.store.get(DISMISSED_UNTIL_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read prompt suppression");
                return None;
            }
        };

        let until = raw
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

        match until {
            Some(until) if self.clock.now() < until => Some(until),
            Some(until) => {
                debug!(%until, "Prompt suppression expired");
                self.forget_suppression();
                None
            }
            None => {
                warn!(value = %raw, "Ignoring corrupt prompt suppression value");
                self.forget_suppression();
                None
            }
        }
    }

    fn forget_suppression(&self) {
        if let Err(e) = self.store.remove(DISMISSED_UNTIL_KEY) {
            warn!(error = %e, "Failed to clear prompt suppression");
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.dismissed_until().is_some()
    }

    /// The trigger the prompt would be shown for, ignoring suppression.
    pub fn prompt_reason(&self) -> Option<PromptReason> {
        self.triggers.strongest()
    }

    pub fn should_show_prompt(&self) -> bool {
        !self.is_suppressed() && self.triggers.any_active()
    }

    /// Hide the prompt for the strategy's duration. Returns the new
    /// suppression deadline.
    pub fn dismiss_prompt(&self, strategy: DismissStrategy) -> Result<DateTime<Utc>, StorageError> {
        let until = self.clock.now() + strategy.duration();
        self.store
            .set(DISMISSED_UNTIL_KEY, &until.timestamp_millis().to_string())?;
        debug!(%strategy, %until, "Prompt dismissed");
        Ok(until)
    }

    pub fn mark_shown(&self) -> Result<(), StorageError> {
        self.store.set(SHOWN_KEY, "true")
    }

    pub fn has_been_shown(&self) -> bool {
        match self.store.get(SHOWN_KEY) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!(error = %e, "Failed to read prompt shown flag");
                false
            }
        }
    }

    /// Feed back what happened when the user answered the prompt.
    pub fn record_permission_result(&self, outcome: &PermissionOutcome) -> Result<(), StorageError> {
        match outcome {
            PermissionOutcome::Subscribed(_) => self.mark_shown(),
            PermissionOutcome::Denied => self.dismiss_prompt(DismissStrategy::Never).map(|_| ()),
            PermissionOutcome::Failed(_) => {
                self.dismiss_prompt(DismissStrategy::NotNow).map(|_| ())
            }
            PermissionOutcome::Unsupported => Ok(()),
        }
    }

    /// Forget everything: persisted state and current triggers.
    pub fn reset(&mut self) -> Result<(), StorageError> {
        self.store.remove(SHOWN_KEY)?;
        self.store.remove(DISMISSED_UNTIL_KEY)?;
        self.triggers = TriggerState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::prompt::permission::tests::subscription;
    use crate::storage::MemoryStore;
    use chrono::Duration;

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        prompt: NotificationPrompt,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let prompt = NotificationPrompt::new(store.clone(), clock.clone());
        Fixture {
            store,
            clock,
            prompt,
        }
    }

    #[test]
    fn test_no_triggers_no_prompt() {
        let f = fixture();
        assert!(!f.prompt.should_show_prompt());
        assert_eq!(f.prompt.prompt_reason(), None);
    }

    #[test]
    fn test_distant_race_alone_does_not_prompt() {
        let mut f = fixture();
        f.prompt.update(TriggerUpdate {
            has_upcoming_race: Some(true),
            days_until_race: Some(4),
            ..Default::default()
        });
        assert!(!f.prompt.should_show_prompt());

        f.prompt.update(TriggerUpdate {
            days_until_race: Some(3),
            ..Default::default()
        });
        assert!(f.prompt.should_show_prompt());
    }

    #[test]
    fn test_not_now_suppresses_for_three_days() {
        let mut f = fixture();
        f.prompt.enter_route("/picks");
        assert!(f.prompt.should_show_prompt());

        let start = f.clock.now();
        let until = f.prompt.dismiss_prompt(DismissStrategy::NotNow).unwrap();
        assert_eq!(until, start + Duration::days(3));

        f.clock.advance(Duration::seconds(1));
        assert!(!f.prompt.should_show_prompt());
        f.clock.set(until - Duration::seconds(1));
        assert!(!f.prompt.should_show_prompt());

        f.clock.set(until + Duration::seconds(1));
        assert!(f.prompt.should_show_prompt());
        // Expired value was cleared lazily
        assert_eq!(f.store.get(DISMISSED_UNTIL_KEY).unwrap(), None);
    }

    #[test]
    fn test_never_is_thirty_days() {
        let mut f = fixture();
        f.prompt.set_triggers(TriggerState {
            has_joined_league: true,
            ..Default::default()
        });
        f.prompt.dismiss_prompt(DismissStrategy::Never).unwrap();

        f.clock.advance(Duration::days(29));
        assert!(!f.prompt.should_show_prompt());
        f.clock.advance(Duration::days(2));
        assert!(f.prompt.should_show_prompt());
    }

    #[test]
    fn test_suppression_survives_new_instance() {
        let f = fixture();
        f.prompt.dismiss_prompt(DismissStrategy::MaybeLater).unwrap();

        let mut reloaded = NotificationPrompt::new(f.store.clone(), f.clock.clone());
        reloaded.enter_route("/leagues/7");
        assert!(reloaded.is_suppressed());
        assert!(!reloaded.should_show_prompt());
        assert_eq!(reloaded.prompt_reason(), Some(PromptReason::ViewingLeague));
    }

    #[test]
    fn test_only_two_keys_are_persisted() {
        let mut f = fixture();
        f.prompt.enter_route("/picks");
        f.prompt.mark_shown().unwrap();
        f.prompt.dismiss_prompt(DismissStrategy::NotNow).unwrap();

        assert_eq!(f.store.get(SHOWN_KEY).unwrap().as_deref(), Some("true"));
        assert!(f.store.get(DISMISSED_UNTIL_KEY).unwrap().is_some());
        assert!(f.store.get("is_on_picks_page").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_suppression_is_ignored() {
        let mut f = fixture();
        f.store.set(DISMISSED_UNTIL_KEY, "tomorrow").unwrap();
        f.prompt.enter_route("/picks");
        assert!(f.prompt.should_show_prompt());
        assert_eq!(f.store.get(DISMISSED_UNTIL_KEY).unwrap(), None);
    }

    #[test]
    fn test_enter_route_resets_transient_triggers() {
        let mut f = fixture();
        f.prompt.update(TriggerUpdate {
            has_recent_score_update: Some(true),
            ..Default::default()
        });
        assert!(f.prompt.should_show_prompt());

        f.prompt.enter_route("/dashboard");
        assert!(!f.prompt.should_show_prompt());
    }

    #[test]
    fn test_record_permission_result() {
        let f = fixture();
        f.prompt
            .record_permission_result(&PermissionOutcome::Subscribed(subscription()))
            .unwrap();
        assert!(f.prompt.has_been_shown());
        assert!(!f.prompt.is_suppressed());

        f.prompt
            .record_permission_result(&PermissionOutcome::Denied)
            .unwrap();
        assert_eq!(
            f.prompt.dismissed_until(),
            Some(f.clock.now() + Duration::days(30))
        );

        f.prompt
            .record_permission_result(&PermissionOutcome::Failed("offline".into()))
            .unwrap();
        assert_eq!(
            f.prompt.dismissed_until(),
            Some(f.clock.now() + Duration::days(3))
        );
    }

    #[test]
    fn test_reset() {
        let mut f = fixture();
        f.prompt.enter_route("/picks");
        f.prompt.mark_shown().unwrap();
        f.prompt.dismiss_prompt(DismissStrategy::Never).unwrap();

        f.prompt.reset().unwrap();
        assert!(!f.prompt.has_been_shown());
        assert!(!f.prompt.is_suppressed());
        assert_eq!(f.prompt.triggers(), &TriggerState::default());
    }
}
