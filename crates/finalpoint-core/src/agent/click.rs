use tracing::{debug, warn};

use super::push::{ACTION_CLOSE, ACTION_OPEN};
use super::{Agent, AgentError, EventOutcome};

/// A click on a displayed notification or one of its action buttons.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationClick {
    pub tag: String,
    /// Action button id; `None` for a click on the notification body.
    pub action: Option<String>,
}

impl NotificationClick {
    pub fn new(tag: impl Into<String>, action: Option<&str>) -> Self {
        Self {
            tag: tag.into(),
            action: action.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    /// Body click, no action button
    Body,
    Open,
    Close,
    Other(String),
}

impl ClickAction {
    pub fn parse(action: Option<&str>) -> Self {
        match action {
            None | Some("") => ClickAction::Body,
            Some(ACTION_OPEN) => ClickAction::Open,
            Some(ACTION_CLOSE) => ClickAction::Close,
            Some(other) => ClickAction::Other(other.to_string()),
        }
    }
}

impl Agent {
    /// Handle `notificationclick`. The notification is always closed; body
    /// clicks and `open` then bring up the dashboard.
    pub async fn handle_notification_click(
        &self,
        click: &NotificationClick,
    ) -> Result<EventOutcome, AgentError> {
        if let Err(e) = self.services.notifier.close(&click.tag).await {
            warn!(tag = %click.tag, error = %e, "Failed to close notification");
        }

        match ClickAction::parse(click.action.as_deref()) {
            ClickAction::Body | ClickAction::Open => {
                let url = self
                    .config
                    .dashboard_url()
                    .ok_or_else(|| AgentError::InvalidRoute(self.config.dashboard_route.clone()))?;
                self.services.scope.open_window(&url).await?;
                debug!(url = %url, "Opened dashboard from notification");
                Ok(EventOutcome::NotificationClick { opened: Some(url) })
            }
            ClickAction::Close => Ok(EventOutcome::NotificationClick { opened: None }),
            ClickAction::Other(action) => {
                debug!(%action, "Ignoring unknown notification action");
                Ok(EventOutcome::NotificationClick { opened: None })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;

    #[test]
    fn test_click_action_parse() {
        assert_eq!(ClickAction::parse(None), ClickAction::Body);
        assert_eq!(ClickAction::parse(Some("")), ClickAction::Body);
        assert_eq!(ClickAction::parse(Some("open")), ClickAction::Open);
        assert_eq!(ClickAction::parse(Some("close")), ClickAction::Close);
        assert_eq!(
            ClickAction::parse(Some("snooze")),
            ClickAction::Other("snooze".to_string())
        );
    }

    #[tokio::test]
    async fn test_close_action_only_closes() {
        let harness = Harness::new();
        let agent = harness.agent();

        let outcome = agent
            .handle_notification_click(&NotificationClick::new("race", Some("close")))
            .await
            .unwrap();
        assert!(matches!(outcome, EventOutcome::NotificationClick { opened: None }));
        assert_eq!(harness.notifier.closed(), vec!["race".to_string()]);
        assert!(harness.scope.opened().is_empty());
    }

    #[tokio::test]
    async fn test_open_and_body_clicks_open_dashboard() {
        let harness = Harness::new();
        let agent = harness.agent();

        for action in [None, Some("open")] {
            agent
                .handle_notification_click(&NotificationClick::new("race", action))
                .await
                .unwrap();
        }

        let opened: Vec<String> = harness.scope.opened().iter().map(|u| u.to_string()).collect();
        assert_eq!(
            opened,
            vec![
                "https://finalpoint.app/dashboard".to_string(),
                "https://finalpoint.app/dashboard".to_string(),
            ]
        );
        assert_eq!(harness.notifier.closed().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_action_closes_without_navigation() {
        let harness = Harness::new();
        let agent = harness.agent();

        agent
            .handle_notification_click(&NotificationClick::new("race", Some("snooze")))
            .await
            .unwrap();
        assert_eq!(harness.notifier.closed().len(), 1);
        assert!(harness.scope.opened().is_empty());
    }
}
