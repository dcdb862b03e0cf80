//! Page-to-agent messages and background sync.

use serde::Deserialize;
use tracing::{debug, info};

use super::{Agent, AgentError, EventOutcome};

/// Messages a page may post to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentMessage {
    /// Activate a waiting agent immediately.
    SkipWaiting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    SkippedWaiting,
    Ignored,
}

impl Agent {
    pub async fn handle_message(
        &self,
        message: &serde_json::Value,
    ) -> Result<MessageOutcome, AgentError> {
        match AgentMessage::deserialize(message) {
            Ok(AgentMessage::SkipWaiting) => {
                info!("Received SKIP_WAITING");
                self.services.scope.skip_waiting().await?;
                Ok(MessageOutcome::SkippedWaiting)
            }
            Err(e) => {
                debug!(error = %e, "Ignoring unrecognised message");
                Ok(MessageOutcome::Ignored)
            }
        }
    }

    /// Background sync has no queued work to replay; the event is
    /// acknowledged so the runtime does not retry it.
    pub async fn handle_sync(&self, tag: String) -> EventOutcome {
        info!(%tag, "Background sync");
        EventOutcome::Synced { tag }
    }
}
