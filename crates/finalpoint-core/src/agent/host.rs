//! Runs agent events on the tokio runtime.
//!
//! Every event gets its own task, so a handler that fails or panics only
//! settles its own event. Fetches are free to interleave. `boot` runs install
//! strictly before activate, and the agent itself refuses fetch and push
//! events until activation has completed.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, warn};

use super::{Agent, AgentError, AgentEvent, EventKind, EventOutcome, FetchResponse};
use crate::http::{Request, Response};

#[derive(Clone)]
pub struct AgentHost {
    agent: Arc<Agent>,
}

impl AgentHost {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent: Arc::new(agent),
        }
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    /// Start handling `event`. The returned handle resolves once the
    /// event's pending work has settled.
    pub fn spawn(&self, event: AgentEvent) -> JoinHandle<Result<EventOutcome, AgentError>> {
        let agent = Arc::clone(&self.agent);
        tokio::spawn(async move { agent.dispatch(event).await })
    }

    /// Handle `event` and wait for it. Failures are logged and swallowed so
    /// the caller can keep feeding events.
    pub async fn deliver(&self, event: AgentEvent) -> Option<EventOutcome> {
        let kind = event.kind();
        match self.spawn(event).await {
            Ok(Ok(outcome)) => Some(outcome),
            Ok(Err(e)) => {
                warn!(kind = %kind, error = %e, "Event handler failed");
                None
            }
            Err(e) => {
                error!(kind = %kind, error = %e, "Event handler panicked");
                None
            }
        }
    }

    /// Install then activate.
    pub async fn boot(&self) -> Result<(EventOutcome, EventOutcome), AgentError> {
        let installed = self.agent.dispatch(AgentEvent::Install).await?;
        let activated = self.agent.dispatch(AgentEvent::Activate).await?;
        Ok((installed, activated))
    }

    /// Answer `request` as the page would see it: through the agent, or
    /// directly from the network when the agent passes.
    pub async fn respond(&self, request: Request) -> Result<Response, AgentError> {
        let outcome = self
            .spawn(AgentEvent::Fetch(request.clone()))
            .await??;

        match outcome {
            EventOutcome::Fetch(FetchResponse::Passthrough) => {
                Ok(self.agent.network().fetch(&request).await?)
            }
            EventOutcome::Fetch(FetchResponse::FromCache(r))
            | EventOutcome::Fetch(FetchResponse::FromNetwork(r)) => Ok(r),
            other => Err(AgentError::UnexpectedEvent {
                expected: EventKind::Fetch,
                got: other.kind(),
            }),
        }
    }
}
