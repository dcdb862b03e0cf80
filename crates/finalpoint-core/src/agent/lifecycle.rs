//! Install/activate handling and worker state transitions.

use tracing::{debug, info, warn};

use super::{Agent, AgentError, EventOutcome};
use crate::http::Request;

/// Worker lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    /// Script evaluated, no lifecycle event yet
    #[default]
    Parsed,
    Installing,
    /// Installed, waiting to activate
    Installed,
    Activating,
    /// Active and controlling clients
    Activated,
    /// Failed or replaced
    Redundant,
}

fn is_valid_transition(from: WorkerState, to: WorkerState) -> bool {
    use WorkerState::*;

    matches!(
        (from, to),
        (Parsed, Installing)
            | (Installing, Installed)
            | (Installing, Redundant)
            | (Installed, Activating)
            | (Activating, Activated)
            | (Activating, Redundant)
            | (Activated, Redundant)
    )
}

impl Agent {
    fn transition(&self, to: WorkerState) -> Result<(), AgentError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let from = *state;
        if !is_valid_transition(from, to) {
            return Err(AgentError::InvalidStateTransition { from, to });
        }
        debug!(?from, ?to, "Worker state transition");
        *state = to;
        Ok(())
    }

    /// Handle `install`: open the current bucket, seed the application
    /// shell, and skip the waiting phase.
    ///
    /// Seeding failures are logged and swallowed so a flaky network never
    /// blocks installation.
    pub async fn install(&self) -> Result<EventOutcome, AgentError> {
        self.transition(WorkerState::Installing)?;
        info!(version = %self.config.cache_version, "Installing agent");

        let seeded = match self.seed_shell().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to seed application shell, continuing install");
                false
            }
        };

        if let Err(e) = self.services.scope.skip_waiting().await {
            warn!(error = %e, "skip_waiting failed, worker will wait for clients to close");
        }

        self.transition(WorkerState::Installed)?;
        Ok(EventOutcome::Installed { seeded })
    }

    async fn seed_shell(&self) -> Result<(), AgentError> {
        let version = &self.config.cache_version;
        self.services.caches.open(version).await?;

        let shell = self
            .config
            .shell_url()
            .ok_or_else(|| AgentError::InvalidRoute(self.config.shell_route.clone()))?;
        let request = Request::get(shell);
        let response = self.services.network.fetch(&request).await?;
        if !response.ok() {
            return Err(AgentError::BadStatus {
                url: request.cache_key(),
                status: response.status,
            });
        }

        self.services
            .caches
            .put(version, &request.cache_key(), response)
            .await?;
        debug!(url = %request.url, "Seeded application shell");
        Ok(())
    }

    /// Handle `activate`: drop every bucket from other versions, then drop
    /// whatever is left, then claim open clients.
    ///
    /// The second sweep also removes the current bucket, so the agent starts
    /// serving with an empty cache.
    pub async fn activate(&self) -> Result<EventOutcome, AgentError> {
        self.transition(WorkerState::Activating)?;
        info!(version = %self.config.cache_version, "Activating agent");

        match self.purge_caches().await {
            Ok(deleted) => {
                if let Err(e) = self.services.scope.claim_clients().await {
                    self.transition(WorkerState::Redundant)?;
                    return Err(e.into());
                }
                self.transition(WorkerState::Activated)?;
                Ok(EventOutcome::Activated { deleted })
            }
            Err(e) => {
                self.transition(WorkerState::Redundant)?;
                Err(e)
            }
        }
    }

    async fn purge_caches(&self) -> Result<Vec<String>, AgentError> {
        let caches = &self.services.caches;
        let version = &self.config.cache_version;
        let mut deleted = Vec::new();

        for name in caches.keys().await? {
            if &name != version && caches.delete(&name).await? {
                info!(bucket = %name, "Deleted old cache");
                deleted.push(name);
            }
        }

        for name in caches.keys().await? {
            if caches.delete(&name).await? {
                info!(bucket = %name, "Deleted cache");
                deleted.push(name);
            }
        }

        Ok(deleted)
    }
}
