//! The offline/notification agent.
//!
//! The agent is what the browser would run as the app's service worker. It
//! is driven entirely by events:
//!
//! - `install` / `activate`: cache lifecycle (`lifecycle`)
//! - `fetch`: cache-first interception with bypass rules (`fetch`)
//! - `push`: payload decoding and notification display (`push`)
//! - `notificationclick`: navigation routing (`click`)
//! - `message` / `sync`: control messages and background sync (`message`)
//!
//! Events are routed through a `DispatchTable` and each handler returns a
//! future; the event counts as settled only once that future completes.
//! `AgentHost` runs events concurrently on the tokio runtime and isolates
//! failures per event.

pub mod click;
pub mod dispatch;
pub mod events;
pub mod fetch;
pub mod host;
pub mod lifecycle;
pub mod message;
pub mod push;

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::Instrument;

use crate::config::AgentConfig;
use crate::platform::{Network, NetworkError, Notifier, PlatformError, WorkerScope};
use crate::storage::{CacheStorage, StorageError};

pub use click::{ClickAction, NotificationClick};
pub use dispatch::{DispatchTable, Handler};
pub use events::{AgentEvent, EventKind, EventOutcome};
pub use fetch::{BypassReason, BypassRules, FetchResponse};
pub use host::AgentHost;
pub use lifecycle::WorkerState;
pub use message::{AgentMessage, MessageOutcome};
pub use push::NotificationPayload;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Cache storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Invalid worker state transition: {from:?} -> {to:?}")]
    InvalidStateTransition { from: WorkerState, to: WorkerState },

    #[error("Handler for {expected} events received a {got} event")]
    UnexpectedEvent { expected: EventKind, got: EventKind },

    #[error("Worker is {state:?}, {kind} events are only handled once activated")]
    NotActivated { kind: EventKind, state: WorkerState },

    #[error("No handler registered for {0} events")]
    NoHandler(EventKind),

    #[error("{url} returned status {status}")]
    BadStatus { url: String, status: u16 },

    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Event task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Platform services the agent runs against.
#[derive(Clone)]
pub struct AgentServices {
    pub caches: Arc<dyn CacheStorage>,
    pub network: Arc<dyn Network>,
    pub notifier: Arc<dyn Notifier>,
    pub scope: Arc<dyn WorkerScope>,
}

pub struct Agent {
    config: AgentConfig,
    services: AgentServices,
    state: Mutex<WorkerState>,
    dispatch: DispatchTable,
}

impl Agent {
    pub fn new(config: AgentConfig, services: AgentServices) -> Self {
        Self {
            config,
            services,
            state: Mutex::new(WorkerState::Parsed),
            dispatch: DispatchTable::standard(),
        }
    }

    /// Start from a known lifecycle state, e.g. a worker installed by an
    /// earlier process that is now waiting to activate.
    pub fn with_state(self, state: WorkerState) -> Self {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
        self
    }

    /// Replace the dispatch table.
    pub fn with_dispatch(mut self, dispatch: DispatchTable) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn caches(&self) -> &Arc<dyn CacheStorage> {
        &self.services.caches
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.services.network
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Route `event` to its handler and wait for it to settle.
    ///
    /// Fetch and push events are rejected until the worker has activated.
    pub async fn dispatch(&self, event: AgentEvent) -> Result<EventOutcome, AgentError> {
        let kind = event.kind();
        let state = self.state();
        if kind.requires_activation() && state != WorkerState::Activated {
            return Err(AgentError::NotActivated { kind, state });
        }
        let handler = self.dispatch.get(kind).ok_or(AgentError::NoHandler(kind))?;
        let span = tracing::debug_span!("agent_event", kind = %kind);
        handler(self, event).instrument(span).await
    }
}
