//! Event kind to handler routing.

use std::collections::HashMap;

use futures::future::BoxFuture;

use super::{Agent, AgentError, AgentEvent, EventKind, EventOutcome};

/// An event handler. The returned future is the event's pending work; the
/// host must drive it to completion before treating the event as handled.
pub type Handler =
    for<'a> fn(&'a Agent, AgentEvent) -> BoxFuture<'a, Result<EventOutcome, AgentError>>;

#[derive(Clone, Default)]
pub struct DispatchTable {
    handlers: HashMap<EventKind, Handler>,
}

impl DispatchTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Handlers for every event kind the agent understands.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.register(EventKind::Install, on_install);
        table.register(EventKind::Activate, on_activate);
        table.register(EventKind::Fetch, on_fetch);
        table.register(EventKind::Push, on_push);
        table.register(EventKind::NotificationClick, on_notification_click);
        table.register(EventKind::Sync, on_sync);
        table.register(EventKind::Message, on_message);
        table
    }

    /// Install `handler` for `kind`, returning the one it replaced.
    pub fn register(&mut self, kind: EventKind, handler: Handler) -> Option<Handler> {
        self.handlers.insert(kind, handler)
    }

    pub fn remove(&mut self, kind: EventKind) -> Option<Handler> {
        self.handlers.remove(&kind)
    }

    pub fn get(&self, kind: EventKind) -> Option<Handler> {
        self.handlers.get(&kind).copied()
    }

    pub fn handles(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

fn unexpected(expected: EventKind, event: &AgentEvent) -> AgentError {
    AgentError::UnexpectedEvent {
        expected,
        got: event.kind(),
    }
}

fn on_install(agent: &Agent, event: AgentEvent) -> BoxFuture<'_, Result<EventOutcome, AgentError>> {
    Box::pin(async move {
        match event {
            AgentEvent::Install => agent.install().await,
            other => Err(unexpected(EventKind::Install, &other)),
        }
    })
}

fn on_activate(
    agent: &Agent,
    event: AgentEvent,
) -> BoxFuture<'_, Result<EventOutcome, AgentError>> {
    Box::pin(async move {
        match event {
            AgentEvent::Activate => agent.activate().await,
            other => Err(unexpected(EventKind::Activate, &other)),
        }
    })
}

fn on_fetch(agent: &Agent, event: AgentEvent) -> BoxFuture<'_, Result<EventOutcome, AgentError>> {
    Box::pin(async move {
        match event {
            AgentEvent::Fetch(request) => agent.handle_fetch(&request).await.map(EventOutcome::Fetch),
            other => Err(unexpected(EventKind::Fetch, &other)),
        }
    })
}

fn on_push(agent: &Agent, event: AgentEvent) -> BoxFuture<'_, Result<EventOutcome, AgentError>> {
    Box::pin(async move {
        match event {
            AgentEvent::Push(data) => Ok(agent.handle_push(data.as_deref()).await),
            other => Err(unexpected(EventKind::Push, &other)),
        }
    })
}

fn on_notification_click(
    agent: &Agent,
    event: AgentEvent,
) -> BoxFuture<'_, Result<EventOutcome, AgentError>> {
    Box::pin(async move {
        match event {
            AgentEvent::NotificationClick(click) => agent.handle_notification_click(&click).await,
            other => Err(unexpected(EventKind::NotificationClick, &other)),
        }
    })
}

fn on_sync(agent: &Agent, event: AgentEvent) -> BoxFuture<'_, Result<EventOutcome, AgentError>> {
    Box::pin(async move {
        match event {
            AgentEvent::Sync { tag } => Ok(agent.handle_sync(tag).await),
            other => Err(unexpected(EventKind::Sync, &other)),
        }
    })
}

fn on_message(agent: &Agent, event: AgentEvent) -> BoxFuture<'_, Result<EventOutcome, AgentError>> {
    Box::pin(async move {
        match event {
            AgentEvent::Message(value) => agent.handle_message(&value).await.map(EventOutcome::Message),
            other => Err(unexpected(EventKind::Message, &other)),
        }
    })
}
