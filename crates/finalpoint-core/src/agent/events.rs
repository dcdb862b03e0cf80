use std::fmt;

use reqwest::Url;

use super::click::NotificationClick;
use super::fetch::FetchResponse;
use super::message::MessageOutcome;
use crate::http::Request;
use crate::platform::Notification;

/// A lifecycle or functional event delivered to the agent.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    Install,
    Activate,
    Fetch(Request),
    /// Raw push message data, if the push carried any.
    Push(Option<Vec<u8>>),
    NotificationClick(NotificationClick),
    Sync { tag: String },
    Message(serde_json::Value),
}

impl AgentEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AgentEvent::Install => EventKind::Install,
            AgentEvent::Activate => EventKind::Activate,
            AgentEvent::Fetch(_) => EventKind::Fetch,
            AgentEvent::Push(_) => EventKind::Push,
            AgentEvent::NotificationClick(_) => EventKind::NotificationClick,
            AgentEvent::Sync { .. } => EventKind::Sync,
            AgentEvent::Message(_) => EventKind::Message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
    Push,
    NotificationClick,
    Sync,
    Message,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Install,
        EventKind::Activate,
        EventKind::Fetch,
        EventKind::Push,
        EventKind::NotificationClick,
        EventKind::Sync,
        EventKind::Message,
    ];

    /// Functional events only reach a worker that has activated.
    pub fn requires_activation(&self) -> bool {
        matches!(self, EventKind::Fetch | EventKind::Push)
    }

    /// DOM event name.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Install => "install",
            EventKind::Activate => "activate",
            EventKind::Fetch => "fetch",
            EventKind::Push => "push",
            EventKind::NotificationClick => "notificationclick",
            EventKind::Sync => "sync",
            EventKind::Message => "message",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a settled event produced.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    Installed {
        /// Whether the application shell made it into the cache
        seeded: bool,
    },
    Activated {
        /// Buckets removed during activation, in deletion order
        deleted: Vec<String>,
    },
    Fetch(FetchResponse),
    Push {
        notification: Notification,
        displayed: bool,
    },
    NotificationClick {
        opened: Option<Url>,
    },
    Synced {
        tag: String,
    },
    Message(MessageOutcome),
}

impl EventOutcome {
    /// Kind of the event this outcome settles.
    pub fn kind(&self) -> EventKind {
        match self {
            EventOutcome::Installed { .. } => EventKind::Install,
            EventOutcome::Activated { .. } => EventKind::Activate,
            EventOutcome::Fetch(_) => EventKind::Fetch,
            EventOutcome::Push { .. } => EventKind::Push,
            EventOutcome::NotificationClick { .. } => EventKind::NotificationClick,
            EventOutcome::Synced { .. } => EventKind::Sync,
            EventOutcome::Message(_) => EventKind::Message,
        }
    }
}
