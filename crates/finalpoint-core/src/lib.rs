//! FinalPoint offline/notification agent.
//!
//! This crate contains the client-side pieces of the FinalPoint web app that
//! carry real state and lifecycle:
//!
//! - `agent`: the service-worker style agent (cache lifecycle, fetch
//!   interception, push receiving, notification click routing)
//! - `prompt`: the notification-permission trigger heuristic and the
//!   permission/subscription flow that sits beside it
//! - `refresh`: periodic re-registration of the push subscription
//! - `api`: REST client for the push-subscription endpoint
//! - `storage`: cache buckets and a typed key-value store
//! - `platform`: traits standing in for browser primitives
//!
//! Browser APIs are modelled as traits so the same logic runs under a
//! terminal host, an embedding runtime, or in-memory test doubles.

pub mod agent;
pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod http;
pub mod platform;
pub mod prompt;
pub mod refresh;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{Agent, AgentError, AgentEvent, AgentHost, EventKind, EventOutcome};
pub use config::{AgentConfig, Config};
pub use http::{Method, Request, RequestMode, Response, ResponseType};
pub use prompt::{DismissStrategy, NotificationPrompt, TriggerState};
pub use reqwest::Url;
