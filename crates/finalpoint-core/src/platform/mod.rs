//! Traits standing in for the browser primitives the agent relies on.
//!
//! - `Network`: the Fetch API as seen from a service worker
//! - `Notifier`: `registration.showNotification` and `notification.close`
//! - `WorkerScope`: `skipWaiting`, `clients.claim` and `clients.openWindow`
//!
//! The terminal host provides real implementations; tests use the doubles in
//! the crate's `testing` module.

pub mod network;
pub mod notification;

use async_trait::async_trait;
use reqwest::Url;
use thiserror::Error;

use crate::http::{Request, Response};

pub use network::HttpNetwork;
pub use notification::{Notification, NotificationAction, NotificationOptions};

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Network unreachable: {0}")]
    Unreachable(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unsupported request: {0}")]
    Unsupported(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Permission error: {0}")]
    Permission(String),

    #[error("Push service error: {0}")]
    Push(String),
}

#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<(), PlatformError>;

    /// Dismiss the notification carrying `tag`.
    async fn close(&self, tag: &str) -> Result<(), PlatformError>;
}

#[async_trait]
pub trait WorkerScope: Send + Sync {
    /// Activate this worker without waiting for old clients to close.
    async fn skip_waiting(&self) -> Result<(), PlatformError>;

    /// Take control of every open client in scope.
    async fn claim_clients(&self) -> Result<(), PlatformError>;

    async fn open_window(&self, url: &Url) -> Result<(), PlatformError>;
}
