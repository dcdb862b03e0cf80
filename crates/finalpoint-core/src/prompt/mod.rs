//! Notification-permission prompting.
//!
//! `NotificationPrompt` decides *when* the app may ask for notification
//! permission; it never asks itself. `PermissionFlow` performs the ask and
//! registers the resulting push subscription, and its outcome is fed back
//! to the heuristic so a refusal suppresses future prompts.

pub mod dismiss;
pub mod heuristic;
pub mod permission;
pub mod triggers;

pub use dismiss::DismissStrategy;
pub use heuristic::NotificationPrompt;
pub use permission::{
    PermissionFlow, PermissionOutcome, PermissionPrompter, PermissionState, PushManager,
    PushSubscription, SubscriptionKeys, SubscriptionSink,
};
pub use triggers::{PromptReason, TriggerState, TriggerUpdate};
