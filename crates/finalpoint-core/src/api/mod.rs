//! REST client for the FinalPoint API.
//!
//! Only the push-subscription endpoint is used by the agent; requests carry
//! an optional bearer token from the `auth` token store.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
