//! API bearer token storage in the OS keychain.

pub mod credentials;

pub use credentials::TokenStore;
