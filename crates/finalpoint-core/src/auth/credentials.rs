use anyhow::{Context, Result};
use keyring::Entry;

use crate::config::APP_NAME;

/// Bearer tokens keyed by account name, under the `finalpoint` keychain
/// service.
pub struct TokenStore;

impl TokenStore {
    fn entry(account: &str) -> Result<Entry> {
        Entry::new(APP_NAME, account).context("Failed to create keyring entry")
    }

    pub fn store(account: &str, token: &str) -> Result<()> {
        Self::entry(account)?
            .set_password(token)
            .context("Failed to store token in keychain")
    }

    /// The stored token, or `None` when there is none or the keychain is
    /// unavailable.
    pub fn find(account: &str) -> Option<String> {
        Self::entry(account).ok()?.get_password().ok()
    }

    pub fn delete(account: &str) -> Result<()> {
        Self::entry(account)?
            .delete_credential()
            .context("Failed to delete token from keychain")
    }

    pub fn has_token(account: &str) -> bool {
        Self::find(account).is_some()
    }
}
