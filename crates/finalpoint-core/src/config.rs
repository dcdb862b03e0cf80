//! Application configuration management.
//!
//! `Config` is the user-editable part: which origin the agent serves, where
//! the REST API lives, the VAPID public key for push subscriptions and the
//! sign-in feature flags. It is stored at `~/.config/finalpoint/config.json`
//! and can be overridden from the environment (see `ENV_*`).
//!
//! `AgentConfig` is derived from it and holds everything the agent itself
//! needs: cache version tag, routes, bypass rules and the default
//! notification payload.

use std::path::PathBuf;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::agent::fetch::BypassRules;
use crate::agent::push::NotificationPayload;

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "finalpoint";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Key-value store file name in the data directory
const STORAGE_FILE: &str = "storage.json";

/// Cache version tag. Bump on deploy to invalidate every existing bucket.
pub const CACHE_VERSION: &str = "finalpoint-v1";

/// Application shell, seeded on install and served to offline navigations
pub const SHELL_ROUTE: &str = "/";

/// Opened when a notification is clicked
pub const DASHBOARD_ROUTE: &str = "/dashboard";

const DEFAULT_ORIGIN: &str = "https://finalpoint.app";
const DEFAULT_API_BASE_URL: &str = "https://finalpoint.app/api";

pub const ENV_ORIGIN: &str = "FINALPOINT_ORIGIN";
pub const ENV_API_URL: &str = "FINALPOINT_API_URL";
pub const ENV_VAPID_PUBLIC_KEY: &str = "FINALPOINT_VAPID_PUBLIC_KEY";
pub const ENV_ENABLE_GOOGLE_SIGNIN: &str = "FINALPOINT_ENABLE_GOOGLE_SIGNIN";
pub const ENV_ENABLE_APPLE_SIGNIN: &str = "FINALPOINT_ENABLE_APPLE_SIGNIN";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    #[serde(default)]
    pub google_sign_in: bool,
    #[serde(default)]
    pub apple_sign_in: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub origin: Option<String>,
    pub api_base_url: Option<String>,
    pub vapid_public_key: Option<String>,
    /// Keychain account the API token was last stored under
    pub account: Option<String>,
    #[serde(default)]
    pub features: FeatureFlags,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Ok(serde_json::from_str(&contents).context("Failed to parse config file")?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`. Empty values are ignored.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(origin) = get(ENV_ORIGIN) {
            self.origin = Some(origin);
        }
        if let Some(api) = get(ENV_API_URL) {
            self.api_base_url = Some(api);
        }
        if let Some(key) = get(ENV_VAPID_PUBLIC_KEY) {
            self.vapid_public_key = Some(key);
        }
        if let Some(flag) = get(ENV_ENABLE_GOOGLE_SIGNIN) {
            self.features.google_sign_in = parse_flag(&flag);
        }
        if let Some(flag) = get(ENV_ENABLE_APPLE_SIGNIN) {
            self.features.apple_sign_in = parse_flag(&flag);
        }
    }

    pub fn origin_url(&self) -> Result<Url> {
        let origin = self.origin.as_deref().unwrap_or(DEFAULT_ORIGIN);
        Url::parse(origin).with_context(|| format!("Invalid origin: {}", origin))
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }

    pub fn agent_config(&self) -> Result<AgentConfig> {
        Ok(AgentConfig::new(self.origin_url()?))
    }

    /// Per-origin cache directory, so two origins never share buckets.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        let origin = self.origin_url()?;
        Ok(cache_dir.join(APP_NAME).join(origin_dir_name(&origin)))
    }

    /// Location of the key-value store backing the prompt heuristic.
    pub fn storage_path(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        let origin = self.origin_url()?;
        Ok(data_dir
            .join(APP_NAME)
            .join(origin_dir_name(&origin))
            .join(STORAGE_FILE))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn origin_dir_name(origin: &Url) -> String {
    let host = origin.host_str().unwrap_or("local");
    match origin.port() {
        Some(port) => format!("{}_{}", host, port),
        None => host.to_string(),
    }
}

/// Everything the agent needs to handle events.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub origin: Url,
    pub cache_version: String,
    pub shell_route: String,
    pub dashboard_route: String,
    pub bypass: BypassRules,
    pub default_payload: NotificationPayload,
}

impl AgentConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            cache_version: CACHE_VERSION.to_string(),
            shell_route: SHELL_ROUTE.to_string(),
            dashboard_route: DASHBOARD_ROUTE.to_string(),
            bypass: BypassRules::default(),
            default_payload: NotificationPayload::default(),
        }
    }

    pub fn with_cache_version(mut self, version: impl Into<String>) -> Self {
        self.cache_version = version.into();
        self
    }

    /// Resolve an app route against the origin.
    pub fn resolve(&self, route: &str) -> Option<Url> {
        self.origin.join(route).ok()
    }

    pub fn shell_url(&self) -> Option<Url> {
        self.resolve(&self.shell_route)
    }

    pub fn dashboard_url(&self) -> Option<Url> {
        self.resolve(&self.dashboard_route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.origin_url().unwrap().as_str(), "https://finalpoint.app/");
        assert_eq!(config.api_base_url(), DEFAULT_API_BASE_URL);
        assert_eq!(config.features, FeatureFlags::default());
    }

    #[test]
    fn test_apply_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_ORIGIN, "http://localhost:8080"),
            (ENV_API_URL, "http://localhost:6075/api"),
            (ENV_VAPID_PUBLIC_KEY, "BPublicKey"),
            (ENV_ENABLE_GOOGLE_SIGNIN, "true"),
            (ENV_ENABLE_APPLE_SIGNIN, "0"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.features.apple_sign_in = true;
        config.apply_env_with(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.origin.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.api_base_url(), "http://localhost:6075/api");
        assert_eq!(config.vapid_public_key.as_deref(), Some("BPublicKey"));
        assert!(config.features.google_sign_in);
        assert!(!config.features.apple_sign_in);
    }

    #[test]
    fn test_apply_env_ignores_empty_values() {
        let mut config = Config {
            origin: Some("https://staging.finalpoint.app".to_string()),
            ..Config::default()
        };
        config.apply_env_with(|k| (k == ENV_ORIGIN).then(|| "  ".to_string()));
        assert_eq!(config.origin.as_deref(), Some("https://staging.finalpoint.app"));
    }

    #[test]
    fn test_invalid_origin_is_error() {
        let config = Config {
            origin: Some("not a url".to_string()),
            ..Config::default()
        };
        assert!(config.origin_url().is_err());
        assert!(config.agent_config().is_err());
    }

    #[test]
    fn test_agent_config_routes() {
        let agent = AgentConfig::new(Url::parse("https://finalpoint.app").unwrap());
        assert_eq!(agent.cache_version, CACHE_VERSION);
        assert_eq!(agent.shell_url().unwrap().as_str(), "https://finalpoint.app/");
        assert_eq!(
            agent.dashboard_url().unwrap().as_str(),
            "https://finalpoint.app/dashboard"
        );
    }

    #[test]
    fn test_origin_dir_name() {
        assert_eq!(
            origin_dir_name(&Url::parse("http://localhost:8080").unwrap()),
            "localhost_8080"
        );
        assert_eq!(
            origin_dir_name(&Url::parse("https://finalpoint.app").unwrap()),
            "finalpoint.app"
        );
    }
}
