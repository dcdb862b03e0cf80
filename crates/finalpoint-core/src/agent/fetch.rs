//! Fetch interception: cache-first for app pages, straight to network for
//! API calls, build assets and anything that is not a GET.

use reqwest::Url;
use tracing::{debug, warn};

use super::{Agent, AgentError};
use crate::http::{Method, Request, Response};

/// Requests matching any of these rules never touch the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BypassRules {
    /// Path prefixes (API routes, framework assets)
    pub path_prefixes: Vec<String>,
    /// Substrings of the full URL (dev-server port, bundler name)
    pub url_markers: Vec<String>,
    /// Path suffixes (scripts, styles, source maps, data files)
    pub extensions: Vec<String>,
}

impl Default for BypassRules {
    fn default() -> Self {
        Self {
            path_prefixes: vec!["/api/".to_string(), "/_next/".to_string()],
            url_markers: vec![":3000".to_string(), "webpack".to_string()],
            extensions: vec![
                ".js".to_string(),
                ".css".to_string(),
                ".map".to_string(),
                ".json".to_string(),
            ],
        }
    }
}

/// Which rule sent a request around the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BypassReason {
    PathPrefix(String),
    UrlMarker(String),
    Extension(String),
}

impl BypassRules {
    pub fn matches(&self, url: &Url) -> Option<BypassReason> {
        let path = url.path();
        if let Some(prefix) = self.path_prefixes.iter().find(|p| path.starts_with(p.as_str())) {
            return Some(BypassReason::PathPrefix(prefix.clone()));
        }
        let full = url.as_str();
        if let Some(marker) = self.url_markers.iter().find(|m| full.contains(m.as_str())) {
            return Some(BypassReason::UrlMarker(marker.clone()));
        }
        self.extensions
            .iter()
            .find(|ext| path.ends_with(ext.as_str()))
            .map(|ext| BypassReason::Extension(ext.clone()))
    }
}

/// How the agent answered a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResponse {
    /// The agent declined; the host performs a plain network fetch.
    Passthrough,
    FromCache(Response),
    FromNetwork(Response),
}

impl FetchResponse {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchResponse::Passthrough => None,
            FetchResponse::FromCache(r) | FetchResponse::FromNetwork(r) => Some(r),
        }
    }

    pub fn is_from_cache(&self) -> bool {
        matches!(self, FetchResponse::FromCache(_))
    }
}

impl Agent {
    /// Handle `fetch`.
    ///
    /// Cache hits are returned as stored, with no revalidation. On a miss
    /// only `200` same-origin responses are written back. When the network
    /// fails, navigations fall back to the cached application shell; every
    /// other failure is returned to the caller.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchResponse, AgentError> {
        if request.method != Method::Get {
            debug!(method = %request.method, url = %request.url, "Not intercepting non-GET request");
            return Ok(FetchResponse::Passthrough);
        }

        if let Some(reason) = self.config.bypass.matches(&request.url) {
            debug!(url = %request.url, ?reason, "Bypassing cache");
            return Ok(FetchResponse::Passthrough);
        }

        let version = &self.config.cache_version;
        let key = request.cache_key();

        match self.services.caches.match_request(version, &key).await {
            Ok(Some(cached)) => {
                debug!(url = %key, "Cache hit");
                return Ok(FetchResponse::FromCache(cached));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(url = %key, error = %e, "Cache lookup failed, treating as miss");
            }
        }

        match self.services.network.fetch(request).await {
            Ok(response) => {
                if !response.is_cacheable() {
                    debug!(
                        url = %key,
                        status = response.status,
                        response_type = ?response.response_type,
                        "Not caching response"
                    );
                    return Ok(FetchResponse::FromNetwork(response));
                }
                if let Err(e) = self
                    .services
                    .caches
                    .put(version, &key, response.clone())
                    .await
                {
                    warn!(url = %key, error = %e, "Failed to store response");
                }
                Ok(FetchResponse::FromNetwork(response))
            }
            Err(e) if request.is_navigation() => {
                warn!(url = %key, error = %e, "Navigation failed, trying cached shell");
                match self.cached_shell().await {
                    Some(shell) => Ok(FetchResponse::FromCache(shell)),
                    None => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn cached_shell(&self) -> Option<Response> {
        let shell = self.config.shell_url()?;
        match self
            .services
            .caches
            .match_request(&self.config.cache_version, shell.as_str())
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Failed to read cached shell");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ResponseType;
    use crate::storage::CacheStorage;
    use crate::testing::Harness;

    const VERSION: &str = "finalpoint-v1";

    fn url(s: &str) -> Url {
        Url::parse(s).expect("test url")
    }

    fn basic(u: &str, body: &str) -> Response {
        Response::new(u, 200, ResponseType::Basic).with_body(body)
    }

    #[test]
    fn test_bypass_rules() {
        let rules = BypassRules::default();
        let cases = [
            ("https://finalpoint.app/api/leagues", true),
            ("https://finalpoint.app/_next/static/chunk", true),
            ("http://localhost:3000/dashboard", true),
            ("https://finalpoint.app/webpack-hmr", true),
            ("https://finalpoint.app/app.js", true),
            ("https://finalpoint.app/styles.css", true),
            ("https://finalpoint.app/app.js.map", true),
            ("https://finalpoint.app/manifest.json", true),
            ("https://finalpoint.app/", false),
            ("https://finalpoint.app/leagues/4", false),
            ("https://finalpoint.app/apis", false),
            ("https://finalpoint.app/icons/icon-192x192.png", false),
        ];
        for (u, bypassed) in cases {
            assert_eq!(rules.matches(&url(u)).is_some(), bypassed, "{}", u);
        }
        assert_eq!(
            rules.matches(&url("https://finalpoint.app/api/picks")),
            Some(BypassReason::PathPrefix("/api/".to_string()))
        );
    }

    #[tokio::test]
    async fn test_non_get_passes_through() {
        let harness = Harness::new();
        let agent = harness.agent();
        let request =
            Request::get(url("https://finalpoint.app/leagues")).with_method(Method::Post);

        let result = agent.handle_fetch(&request).await.unwrap();
        assert_eq!(result, FetchResponse::Passthrough);
        assert_eq!(harness.network.call_count(), 0);
        assert_eq!(harness.caches.reads(), 0);
    }

    #[tokio::test]
    async fn test_bypassed_requests_never_touch_cache() {
        let harness = Harness::new();
        let agent = harness.agent();
        for u in [
            "https://finalpoint.app/api/leagues",
            "https://finalpoint.app/_next/data.js",
            "https://finalpoint.app/site.css",
        ] {
            harness.caches.put(VERSION, u, basic(u, "stale")).await.unwrap();
            let result = agent.handle_fetch(&Request::get(url(u))).await.unwrap();
            assert_eq!(result, FetchResponse::Passthrough);
        }
        assert_eq!(harness.caches.reads(), 0);
        // Only the three seeding writes above
        assert_eq!(harness.caches.writes(), 3);
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let harness = Harness::new();
        let page = "https://finalpoint.app/leagues/4";
        harness.network.respond(page, basic(page, "league"));
        let agent = harness.agent();
        let request = Request::get(url(page));

        let first = agent.handle_fetch(&request).await.unwrap();
        assert!(matches!(first, FetchResponse::FromNetwork(_)));
        assert_eq!(harness.network.call_count(), 1);

        let second = agent.handle_fetch(&request).await.unwrap();
        assert!(second.is_from_cache());
        assert_eq!(second.response().map(|r| r.body.clone()), Some(b"league".to_vec()));
        assert_eq!(harness.network.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_is_returned_verbatim() {
        let harness = Harness::new();
        let page = "https://finalpoint.app/standings";
        let stored = basic(page, "old standings").with_header("x-version", "1");
        harness.caches.put(VERSION, page, stored.clone()).await.unwrap();
        harness.network.respond(page, basic(page, "new standings"));
        let agent = harness.agent();

        let result = agent.handle_fetch(&Request::get(url(page))).await.unwrap();
        assert_eq!(result, FetchResponse::FromCache(stored));
        assert_eq!(harness.network.call_count(), 0);
    }

    #[tokio::test]
    async fn test_uncacheable_responses_are_not_stored() {
        let harness = Harness::new();
        let not_found = "https://finalpoint.app/missing";
        let cors = "https://finalpoint.app/avatar";
        let empty = "https://finalpoint.app/empty";
        harness
            .network
            .respond(not_found, Response::new(not_found, 404, ResponseType::Basic));
        harness
            .network
            .respond(cors, Response::new(cors, 200, ResponseType::Cors));
        harness.network.respond(empty, Response::error());
        let agent = harness.agent();

        for u in [not_found, cors, empty] {
            let result = agent.handle_fetch(&Request::get(url(u))).await.unwrap();
            assert!(matches!(result, FetchResponse::FromNetwork(_)));
        }
        assert_eq!(harness.caches.writes(), 0);
    }

    #[tokio::test]
    async fn test_navigation_failure_falls_back_to_shell() {
        let harness = Harness::new();
        let shell = "https://finalpoint.app/";
        harness.caches.put(VERSION, shell, basic(shell, "shell")).await.unwrap();
        let agent = harness.agent();

        let result = agent
            .handle_fetch(&Request::navigate(url("https://finalpoint.app/picks")))
            .await
            .unwrap();
        assert_eq!(result, FetchResponse::FromCache(basic(shell, "shell")));
    }

    #[tokio::test]
    async fn test_navigation_failure_without_shell_propagates() {
        let harness = Harness::new();
        let agent = harness.agent();

        let result = agent
            .handle_fetch(&Request::navigate(url("https://finalpoint.app/picks")))
            .await;
        assert!(matches!(result, Err(AgentError::Network(_))));
    }

    #[tokio::test]
    async fn test_subresource_failure_propagates_even_with_shell() {
        let harness = Harness::new();
        let shell = "https://finalpoint.app/";
        harness.caches.put(VERSION, shell, basic(shell, "shell")).await.unwrap();
        let agent = harness.agent();

        let result = agent
            .handle_fetch(&Request::get(url("https://finalpoint.app/icons/logo.png")))
            .await;
        assert!(matches!(result, Err(AgentError::Network(_))));
    }
}
