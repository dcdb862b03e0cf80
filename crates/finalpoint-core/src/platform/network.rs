//! `Network` backed by `reqwest`.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use super::{Network, NetworkError};
use crate::http::{Method, Request, RequestMode, Response, ResponseType};

/// Connection timeout in seconds.
/// Only connection setup is bounded; slow bodies are left to run.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Fetches over real HTTP, tainting responses the way a browser would:
/// same-origin responses are `Basic`, `no-cors` cross-origin responses are
/// `Opaque`, and everything else is `Cors`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpNetwork {
    client: Client,
    origin: Url,
}

impl HttpNetwork {
    pub fn new(origin: Url) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, origin })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    fn to_reqwest_method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }

    fn response_type(&self, final_url: &Url, mode: RequestMode) -> ResponseType {
        if final_url.origin() == self.origin.origin() {
            ResponseType::Basic
        } else if mode == RequestMode::NoCors {
            ResponseType::Opaque
        } else {
            ResponseType::Cors
        }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        if !matches!(request.url.scheme(), "http" | "https") {
            return Err(NetworkError::Unsupported(request.url.to_string()));
        }

        let response = self
            .client
            .request(Self::to_reqwest_method(request.method), request.url.clone())
            .send()
            .await?;

        let final_url = response.url().clone();
        let response_type = self.response_type(&final_url, request.mode);
        let status = response.status();

        // Opaque responses expose nothing to the caller
        if response_type == ResponseType::Opaque {
            debug!(url = %final_url, "Opaque cross-origin response");
            return Ok(Response::new(final_url.as_str(), 0, ResponseType::Opaque));
        }

        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(Response {
            url: final_url.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            response_type,
            headers,
            body,
        })
    }
}
