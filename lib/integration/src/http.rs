//! reqwest-backed [`ApiFetcher`].

use crate::credential::ApiCredential;
use crate::error::FetchError;
use crate::fetcher::{ApiFetcher, ApiRequest, Method};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use rootcause::Report;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, instrument};

/// Connection settings for the OpenMic API.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL, without a trailing `/v1`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "https://api.openmic.ai".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Talks to the OpenMic API over HTTPS with bearer authentication.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
    credential: ApiCredential,
}

impl HttpFetcher {
    /// Builds a fetcher for the given credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential is blank or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &ClientConfig, credential: ApiCredential) -> Result<Self, Report<FetchError>> {
        if credential.is_empty() {
            return Err(FetchError::InvalidRequest {
                reason: "api key is empty".to_string(),
            }
            .into());
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| FetchError::ClientSetup {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credential,
        })
    }

    fn headers(&self) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let auth = HeaderValue::from_str(&self.credential.authorization_value()).map_err(|e| {
            FetchError::InvalidRequest {
                reason: format!("invalid authorization header: {e}"),
            }
        })?;
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

#[async_trait]
impl ApiFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn fetch(&self, request: ApiRequest) -> Result<JsonValue, Report<FetchError>> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, self.url(&request.path))
            .headers(self.headers()?);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| FetchError::Connection {
            reason: e.to_string(),
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| FetchError::Connection {
            reason: format!("reading response body: {e}"),
        })?;
        debug!(status = status.as_u16(), bytes = text.len(), "response received");

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        if text.trim().is_empty() {
            return Ok(JsonValue::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            FetchError::Decode {
                reason: e.to_string(),
            }
            .into()
        })
    }
}
