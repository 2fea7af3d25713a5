//! The API fetcher seam.
//!
//! Everything that talks to OpenMic goes through [`ApiFetcher`], so request
//! mapping and change detection can be exercised without a network.

use crate::error::FetchError;
use async_trait::async_trait;
use rootcause::Report;
use serde_json::Value as JsonValue;
use std::fmt;

/// HTTP methods used by the OpenMic API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    /// Upper-case method name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request against the OpenMic API, relative to the base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path beginning with `/v1/`.
    pub path: String,
    /// JSON body, if any.
    pub body: Option<JsonValue>,
    /// Query parameters in insertion order.
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    /// Creates a request with no body or query.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: Vec::new(),
        }
    }

    /// Shorthand for a GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Appends a query parameter when a value is present.
    #[must_use]
    pub fn with_optional_query<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with_query(key, value),
            None => self,
        }
    }

    /// Looks up a query parameter by key.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Performs authenticated requests against the OpenMic API.
#[async_trait]
pub trait ApiFetcher: Send + Sync {
    /// Sends the request and returns the parsed JSON response.
    ///
    /// An empty response body is returned as `JsonValue::Null`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails to complete, the API answers
    /// with a non-success status, or the body is not JSON.
    async fn fetch(&self, request: ApiRequest) -> Result<JsonValue, Report<FetchError>>;
}

#[async_trait]
impl<T: ApiFetcher + ?Sized> ApiFetcher for std::sync::Arc<T> {
    async fn fetch(&self, request: ApiRequest) -> Result<JsonValue, Report<FetchError>> {
        (**self).fetch(request).await
    }
}
