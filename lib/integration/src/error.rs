//! Error types for the integration crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `FetchError`: Transport-level failures talking to the OpenMic API
//! - `ConnectorError`: Operation-level failures (bad parameters, unknown
//!   operations, requests that reached the API and failed)

use std::fmt;

/// Errors from the API fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The HTTP client could not be built.
    ClientSetup { reason: String },
    /// The request never produced a response (DNS, TLS, timeout, reset).
    Connection { reason: String },
    /// The API answered with a non-success status.
    Status { status: u16, body: String },
    /// The response body was not valid JSON.
    Decode { reason: String },
    /// The request could not be constructed (bad URL, bad header value).
    InvalidRequest { reason: String },
}

impl FetchError {
    /// HTTP status of the failed response, if the API answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body of the failed response, if one was received.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } if !body.is_empty() => Some(body),
            _ => None,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientSetup { reason } => write!(f, "http client setup failed: {reason}"),
            Self::Connection { reason } => write!(f, "connection failed: {reason}"),
            Self::Status { status, body } => {
                if body.is_empty() {
                    write!(f, "api returned status {status}")
                } else {
                    write!(f, "api returned status {status}: {body}")
                }
            }
            Self::Decode { reason } => write!(f, "invalid json in response: {reason}"),
            Self::InvalidRequest { reason } => write!(f, "invalid request: {reason}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Errors from connector operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    /// The API rejected the credential.
    AuthenticationFailed { status: u16 },
    /// No operation with this name exists.
    OperationNotSupported { operation: String },
    /// Operation parameters failed validation.
    InvalidParameters { operation: String, reason: String },
    /// The request was sent but did not succeed.
    RequestFailed { operation: String },
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticationFailed { status } => {
                write!(f, "authentication failed (status {status})")
            }
            Self::OperationNotSupported { operation } => {
                write!(f, "operation not supported: {operation}")
            }
            Self::InvalidParameters { operation, reason } => {
                write!(f, "invalid parameters for '{operation}': {reason}")
            }
            Self::RequestFailed { operation } => {
                write!(f, "request for '{operation}' failed")
            }
        }
    }
}

impl std::error::Error for ConnectorError {}
