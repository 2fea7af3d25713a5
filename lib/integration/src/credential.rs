//! OpenMic API credentials.
//!
//! The platform authenticates with a single API key sent as a bearer token.
//! The key never appears in `Debug` output or logs.

use serde::Deserialize;
use std::fmt;

/// Path the platform exposes for checking that a key is accepted.
pub const CREDENTIAL_TEST_PATH: &str = "/v1/whoami";

/// An OpenMic API key.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct ApiCredential {
    api_key: String,
}

impl ApiCredential {
    /// Wraps an API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Returns true if no key was configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.api_key.trim().is_empty()
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn authorization_value(&self) -> String {
        format!("Bearer {}", self.api_key.trim())
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("api_key", &"<redacted>")
            .finish()
    }
}
