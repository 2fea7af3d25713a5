//! Error types for the trigger crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `WatermarkError`: Failures reading or writing persisted poll state
//! - `PollError`: Fatal outcomes of a single poll invocation
//!
//! A response with the wrong shape is deliberately not an error here; it
//! is reported as a diagnostic outcome so the schedule keeps running.

use openmic_core::TriggerId;
use std::fmt;

/// Errors from watermark storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatermarkError {
    /// The backing storage could not be read or written.
    StorageFailed { reason: String },
    /// Stored state exists but cannot be decoded.
    Corrupt { reason: String },
}

impl fmt::Display for WatermarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageFailed { reason } => write!(f, "watermark storage failed: {reason}"),
            Self::Corrupt { reason } => write!(f, "stored watermark is corrupt: {reason}"),
        }
    }
}

impl std::error::Error for WatermarkError {}

/// Fatal outcomes of a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    /// The poll configuration is invalid; nothing was fetched.
    Configuration { reason: String },
    /// The calls listing could not be fetched.
    Transport {
        /// HTTP status, if the API answered.
        status: Option<u16>,
        /// Response body, if one was received.
        body: Option<String>,
        /// Transport-level reason when no response arrived.
        reason: Option<String>,
    },
    /// Watermark state could not be loaded or saved.
    Watermark { trigger_id: TriggerId },
}

impl PollError {
    /// Returns true for failures a later poll may not hit (transport and
    /// storage); configuration errors repeat until the config changes.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Configuration { .. })
    }
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { reason } => write!(f, "invalid poll configuration: {reason}"),
            Self::Transport {
                status,
                body,
                reason,
            } => {
                write!(f, "fetching calls failed")?;
                if let Some(status) = status {
                    write!(f, " with status {status}")?;
                }
                if let Some(detail) = body.as_ref().or(reason.as_ref()) {
                    write!(f, ": {detail}")?;
                }
                Ok(())
            }
            Self::Watermark { trigger_id } => {
                write!(f, "watermark unavailable for trigger {trigger_id}")
            }
        }
    }
}

impl std::error::Error for PollError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_display_includes_status_and_body() {
        let err = PollError::Transport {
            status: Some(503),
            body: Some("maintenance".to_string()),
            reason: None,
        };
        assert_eq!(
            err.to_string(),
            "fetching calls failed with status 503: maintenance"
        );

        let bare = PollError::Transport {
            status: None,
            body: None,
            reason: None,
        };
        assert_eq!(bare.to_string(), "fetching calls failed");

        let refused = PollError::Transport {
            status: None,
            body: None,
            reason: Some("connection refused".to_string()),
        };
        assert_eq!(refused.to_string(), "fetching calls failed: connection refused");
    }

    #[test]
    fn configuration_errors_are_not_transient() {
        let err = PollError::Configuration {
            reason: "limit".to_string(),
        };
        assert!(!err.is_transient());
        assert!(
            PollError::Transport {
                status: None,
                body: None,
                reason: None,
            }
            .is_transient()
        );
    }

    #[test]
    fn watermark_error_display() {
        let err = WatermarkError::Corrupt {
            reason: "expected integer".to_string(),
        };
        assert!(err.to_string().contains("corrupt"));
    }
}
