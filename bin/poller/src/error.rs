//! Error types for the poller binary.

use std::fmt;

/// Errors from one scheduled poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// The poll itself failed. Configuration failures repeat on every poll.
    Poll { fatal: bool },
    /// Emitted events could not be written out.
    Output { reason: String },
}

impl RunError {
    /// Returns true if polling again cannot succeed.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Poll { fatal } => *fatal,
            Self::Output { .. } => true,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Poll { .. } => write!(f, "poll failed"),
            Self::Output { reason } => write!(f, "writing output failed: {reason}"),
        }
    }
}

impl std::error::Error for RunError {}
