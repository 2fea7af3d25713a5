//! "Watch Calls" polling trigger.
//!
//! This crate provides:
//!
//! - **Records**: typed call records and validation of the calls listing
//! - **Events**: the normalized [`CallEvent`] emitted per new call
//! - **Watermarks**: per-trigger persisted deduplication state
//! - **Poller**: the change detector tying them together

pub mod error;
pub mod event;
pub mod poller;
pub mod record;
pub mod watermark;

pub use error::{PollError, WatermarkError};
pub use event::CallEvent;
pub use poller::{CallPoller, Detection, PendingPoll, PollConfig, PollOutcome, PollStage, detect};
pub use record::{CallRecord, CallStatus, ShapeDiagnostic, parse_page};
pub use watermark::{FileWatermarkStore, InMemoryWatermarkStore, Watermark, WatermarkStore};
