//! Error foundation shared by the OpenMic crates.
//!
//! Every crate keeps its own error enums next to the code that raises them
//! and carries them in a rootcause [`Report`]. Callers wrap lower-level
//! reports with `.context()` so the chain reads from operation to cause.

use rootcause::Report;

/// Result carrying a rootcause report of context `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
