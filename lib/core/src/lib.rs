//! Core types for the OpenMic integration.
//!
//! Holds the pieces every other crate agrees on: the trigger identifier
//! that scopes persisted poll state, E.164 phone numbers, and the
//! rootcause-based `Result` alias.

pub mod error;
pub mod id;
pub mod phone;

pub use error::Result;
pub use id::{ParseIdError, TriggerId};
pub use phone::{ParsePhoneNumberError, PhoneNumber};
