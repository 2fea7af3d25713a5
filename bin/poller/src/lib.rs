//! Standalone OpenMic "Watch Calls" poller.
//!
//! Polls the calls listing on a fixed interval and writes every new call as
//! one JSON line, so the output can be piped into any line-oriented consumer.

pub mod config;
pub mod error;
pub mod runner;
