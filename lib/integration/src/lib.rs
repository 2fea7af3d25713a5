//! OpenMic API integration.
//!
//! This crate provides:
//!
//! - **Fetcher**: the [`ApiFetcher`] seam and its reqwest implementation
//! - **Credentials**: bearer API key handling
//! - **Connector**: the operation catalogue and dispatch for bots, phone
//!   calls, call records and phone numbers
//! - **Options**: bot and call pickers

pub mod connector;
pub mod credential;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod openmic;
pub mod options;
pub mod params;
pub mod phone_number;
pub mod resources;

pub use connector::{Connector, ConnectorCapability, ConnectorInfo, Operation, OperationResult};
pub use credential::ApiCredential;
pub use error::{ConnectorError, FetchError};
pub use fetcher::{ApiFetcher, ApiRequest, Method};
pub use http::{ClientConfig, HttpFetcher};
pub use openmic::OpenMicConnector;
pub use options::{OptionEntry, load_bot_options, load_call_options};
