//! Call records as returned by the calls listing, and validation of the
//! listing response.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a call.
///
/// Statuses this crate does not know are kept verbatim so a record is never
/// dropped because the platform added a new status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CallStatus {
    Registered,
    Ongoing,
    #[default]
    Ended,
    Error,
    NotConnected,
    Other(String),
}

impl CallStatus {
    /// The wire value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Registered => "registered",
            Self::Ongoing => "ongoing",
            Self::Ended => "ended",
            Self::Error => "error",
            Self::NotConnected => "not_connected",
            Self::Other(other) => other,
        }
    }

    /// Returns true for the statuses the calls listing can filter by.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for CallStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "registered" => Self::Registered,
            "ongoing" => Self::Ongoing,
            "ended" => Self::Ended,
            "error" => Self::Error,
            "not_connected" => Self::NotConnected,
            _ => Self::Other(value),
        }
    }
}

impl From<CallStatus> for String {
    fn from(status: CallStatus) -> Self {
        match status {
            CallStatus::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for CallStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Epoch milliseconds that may arrive as integers, floats or `null`.
fn lenient_millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Option::<JsonValue>::deserialize(deserializer)? {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {n}"))),
        Some(other) => Err(de::Error::custom(format!(
            "timestamp must be a number, got {other}"
        ))),
    }
}

/// A status string; any other JSON value is treated as no status.
fn lenient_status<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<CallStatus>, D::Error> {
    Ok(match Option::<JsonValue>::deserialize(deserializer)? {
        Some(JsonValue::String(status)) => Some(CallStatus::from(status)),
        _ => None,
    })
}

/// One call as listed by `GET /v1/calls`.
///
/// Only `call_id` and the timestamps can make a record invalid. Every other
/// field is carried through untouched, whatever its JSON type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallRecord {
    pub call_id: String,
    #[serde(default, deserialize_with = "lenient_status")]
    pub call_status: Option<CallStatus>,
    #[serde(default, deserialize_with = "lenient_millis")]
    pub start_timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_millis")]
    pub end_timestamp: Option<i64>,
    #[serde(default)]
    pub duration_ms: Option<JsonValue>,
    #[serde(default)]
    pub from_number: Option<JsonValue>,
    #[serde(default)]
    pub to_number: Option<JsonValue>,
    #[serde(default)]
    pub agent_id: Option<JsonValue>,
    #[serde(default)]
    pub customer_id: Option<JsonValue>,
    #[serde(default)]
    pub call_type: Option<JsonValue>,
    #[serde(default)]
    pub direction: Option<JsonValue>,
    #[serde(default)]
    pub transcript: Option<JsonValue>,
    #[serde(default)]
    pub recording_url: Option<JsonValue>,
    #[serde(default)]
    pub latency: Option<JsonValue>,
    #[serde(default)]
    pub call_analysis: Option<JsonValue>,
    #[serde(default)]
    pub call_cost: Option<JsonValue>,
    #[serde(default)]
    pub dynamic_variables: Option<JsonValue>,
}

impl CallRecord {
    /// The instant used for freshness comparison: the end time once the
    /// call has concluded, otherwise the start time. Zero counts as unset.
    #[must_use]
    pub fn effective_timestamp(&self) -> Option<i64> {
        self.end_timestamp
            .filter(|ts| *ts != 0)
            .or(self.start_timestamp.filter(|ts| *ts != 0))
    }
}

/// Structured report of a listing response that could not be understood.
///
/// Serializes in the shape hosts already display for poll diagnostics:
/// `{"_error": true, "error": ..., "message": ..., "response": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeDiagnostic {
    #[serde(rename = "_error")]
    flag: bool,
    /// Short classification.
    pub error: String,
    /// Human-readable explanation.
    pub message: String,
    /// The offending response, when there was one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<JsonValue>,
}

impl ShapeDiagnostic {
    fn new(error: &str, message: impl Into<String>, response: Option<JsonValue>) -> Self {
        Self {
            flag: true,
            error: error.to_string(),
            message: message.into(),
            response,
        }
    }

    fn empty() -> Self {
        Self::new(
            "Empty response from API",
            "The API returned an empty response",
            None,
        )
    }

    fn missing_calls(response: &JsonValue) -> Self {
        Self::new(
            "Invalid response structure",
            "Response does not contain a valid calls array",
            Some(response.clone()),
        )
    }

    fn invalid_record(index: usize, reason: impl fmt::Display, response: &JsonValue) -> Self {
        Self::new(
            "Invalid call record",
            format!("call at index {index} is not a valid call object: {reason}"),
            Some(response.clone()),
        )
    }
}

impl fmt::Display for ShapeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Validates a calls listing response and parses its records in order.
///
/// # Errors
///
/// Returns a diagnostic if the response is empty, lacks a `calls` list, or
/// contains an element that is not a call object.
pub fn parse_page(response: &JsonValue) -> Result<Vec<CallRecord>, ShapeDiagnostic> {
    if response.is_null() {
        return Err(ShapeDiagnostic::empty());
    }

    let calls = response
        .get("calls")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| ShapeDiagnostic::missing_calls(response))?;

    calls
        .iter()
        .enumerate()
        .map(|(index, call)| {
            CallRecord::deserialize(call)
                .map_err(|e| ShapeDiagnostic::invalid_record(index, e, response))
        })
        .collect()
}
