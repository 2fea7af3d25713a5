//! Typed access to operation parameters.
//!
//! Operation parameters arrive as a JSON object. Empty strings are treated
//! the same as absent values, so optional fields left blank by a caller are
//! never sent to the API.

use crate::error::ConnectorError;
use serde_json::{Map, Value as JsonValue};

/// Borrowed view over an operation's parameter object.
#[derive(Debug, Clone, Copy)]
pub struct Params<'a> {
    operation: &'a str,
    values: Option<&'a Map<String, JsonValue>>,
}

impl<'a> Params<'a> {
    /// Wraps the parameters of `operation`. Non-object parameters behave as
    /// an empty object.
    #[must_use]
    pub fn new(operation: &'a str, parameters: &'a JsonValue) -> Self {
        Self {
            operation,
            values: parameters.as_object(),
        }
    }

    /// Name of the operation these parameters belong to.
    #[must_use]
    pub fn operation(&self) -> &'a str {
        self.operation
    }

    /// Builds an `InvalidParameters` error for this operation.
    #[must_use]
    pub fn invalid(&self, reason: impl Into<String>) -> ConnectorError {
        ConnectorError::InvalidParameters {
            operation: self.operation.to_string(),
            reason: reason.into(),
        }
    }

    fn raw(&self, key: &str) -> Option<&'a JsonValue> {
        self.values
            .and_then(|map| map.get(key))
            .filter(|value| !value.is_null())
    }

    /// A non-blank string parameter, if present.
    ///
    /// Numbers are accepted and rendered as strings.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is neither a string nor a number.
    pub fn optional_str(&self, key: &str) -> Result<Option<String>, ConnectorError> {
        match self.raw(key) {
            None => Ok(None),
            Some(JsonValue::String(s)) if s.trim().is_empty() => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s.trim().to_string())),
            Some(JsonValue::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(self.invalid(format!("{key} must be a string"))),
        }
    }

    /// A string parameter that must be present and non-blank.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is missing, blank or not a string.
    pub fn required_str(&self, key: &str) -> Result<String, ConnectorError> {
        self.optional_str(key)?
            .ok_or_else(|| self.invalid(format!("{key} is required")))
    }

    /// A required parameter interpolated as a single URL path segment.
    ///
    /// The value is percent-encoded so `/`, `?` and `#` cannot change the
    /// request target.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is missing, blank or not a string.
    pub fn path_segment(&self, key: &str) -> Result<String, ConnectorError> {
        let value = self.required_str(key)?;
        Ok(urlencoding::encode(&value).into_owned())
    }

    /// A non-negative integer parameter, if present.
    ///
    /// Integer-valued strings are accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a non-negative integer.
    pub fn optional_u64(&self, key: &str) -> Result<Option<u64>, ConnectorError> {
        match self.raw(key) {
            None => Ok(None),
            Some(JsonValue::String(s)) if s.trim().is_empty() => Ok(None),
            Some(JsonValue::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.invalid(format!("{key} must be a non-negative integer"))),
            Some(JsonValue::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(format!("{key} must be a non-negative integer"))),
            Some(_) => Err(self.invalid(format!("{key} must be a non-negative integer"))),
        }
    }

    /// A JSON object parameter, if present and non-empty.
    ///
    /// A string holding a JSON object is parsed, since form-based callers
    /// submit objects as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an object or object text.
    pub fn optional_object(&self, key: &str) -> Result<Option<Map<String, JsonValue>>, ConnectorError> {
        let object = match self.raw(key) {
            None => return Ok(None),
            Some(JsonValue::Object(map)) => map.clone(),
            Some(JsonValue::String(s)) if s.trim().is_empty() => return Ok(None),
            Some(JsonValue::String(s)) => match serde_json::from_str::<JsonValue>(s) {
                Ok(JsonValue::Object(map)) => map,
                _ => return Err(self.invalid(format!("{key} must be a JSON object"))),
            },
            Some(_) => return Err(self.invalid(format!("{key} must be a JSON object"))),
        };
        Ok((!object.is_empty()).then_some(object))
    }

    /// A nested collection of parameters (e.g. `additional_fields`).
    #[must_use]
    pub fn collection(&self, key: &str) -> Params<'a> {
        Params {
            operation: self.operation,
            values: self.raw(key).and_then(JsonValue::as_object),
        }
    }
}
