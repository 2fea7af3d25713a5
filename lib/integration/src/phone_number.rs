//! Request mapping for phone number management.

use crate::error::ConnectorError;
use crate::fetcher::{ApiRequest, Method};
use crate::params::Params;
use openmic_core::PhoneNumber;
use serde_json::{Map, Value as JsonValue};

const BASE_PATH: &str = "/v1/phone-numbers";

/// Agent and nickname fields shared by create and update.
const ASSIGNMENT_FIELDS: &[&str] = &["inbound_agent_id", "outbound_agent_id", "nickname"];

fn area_code(params: &Params<'_>, value: Option<u64>) -> Result<Option<u64>, ConnectorError> {
    match value {
        Some(code) if !(100..=999).contains(&code) => {
            Err(params.invalid("area_code must be a 3 digit integer"))
        }
        other => Ok(other),
    }
}

fn number_path(params: &Params<'_>) -> Result<String, ConnectorError> {
    let raw = params.required_str("phone_number")?;
    let number: PhoneNumber = raw
        .parse()
        .map_err(|e: openmic_core::ParsePhoneNumberError| params.invalid(e.to_string()))?;
    Ok(format!("{BASE_PATH}/{number}"))
}

fn assignment_body(fields: &Params<'_>) -> Result<Map<String, JsonValue>, ConnectorError> {
    let mut body = Map::new();
    for field in ASSIGNMENT_FIELDS {
        if let Some(value) = fields.optional_str(field)? {
            body.insert((*field).to_string(), JsonValue::String(value));
        }
    }
    Ok(body)
}

/// `phone_number.create`: provisions a number in the given area code.
///
/// # Errors
///
/// Returns an error if `area_code` is missing or not three digits.
pub fn create(params: &Params<'_>) -> Result<ApiRequest, ConnectorError> {
    let code = area_code(params, params.optional_u64("area_code")?)?
        .ok_or_else(|| params.invalid("area_code is required"))?;

    let mut body = assignment_body(&params.collection("additional_fields"))?;
    body.insert("area_code".into(), JsonValue::from(code));

    Ok(ApiRequest::new(Method::Post, BASE_PATH).with_body(JsonValue::Object(body)))
}

/// `phone_number.get`: fetches one number.
///
/// # Errors
///
/// Returns an error if `phone_number` is missing or not E.164.
pub fn get(params: &Params<'_>) -> Result<ApiRequest, ConnectorError> {
    Ok(ApiRequest::get(number_path(params)?))
}

/// `phone_number.get_all`: lists numbers with optional filters.
///
/// # Errors
///
/// Returns an error if a filter has the wrong type.
pub fn list(params: &Params<'_>) -> Result<ApiRequest, ConnectorError> {
    let filters = params.collection("filters");
    Ok(ApiRequest::get(BASE_PATH)
        .with_optional_query("limit", params.optional_u64("limit")?)
        .with_optional_query("area_code", area_code(params, filters.optional_u64("area_code")?)?)
        .with_optional_query("inbound_agent_id", filters.optional_str("inbound_agent_id")?)
        .with_optional_query("outbound_agent_id", filters.optional_str("outbound_agent_id")?))
}

/// `phone_number.update`: changes agent assignment or nickname.
///
/// # Errors
///
/// Returns an error if the number is invalid or no field is given.
pub fn update(params: &Params<'_>) -> Result<ApiRequest, ConnectorError> {
    let path = number_path(params)?;
    let body = assignment_body(&params.collection("update_fields"))?;
    if body.is_empty() {
        return Err(params.invalid("at least one update field is required"));
    }
    Ok(ApiRequest::new(Method::Patch, path).with_body(JsonValue::Object(body)))
}

/// `phone_number.delete`: releases a number.
///
/// # Errors
///
/// Returns an error if `phone_number` is missing or not E.164.
pub fn delete(params: &Params<'_>) -> Result<ApiRequest, ConnectorError> {
    Ok(ApiRequest::new(Method::Delete, number_path(params)?))
}
