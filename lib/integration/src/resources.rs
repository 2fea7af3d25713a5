//! Request mapping for phone calls, bots and call records.
//!
//! Each function turns validated operation parameters into one
//! [`ApiRequest`]. Validation happens here, before anything is sent.

use crate::error::ConnectorError;
use crate::fetcher::{ApiRequest, Method};
use crate::params::Params;
use openmic_core::PhoneNumber;
use serde_json::{Map, Value as JsonValue};

/// Page size used by list operations when the caller gives none.
pub const DEFAULT_LIST_LIMIT: u64 = 20;

/// Call status values accepted by the calls listing.
pub const CALL_STATUSES: &[&str] = &["registered", "ongoing", "ended", "error", "not_connected"];

/// Call type values accepted by the calls listing.
pub const CALL_TYPES: &[&str] = &["phonecall", "webcall"];

fn phone_number(params: &Params<'_>, key: &str, label: &str) -> Result<PhoneNumber, ConnectorError> {
    let raw = params.required_str(key)?;
    raw.parse().map_err(|_| {
        params.invalid(format!(
            "invalid phone number format for {label}; must be E.164 (e.g., +14157774444)"
        ))
    })
}

fn one_of(
    params: &Params<'_>,
    key: &str,
    allowed: &[&str],
) -> Result<Option<String>, ConnectorError> {
    match params.optional_str(key)? {
        Some(value) if !allowed.contains(&value.as_str()) => Err(params.invalid(format!(
            "{key} must be one of {}",
            allowed.join(", ")
        ))),
        other => Ok(other),
    }
}

fn list_limit(params: &Params<'_>) -> Result<u64, ConnectorError> {
    match params.optional_u64("limit")? {
        Some(0) => Err(params.invalid("limit must be at least 1")),
        Some(limit) => Ok(limit),
        None => Ok(DEFAULT_LIST_LIMIT),
    }
}

/// `phone_call.create`: places an outbound call.
///
/// # Errors
///
/// Returns an error if either number is missing or not E.164, or if the
/// additional fields are malformed.
pub fn create_phone_call(params: &Params<'_>) -> Result<ApiRequest, ConnectorError> {
    let from = phone_number(params, "from_number", "From Number")?;
    let to = phone_number(params, "to_number", "To Number")?;
    let extra = params.collection("additional_fields");

    let mut body = Map::new();
    body.insert("from_number".into(), JsonValue::String(from.into()));
    body.insert("to_number".into(), JsonValue::String(to.into()));
    if let Some(agent) = extra.optional_str("override_agent_id")? {
        body.insert("override_agent_id".into(), JsonValue::String(agent));
    }
    if let Some(customer) = extra.optional_str("customer_id")? {
        body.insert("customer_id".into(), JsonValue::String(customer));
    }
    if let Some(vars) = extra.optional_object("dynamic_variables")? {
        body.insert("dynamic_variables".into(), JsonValue::Object(vars));
    }
    if let Some(url) = extra.optional_str("callback_url")? {
        body.insert("callback_url".into(), JsonValue::String(url));
    }

    Ok(ApiRequest::new(Method::Post, "/v1/create-phone-call").with_body(JsonValue::Object(body)))
}

/// `bot.get`: fetches one bot by UID.
///
/// # Errors
///
/// Returns an error if `uid` is missing.
pub fn get_bot(params: &Params<'_>) -> Result<ApiRequest, ConnectorError> {
    let uid = params.path_segment("uid")?;
    Ok(ApiRequest::get(format!("/v1/bots/{uid}")))
}

/// `bot.get_all`: lists bots with optional name and creation-date filters.
///
/// # Errors
///
/// Returns an error if a filter has the wrong type.
pub fn list_bots(params: &Params<'_>) -> Result<ApiRequest, ConnectorError> {
    Ok(ApiRequest::get("/v1/bots")
        .with_query("limit", list_limit(params)?)
        .with_optional_query("name", params.optional_str("name")?)
        .with_optional_query("created_after", params.optional_str("created_after")?)
        .with_optional_query("created_before", params.optional_str("created_before")?))
}

/// `call.get`: fetches one call record by UID.
///
/// # Errors
///
/// Returns an error if `uid` is missing.
pub fn get_call(params: &Params<'_>) -> Result<ApiRequest, ConnectorError> {
    let uid = params.path_segment("uid")?;
    Ok(ApiRequest::get(format!("/v1/call/{uid}")))
}

/// `call.get_all`: lists call records.
///
/// # Errors
///
/// Returns an error if a filter has the wrong type or an unknown status or
/// call type.
pub fn list_calls(params: &Params<'_>) -> Result<ApiRequest, ConnectorError> {
    Ok(ApiRequest::get("/v1/calls")
        .with_query("limit", list_limit(params)?)
        .with_optional_query("customer_id", params.optional_str("customer_id")?)
        .with_optional_query("from_number", params.optional_str("from_number")?)
        .with_optional_query("to_number", params.optional_str("to_number")?)
        .with_optional_query("bot_id", params.optional_str("bot_id")?)
        .with_optional_query("from_date", params.optional_str("from_date")?)
        .with_optional_query("to_date", params.optional_str("to_date")?)
        .with_optional_query("call_status", one_of(params, "call_status", CALL_STATUSES)?)
        .with_optional_query("call_type", one_of(params, "call_type", CALL_TYPES)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_phone_call_minimal_body() {
        let raw = json!({"from_number": "+14155550100", "to_number": "+14155550199"});
        let request = create_phone_call(&Params::new("phone_call.create", &raw)).unwrap();

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/v1/create-phone-call");
        assert_eq!(
            request.body,
            Some(json!({"from_number": "+14155550100", "to_number": "+14155550199"}))
        );
    }

    #[test]
    fn create_phone_call_includes_additional_fields() {
        let raw = json!({
            "from_number": "+14155550100",
            "to_number": "+14155550199",
            "additional_fields": {
                "override_agent_id": "bot_9",
                "customer_id": "",
                "dynamic_variables": "{\"first_name\":\"Ada\"}",
                "callback_url": "https://example.com/hook"
            }
        });
        let request = create_phone_call(&Params::new("phone_call.create", &raw)).unwrap();
        let body = request.body.unwrap();

        assert_eq!(body["override_agent_id"], "bot_9");
        assert!(body.get("customer_id").is_none());
        assert_eq!(body["dynamic_variables"], json!({"first_name": "Ada"}));
        assert_eq!(body["callback_url"], "https://example.com/hook");
    }

    #[test]
    fn create_phone_call_rejects_non_e164() {
        let raw = json!({"from_number": "4155550100", "to_number": "+14155550199"});
        let err = create_phone_call(&Params::new("phone_call.create", &raw)).unwrap_err();
        assert!(err.to_string().contains("From Number"));

        let raw = json!({"from_number": "+14155550100", "to_number": "+0"});
        let err = create_phone_call(&Params::new("phone_call.create", &raw)).unwrap_err();
        assert!(err.to_string().contains("To Number"));
    }

    #[test]
    fn get_bot_and_call_paths() {
        let raw = json!({"uid": "abc123"});
        assert_eq!(get_bot(&Params::new("bot.get", &raw)).unwrap().path, "/v1/bots/abc123");
        assert_eq!(get_call(&Params::new("call.get", &raw)).unwrap().path, "/v1/call/abc123");
        assert!(get_bot(&Params::new("bot.get", &json!({}))).is_err());

        let hostile = json!({"uid": "x/../../whoami"});
        assert_eq!(
            get_call(&Params::new("call.get", &hostile)).unwrap().path,
            "/v1/call/x%2F..%2F..%2Fwhoami"
        );
    }

    #[test]
    fn list_bots_defaults_limit() {
        let raw = json!({"name": "Support", "created_after": ""});
        let request = list_bots(&Params::new("bot.get_all", &raw)).unwrap();
        assert_eq!(request.query_value("limit"), Some("20"));
        assert_eq!(request.query_value("name"), Some("Support"));
        assert_eq!(request.query_value("created_after"), None);
    }

    #[test]
    fn list_calls_maps_filters() {
        let raw = json!({
            "limit": 5,
            "bot_id": "bot_1",
            "call_status": "ended",
            "call_type": "webcall",
            "from_date": "2025-01-01T00:00:00Z"
        });
        let request = list_calls(&Params::new("call.get_all", &raw)).unwrap();
        assert_eq!(request.path, "/v1/calls");
        assert_eq!(request.query_value("limit"), Some("5"));
        assert_eq!(request.query_value("bot_id"), Some("bot_1"));
        assert_eq!(request.query_value("call_status"), Some("ended"));
        assert_eq!(request.query_value("call_type"), Some("webcall"));
        assert_eq!(request.query_value("from_date"), Some("2025-01-01T00:00:00Z"));
        assert_eq!(request.query_value("to_number"), None);
    }

    #[test]
    fn list_calls_rejects_unknown_status() {
        let raw = json!({"call_status": "finished"});
        assert!(list_calls(&Params::new("call.get_all", &raw)).is_err());
        let raw = json!({"limit": 0});
        assert!(list_calls(&Params::new("call.get_all", &raw)).is_err());
    }
}
