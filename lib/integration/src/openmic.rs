//! The OpenMic connector: operation catalogue plus dispatch.

use crate::connector::{
    Connector, ConnectorCapability, ConnectorInfo, Operation, OperationInfo, OperationMetadata,
    OperationResult,
};
use crate::credential::CREDENTIAL_TEST_PATH;
use crate::error::{ConnectorError, FetchError};
use crate::fetcher::{ApiFetcher, ApiRequest};
use crate::params::Params;
use crate::resources::{CALL_STATUSES, CALL_TYPES};
use crate::{phone_number, resources};
use async_trait::async_trait;
use rootcause::Report;
use serde_json::{Value as JsonValue, json};
use std::time::Instant;
use tracing::{debug, instrument};

/// Connector identifier.
pub const CONNECTOR_ID: &str = "openmic";

type RequestBuilder = fn(&Params<'_>) -> Result<ApiRequest, ConnectorError>;

/// Maps an operation name to its request builder.
fn request_builder(name: &str) -> Option<RequestBuilder> {
    let builder: RequestBuilder = match name {
        "phone_call.create" => resources::create_phone_call,
        "bot.get" => resources::get_bot,
        "bot.get_all" => resources::list_bots,
        "call.get" => resources::get_call,
        "call.get_all" => resources::list_calls,
        "phone_number.create" => phone_number::create,
        "phone_number.get" => phone_number::get,
        "phone_number.get_all" => phone_number::list,
        "phone_number.update" => phone_number::update,
        "phone_number.delete" => phone_number::delete,
        _ => return None,
    };
    Some(builder)
}

fn string_field(description: &str) -> JsonValue {
    json!({"type": "string", "description": description})
}

fn e164_field(description: &str) -> JsonValue {
    json!({"type": "string", "pattern": "^\\+[1-9][0-9]{1,14}$", "description": description})
}

fn limit_field(default: u64) -> JsonValue {
    json!({"type": "integer", "minimum": 1, "default": default, "description": "Max number of results to return"})
}

fn object_schema(properties: JsonValue, required: &[&str]) -> JsonValue {
    json!({"type": "object", "properties": properties, "required": required})
}

fn assignment_properties() -> JsonValue {
    json!({
        "inbound_agent_id": string_field("Agent ID to handle inbound calls"),
        "outbound_agent_id": string_field("Agent ID to handle outbound calls"),
        "nickname": string_field("Nickname for the phone number"),
    })
}

fn operation(name: &str, action: &str, input_schema: JsonValue) -> OperationInfo {
    let resource = name.split_once('.').map_or(name, |(resource, _)| resource);
    OperationInfo {
        name: name.to_string(),
        resource: resource.to_string(),
        action: action.to_string(),
        input_schema,
    }
}

fn catalogue() -> Vec<OperationInfo> {
    vec![
        operation(
            "phone_call.create",
            "Create a phone call",
            object_schema(
                json!({
                    "from_number": e164_field("Number the call is placed from"),
                    "to_number": e164_field("Number to call"),
                    "additional_fields": object_schema(json!({
                        "override_agent_id": string_field("Agent to use instead of the number's default"),
                        "customer_id": string_field("Customer identifier for usage tracking"),
                        "dynamic_variables": {"type": "object", "description": "Variables injected into the agent prompt"},
                        "callback_url": string_field("Post-call webhook URL"),
                    }), &[]),
                }),
                &["from_number", "to_number"],
            ),
        ),
        operation(
            "bot.get",
            "Find a bot by ID",
            object_schema(json!({"uid": string_field("The agent's UID")}), &["uid"]),
        ),
        operation(
            "bot.get_all",
            "Get many bots",
            object_schema(
                json!({
                    "limit": limit_field(resources::DEFAULT_LIST_LIMIT),
                    "name": string_field("Filter bots by name"),
                    "created_after": {"type": "string", "format": "date-time"},
                    "created_before": {"type": "string", "format": "date-time"},
                }),
                &[],
            ),
        ),
        operation(
            "call.get",
            "Find a call by ID",
            object_schema(json!({"uid": string_field("The call UID")}), &["uid"]),
        ),
        operation(
            "call.get_all",
            "Get many calls",
            object_schema(
                json!({
                    "limit": limit_field(resources::DEFAULT_LIST_LIMIT),
                    "customer_id": string_field("Filter by customer ID"),
                    "from_number": e164_field("Filter by caller number"),
                    "to_number": e164_field("Filter by called number"),
                    "bot_id": string_field("Filter by bot ID"),
                    "from_date": {"type": "string", "format": "date-time"},
                    "to_date": {"type": "string", "format": "date-time"},
                    "call_status": {"type": "string", "enum": CALL_STATUSES},
                    "call_type": {"type": "string", "enum": CALL_TYPES},
                }),
                &[],
            ),
        ),
        operation(
            "phone_number.create",
            "Create a phone number",
            object_schema(
                json!({
                    "area_code": {"type": "integer", "minimum": 100, "maximum": 999},
                    "additional_fields": object_schema(assignment_properties(), &[]),
                }),
                &["area_code"],
            ),
        ),
        operation(
            "phone_number.get",
            "Get a phone number",
            object_schema(json!({"phone_number": e164_field("The phone number")}), &["phone_number"]),
        ),
        operation(
            "phone_number.get_all",
            "Get many phone numbers",
            object_schema(
                json!({
                    "limit": limit_field(50),
                    "filters": object_schema(json!({
                        "area_code": {"type": "integer", "minimum": 100, "maximum": 999},
                        "inbound_agent_id": string_field("Filter by inbound agent"),
                        "outbound_agent_id": string_field("Filter by outbound agent"),
                    }), &[]),
                }),
                &[],
            ),
        ),
        operation(
            "phone_number.update",
            "Update a phone number",
            object_schema(
                json!({
                    "phone_number": e164_field("The phone number"),
                    "update_fields": object_schema(assignment_properties(), &[]),
                }),
                &["phone_number", "update_fields"],
            ),
        ),
        operation(
            "phone_number.delete",
            "Delete a phone number",
            object_schema(json!({"phone_number": e164_field("The phone number")}), &["phone_number"]),
        ),
    ]
}

fn is_auth_failure(error: &FetchError) -> bool {
    matches!(error.status(), Some(401 | 403))
}

/// Connector for the OpenMic voice-agent platform.
#[derive(Debug, Clone)]
pub struct OpenMicConnector<F> {
    fetcher: F,
    base_url: String,
}

impl<F: ApiFetcher> OpenMicConnector<F> {
    /// Creates a connector over the given fetcher.
    #[must_use]
    pub fn new(fetcher: F, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    /// Returns the underlying fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }
}

#[async_trait]
impl<F: ApiFetcher> Connector for OpenMicConnector<F> {
    fn info(&self) -> ConnectorInfo {
        ConnectorInfo {
            id: CONNECTOR_ID.to_string(),
            name: "OpenMic AI".to_string(),
            description: "Voice agents, phone calls, call records and phone numbers".to_string(),
            base_url: self.base_url.clone(),
            operations: catalogue(),
            capabilities: vec![
                ConnectorCapability::Read,
                ConnectorCapability::Write,
                ConnectorCapability::Update,
                ConnectorCapability::Delete,
                ConnectorCapability::Poll,
                ConnectorCapability::ApiKey,
            ],
        }
    }

    #[instrument(level = "info", skip(self, operation), fields(operation = %operation.name))]
    async fn execute(&self, operation: Operation) -> Result<OperationResult, Report<ConnectorError>> {
        let build = request_builder(&operation.name).ok_or_else(|| {
            ConnectorError::OperationNotSupported {
                operation: operation.name.clone(),
            }
        })?;
        let request = build(&Params::new(&operation.name, &operation.parameters))?;

        let started = Instant::now();
        let data = self.fetcher.fetch(request).await.map_err(|report| {
            let context = if is_auth_failure(report.current_context()) {
                ConnectorError::AuthenticationFailed {
                    status: report.current_context().status().unwrap_or_default(),
                }
            } else {
                ConnectorError::RequestFailed {
                    operation: operation.name.clone(),
                }
            };
            report.context(context)
        })?;

        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(latency_ms, "operation completed");

        Ok(OperationResult {
            data,
            metadata: OperationMetadata {
                latency_ms,
                api_calls: 1,
            },
        })
    }

    #[instrument(level = "debug", skip(self))]
    async fn health_check(&self) -> Result<bool, Report<ConnectorError>> {
        match self.fetcher.fetch(ApiRequest::get(CREDENTIAL_TEST_PATH)).await {
            Ok(_) => Ok(true),
            Err(report) if is_auth_failure(report.current_context()) => Ok(false),
            Err(report) => Err(report.context(ConnectorError::RequestFailed {
                operation: "credential.test".to_string(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::Method;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted responses and records every request.
    struct ScriptedFetcher {
        responses: Mutex<VecDeque<Result<JsonValue, FetchError>>>,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Result<JsonValue, FetchError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ApiFetcher for ScriptedFetcher {
        async fn fetch(&self, request: ApiRequest) -> Result<JsonValue, Report<FetchError>> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request")
                .map_err(Report::from)
        }
    }

    fn connector(responses: Vec<Result<JsonValue, FetchError>>) -> OpenMicConnector<ScriptedFetcher> {
        OpenMicConnector::new(ScriptedFetcher::new(responses), "https://api.openmic.ai")
    }

    #[test]
    fn catalogue_covers_every_dispatchable_operation() {
        let info = connector(vec![]).info();
        assert_eq!(info.id, "openmic");
        assert_eq!(info.operations.len(), 10);
        for op in &info.operations {
            assert!(request_builder(&op.name).is_some(), "{} has no builder", op.name);
        }
        let create = info.operation("phone_call.create").expect("present");
        assert_eq!(create.resource, "phone_call");
        assert_eq!(create.input_schema["required"], json!(["from_number", "to_number"]));
    }

    #[test]
    fn declares_poll_capability() {
        let c = connector(vec![]);
        assert!(c.supports(ConnectorCapability::Poll));
        assert!(c.supports(ConnectorCapability::ApiKey));
    }

    #[tokio::test]
    async fn executes_get_bot() {
        let c = connector(vec![Ok(json!({"uid": "b1", "name": "Receptionist"}))]);
        let result = c
            .execute(Operation::new("bot.get").with_param("uid", json!("b1")))
            .await
            .expect("execute");

        assert_eq!(result.data["name"], "Receptionist");
        assert_eq!(result.metadata.api_calls, 1);
        let requests = c.fetcher().requests();
        assert_eq!(requests[0].method, Method::Get);
        assert_eq!(requests[0].path, "/v1/bots/b1");
    }

    #[tokio::test]
    async fn unknown_operation_is_rejected() {
        let c = connector(vec![]);
        let report = c
            .execute(Operation::new("bot.delete"))
            .await
            .expect_err("should fail");
        assert!(matches!(
            report.current_context(),
            ConnectorError::OperationNotSupported { .. }
        ));
        assert!(c.fetcher().requests().is_empty());
    }

    #[tokio::test]
    async fn invalid_parameters_never_reach_the_api() {
        let c = connector(vec![]);
        let report = c
            .execute(
                Operation::new("phone_call.create")
                    .with_param("from_number", json!("12345"))
                    .with_param("to_number", json!("+14155550199")),
            )
            .await
            .expect_err("should fail");
        assert!(matches!(
            report.current_context(),
            ConnectorError::InvalidParameters { .. }
        ));
        assert!(c.fetcher().requests().is_empty());
    }

    #[tokio::test]
    async fn api_failures_are_wrapped() {
        let c = connector(vec![
            Err(FetchError::Status {
                status: 401,
                body: "unauthorized".to_string(),
            }),
            Err(FetchError::Status {
                status: 500,
                body: String::new(),
            }),
        ]);

        let auth = c
            .execute(Operation::new("call.get").with_param("uid", json!("c1")))
            .await
            .expect_err("auth failure");
        assert_eq!(
            auth.current_context(),
            &ConnectorError::AuthenticationFailed { status: 401 }
        );

        let server = c
            .execute(Operation::new("call.get").with_param("uid", json!("c1")))
            .await
            .expect_err("server failure");
        assert_eq!(
            server.current_context(),
            &ConnectorError::RequestFailed {
                operation: "call.get".to_string()
            }
        );
    }

    #[tokio::test]
    async fn health_check_uses_whoami() {
        let c = connector(vec![
            Ok(json!({"id": "acct"})),
            Err(FetchError::Status {
                status: 403,
                body: String::new(),
            }),
            Err(FetchError::Connection {
                reason: "reset".to_string(),
            }),
        ]);

        assert!(c.health_check().await.expect("ok"));
        assert!(!c.health_check().await.expect("rejected key"));
        assert!(c.health_check().await.is_err());
        assert!(c.fetcher().requests().iter().all(|r| r.path == "/v1/whoami"));
    }
}
