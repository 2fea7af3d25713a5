//! The normalized event emitted for each new call.

use crate::record::{CallRecord, CallStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// A new call, in the shape downstream workflow steps consume.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEvent {
    pub id: String,
    pub call_status: Option<CallStatus>,
    /// ISO-8601 with millisecond precision, UTC.
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub from: Option<JsonValue>,
    pub to: Option<JsonValue>,
    /// Seconds.
    pub duration: Option<f64>,
    pub bot_id: Option<JsonValue>,
    pub customer_id: Option<JsonValue>,
    pub call_type: Option<JsonValue>,
    pub direction: Option<JsonValue>,
    pub transcript: Option<JsonValue>,
    pub recording_url: Option<JsonValue>,
    pub latency: Option<JsonValue>,
    pub call_analysis: Option<JsonValue>,
    pub call_cost: Option<JsonValue>,
    pub dynamic_variables: Option<JsonValue>,
}

fn iso_millis(timestamp: Option<i64>) -> Option<String> {
    timestamp
        .filter(|ms| *ms != 0)
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl From<CallRecord> for CallEvent {
    fn from(record: CallRecord) -> Self {
        Self {
            started_at: iso_millis(record.start_timestamp),
            ended_at: iso_millis(record.end_timestamp),
            duration: record
                .duration_ms
                .as_ref()
                .and_then(JsonValue::as_f64)
                .filter(|ms| *ms != 0.0)
                .map(|ms| ms / 1000.0),
            id: record.call_id,
            call_status: record.call_status,
            from: record.from_number,
            to: record.to_number,
            bot_id: record.agent_id,
            customer_id: record.customer_id,
            call_type: record.call_type,
            direction: record.direction,
            transcript: record.transcript,
            recording_url: record.recording_url,
            latency: record.latency,
            call_analysis: record.call_analysis,
            call_cost: record.call_cost,
            dynamic_variables: record.dynamic_variables,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn normalizes_ended_call() {
        let record = CallRecord::deserialize(&json!({
            "call_id": "call_1",
            "call_status": "ended",
            "start_timestamp": 1_700_000_000_000_i64,
            "end_timestamp": 1_700_000_065_500_i64,
            "duration_ms": 65500,
            "from_number": "+14155550100",
            "to_number": "+14155550199",
            "agent_id": "bot_9",
            "call_analysis": {"summary": "ok"},
        }))
        .expect("record");

        let event = serde_json::to_value(CallEvent::from(record)).expect("serialize");
        assert_eq!(event["id"], "call_1");
        assert_eq!(event["callStatus"], "ended");
        assert_eq!(event["startedAt"], "2023-11-14T22:13:20.000Z");
        assert_eq!(event["endedAt"], "2023-11-14T22:14:25.500Z");
        assert_eq!(event["duration"], 65.5);
        assert_eq!(event["from"], "+14155550100");
        assert_eq!(event["botId"], "bot_9");
        assert_eq!(event["callAnalysis"], json!({"summary": "ok"}));
        assert!(event["transcript"].is_null());
    }

    #[test]
    fn absent_values_become_null() {
        let record = CallRecord::deserialize(&json!({
            "call_id": "call_2",
            "start_timestamp": 1_700_000_000_000_i64,
            "end_timestamp": 0,
        }))
        .expect("record");

        let event = CallEvent::from(record);
        assert!(event.ended_at.is_none());
        assert!(event.duration.is_none());
        assert!(event.call_status.is_none());
    }

    #[test]
    fn non_numeric_duration_becomes_null() {
        let record = CallRecord::deserialize(&json!({
            "call_id": "call_3",
            "end_timestamp": 1_700_000_000_000_i64,
            "duration_ms": "65000",
        }))
        .expect("record");

        let event = serde_json::to_value(CallEvent::from(record)).expect("serialize");
        assert!(event["duration"].is_null());
        assert_eq!(event["endedAt"], "2023-11-14T22:13:20.000Z");
    }
}
