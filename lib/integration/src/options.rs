//! Dynamic option lists for pickers (bot and call selectors).

use crate::error::FetchError;
use crate::fetcher::{ApiFetcher, ApiRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// How many entries an option list requests.
const OPTION_PAGE_SIZE: u32 = 100;

/// One selectable entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    /// Label shown to the user.
    pub name: String,
    /// Value submitted when selected.
    pub value: String,
    /// Secondary text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn list_field<'a>(response: &'a JsonValue, field: &str) -> &'a [JsonValue] {
    response
        .get(field)
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn text(value: &JsonValue, key: &str) -> String {
    match value.get(key) {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Bots as `{name, value: uid}` entries.
///
/// # Errors
///
/// Returns an error if the listing request fails. A response without a
/// `bots` list yields no entries.
pub async fn load_bot_options<F: ApiFetcher + ?Sized>(
    fetcher: &F,
) -> openmic_core::Result<Vec<OptionEntry>, FetchError> {
    let response = fetcher
        .fetch(ApiRequest::get("/v1/bots").with_query("limit", OPTION_PAGE_SIZE))
        .await?;

    Ok(list_field(&response, "bots")
        .iter()
        .map(|bot| {
            let name = text(bot, "name");
            OptionEntry {
                description: Some(format!("Agent: {name}")),
                value: text(bot, "uid"),
                name,
            }
        })
        .collect())
}

/// Calls as `{name: "<id> (<status>)", value: call_id}` entries.
///
/// # Errors
///
/// Returns an error if the listing request fails. A response without a
/// `calls` list yields no entries.
pub async fn load_call_options<F: ApiFetcher + ?Sized>(
    fetcher: &F,
) -> openmic_core::Result<Vec<OptionEntry>, FetchError> {
    let response = fetcher
        .fetch(ApiRequest::get("/v1/calls").with_query("limit", OPTION_PAGE_SIZE))
        .await?;

    Ok(list_field(&response, "calls")
        .iter()
        .map(|call| {
            let id = text(call, "call_id");
            OptionEntry {
                name: format!("{id} ({})", text(call, "call_status")),
                description: Some(format!(
                    "{} → {}",
                    text(call, "from_number"),
                    text(call, "to_number")
                )),
                value: id,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rootcause::Report;
    use serde_json::json;
    use std::sync::Mutex;

    struct CannedFetcher {
        response: JsonValue,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl CannedFetcher {
        fn new(response: JsonValue) -> Self {
            Self {
                response,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ApiFetcher for CannedFetcher {
        async fn fetch(&self, request: ApiRequest) -> Result<JsonValue, Report<FetchError>> {
            self.requests.lock().unwrap().push(request);
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn maps_bots() {
        let fetcher = CannedFetcher::new(json!({
            "bots": [{"uid": "b1", "name": "Receptionist"}, {"uid": "b2", "name": "Sales"}]
        }));

        let options = load_bot_options(&fetcher).await.unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].name, "Receptionist");
        assert_eq!(options[0].value, "b1");
        assert_eq!(options[0].description.as_deref(), Some("Agent: Receptionist"));

        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(requests[0].path, "/v1/bots");
        assert_eq!(requests[0].query_value("limit"), Some("100"));
    }

    #[tokio::test]
    async fn maps_calls() {
        let fetcher = CannedFetcher::new(json!({
            "calls": [{
                "call_id": "c1",
                "call_status": "ended",
                "from_number": "+14155550100",
                "to_number": "+14155550199"
            }]
        }));

        let options = load_call_options(&fetcher).await.unwrap();
        assert_eq!(options[0].name, "c1 (ended)");
        assert_eq!(options[0].value, "c1");
        assert_eq!(
            options[0].description.as_deref(),
            Some("+14155550100 → +14155550199")
        );
    }

    #[tokio::test]
    async fn missing_list_yields_nothing() {
        let fetcher = CannedFetcher::new(json!({"bots": "nope"}));
        assert!(load_bot_options(&fetcher).await.unwrap().is_empty());
        let fetcher = CannedFetcher::new(JsonValue::Null);
        assert!(load_call_options(&fetcher).await.unwrap().is_empty());
    }
}
