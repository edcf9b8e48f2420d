//! Adapter for the Google Gemini generateContent API.
//!
//! Gemini has no system role and no persistent system message: the fixed
//! instruction plus any system-role turns are prepended to the first user
//! turn. Tool calls come back as structured `functionCall` parts; synthetic
//! ids are minted since Gemini does not assign any.

use crate::config::ProviderConfig;
use crate::provider::context::prune_history;
use crate::provider::error::ProviderError;
use crate::provider::http::{map_status_error, map_transport_error};
use crate::provider::parse::extract_json;
use crate::provider::retry::RetryPolicy;
use crate::provider::traits::ProviderAdapter;
use crate::provider::types::{InvokeMode, LlmRequest, LlmResponse, ToolCallRequest};
use crate::state::Role;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const ADAPTER_NAME: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Adapter bound to one Gemini model and role instruction.
pub struct GeminiAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    context_window: usize,
    timeout: Duration,
    instruction: String,
    retry: RetryPolicy,
}

impl GeminiAdapter {
    pub fn new(
        client: reqwest::Client,
        config: &ProviderConfig,
        instruction: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ProviderError::misconfiguration("gemini backend requires an api_key"))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            context_window: config.context_window,
            timeout: Duration::from_secs(config.timeout_secs),
            instruction: instruction.into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Build the generateContent payload.
    ///
    /// System content (the fixed instruction plus system-role turns) is folded
    /// into the first user turn; assistant turns map to the "model" role and
    /// everything else to "user".
    fn build_payload(&self, request: &LlmRequest) -> Value {
        let history = prune_history(
            request.messages.clone(),
            &self.instruction,
            self.context_window,
            self.max_output_tokens as usize,
        );

        let mut system_parts: Vec<String> = Vec::new();
        if !self.instruction.is_empty() {
            system_parts.push(self.instruction.clone());
        }

        let mut contents: Vec<Value> = Vec::new();
        for message in &history {
            match message.role {
                Role::System => {
                    system_parts.push(message.content.clone());
                }
                Role::Assistant => {
                    contents.push(json!({
                        "role": "model",
                        "parts": [{"text": message.content}],
                    }));
                }
                Role::User | Role::Tool => {
                    contents.push(json!({
                        "role": "user",
                        "parts": [{"text": message.content}],
                    }));
                }
            }
        }

        if !system_parts.is_empty() {
            let preamble = system_parts.join("\n\n");
            match contents
                .iter_mut()
                .find(|entry| entry["role"] == "user")
            {
                Some(first_user) => {
                    let existing = first_user["parts"][0]["text"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string();
                    first_user["parts"][0]["text"] = json!(format!("{preamble}\n\n{existing}"));
                }
                None => {
                    contents.insert(0, json!({"role": "user", "parts": [{"text": preamble}]}));
                }
            }
        }

        let mut generation_config = json!({
            "temperature": self.temperature,
            "maxOutputTokens": self.max_output_tokens,
        });

        let mut payload = json!({"contents": contents});

        match request.mode() {
            InvokeMode::Schema => {
                let schema = request.schema.as_ref().expect("schema mode implies schema");
                generation_config["responseMimeType"] = json!("application/json");
                generation_config["responseSchema"] = schema.schema.clone();
                // The tool set is force-dropped in schema mode.
            }
            InvokeMode::Tools => {
                let declarations: Vec<Value> = request
                    .tools
                    .iter()
                    .map(|tool| {
                        json!({
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        })
                    })
                    .collect();
                payload["tools"] = json!([{"functionDeclarations": declarations}]);
                payload["toolConfig"] = if request.tools.len() == 1 {
                    json!({
                        "functionCallingConfig": {
                            "mode": "ANY",
                            "allowedFunctionNames": [request.tools[0].name],
                        }
                    })
                } else {
                    json!({"functionCallingConfig": {"mode": "AUTO"}})
                };
            }
            InvokeMode::Text => {}
        }

        payload["generationConfig"] = generation_config;
        payload
    }

    async fn send(&self, url: &str, payload: &Value) -> Result<Value, ProviderError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?;

        if !status.is_success() {
            return Err(map_status_error(ADAPTER_NAME, status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::transport(format!("unparseable response body: {e}")))
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for GeminiAdapter {
    async fn invoke(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
        let mode = request.mode();
        debug!(
            backend = ADAPTER_NAME,
            model = %self.model,
            ?mode,
            messages = request.messages.len(),
            "invoking backend"
        );

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let payload = self.build_payload(request);
        let forced_tool = mode == InvokeMode::Tools && request.tools.len() == 1;

        let body = self
            .retry
            .run(ADAPTER_NAME, || self.send(&url, &payload))
            .await?;

        parse_generate_content(&body, mode, forced_tool)
    }

    fn adapter_name(&self) -> &str {
        ADAPTER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Convert a generateContent response body into the standardized union.
fn parse_generate_content(
    body: &Value,
    mode: InvokeMode,
    forced_tool: bool,
) -> Result<LlmResponse, ProviderError> {
    if let Some(reason) = body
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(Value::as_str)
    {
        return Err(ProviderError::safety_blocked(format!(
            "prompt blocked: {reason}"
        )));
    }

    let candidate = body
        .get("candidates")
        .and_then(|c| c.get(0))
        .ok_or_else(|| ProviderError::transport("response carried no candidates"))?;

    if candidate.get("finishReason").and_then(Value::as_str) == Some("SAFETY") {
        return Err(ProviderError::safety_blocked(
            "candidate suppressed by safety filter",
        ));
    }

    let parts = candidate["content"]["parts"]
        .as_array()
        .cloned()
        .unwrap_or_default();

    let calls: Vec<ToolCallRequest> = parts
        .iter()
        .filter_map(|part| {
            let call = part.get("functionCall")?;
            let name = call.get("name")?.as_str()?.to_string();
            let arguments = call.get("args").cloned().unwrap_or_else(|| json!({}));
            // Gemini assigns no call ids; mint a deterministic one.
            let id = format!("call_{name}");
            Some(ToolCallRequest {
                name,
                arguments,
                id,
            })
        })
        .collect();

    if !calls.is_empty() {
        return Ok(LlmResponse::ToolCalls(calls));
    }

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("");

    match mode {
        InvokeMode::Tools if forced_tool => {
            warn!(
                backend = ADAPTER_NAME,
                "forced tool call was not honored by the backend"
            );
            Ok(LlmResponse::ToolCalls(Vec::new()))
        }
        InvokeMode::Schema => match extract_json(&text) {
            Some(value) => Ok(LlmResponse::Json(value)),
            None => {
                warn!(
                    backend = ADAPTER_NAME,
                    "schema mode produced unparseable content, downgrading to text"
                );
                Ok(LlmResponse::Text(text))
            }
        },
        _ => Ok(LlmResponse::Text(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;
    use crate::provider::http::build_client;
    use crate::provider::types::{SchemaSpec, ToolSpec};
    use crate::state::Message;

    fn config() -> ProviderConfig {
        ProviderConfig {
            backend: BackendKind::Gemini,
            model: "gemini-2.0-flash".to_string(),
            base_url: None,
            api_key: Some("test-key".to_string()),
            temperature: 0.4,
            max_output_tokens: 1024,
            context_window: 32_768,
            timeout_secs: 60,
        }
    }

    fn adapter(instruction: &str) -> GeminiAdapter {
        GeminiAdapter::new(build_client().unwrap(), &config(), instruction).unwrap()
    }

    #[test]
    fn test_missing_api_key_is_misconfiguration() {
        let mut config = config();
        config.api_key = None;
        let result = GeminiAdapter::new(build_client().unwrap(), &config, "");
        assert!(matches!(result, Err(ProviderError::Misconfiguration(_))));
    }

    #[test]
    fn test_system_content_prepended_to_first_user_turn() {
        let adapter = adapter("You are the critic.");
        let request = LlmRequest::text(vec![
            Message::assistant("web_builder", "earlier draft"),
            Message::user("review this"),
        ]);

        let payload = adapter.build_payload(&request);
        let contents = payload["contents"].as_array().unwrap();

        assert_eq!(contents[0]["role"], "model");
        assert_eq!(contents[1]["role"], "user");
        let text = contents[1]["parts"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("You are the critic."));
        assert!(text.ends_with("review this"));
    }

    #[test]
    fn test_instruction_without_user_turn_becomes_leading_user_turn() {
        let adapter = adapter("Summarize.");
        let request = LlmRequest::text(vec![Message::assistant("web_builder", "only a model turn")]);
        let payload = adapter.build_payload(&request);
        let contents = payload["contents"].as_array().unwrap();
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "Summarize.");
    }

    #[test]
    fn test_schema_mode_sets_json_mime_type() {
        let adapter = adapter("");
        let request = LlmRequest::with_schema(
            vec![Message::user("plan")],
            SchemaSpec::new("Plan", json!({"type": "object"})),
        );
        let payload = adapter.build_payload(&request);
        assert_eq!(
            payload["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert!(payload.get("tools").is_none());
    }

    #[test]
    fn test_single_tool_forces_any_mode_with_allowed_names() {
        let adapter = adapter("");
        let request = LlmRequest::with_tools(
            vec![Message::user("route")],
            vec![ToolSpec::new("route", "pick", json!({"type": "object"}))],
        );
        let payload = adapter.build_payload(&request);
        let config = &payload["toolConfig"]["functionCallingConfig"];
        assert_eq!(config["mode"], "ANY");
        assert_eq!(config["allowedFunctionNames"][0], "route");
    }

    #[test]
    fn test_parse_function_call_mints_id() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "functionCall": {
                            "name": "route",
                            "args": {"next": "archiver"}
                        }
                    }]
                },
                "finishReason": "STOP"
            }]
        });
        let response = parse_generate_content(&body, InvokeMode::Tools, true).unwrap();
        let calls = response.tool_calls().unwrap();
        assert_eq!(calls[0].id, "call_route");
        assert_eq!(calls[0].arguments["next"], "archiver");
    }

    #[test]
    fn test_prompt_block_reason_is_safety_blocked() {
        let body = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let result = parse_generate_content(&body, InvokeMode::Text, false);
        assert!(matches!(result, Err(ProviderError::SafetyBlocked(_))));
    }

    #[test]
    fn test_safety_finish_reason_is_safety_blocked() {
        let body = json!({
            "candidates": [{"finishReason": "SAFETY", "content": {"parts": []}}]
        });
        let result = parse_generate_content(&body, InvokeMode::Text, false);
        assert!(matches!(result, Err(ProviderError::SafetyBlocked(_))));
    }

    #[test]
    fn test_multiple_text_parts_are_joined() {
        let body = json!({
            "candidates": [{
                "content": {"parts": [{"text": "hello "}, {"text": "world"}]},
                "finishReason": "STOP"
            }]
        });
        let response = parse_generate_content(&body, InvokeMode::Text, false).unwrap();
        assert_eq!(response, LlmResponse::Text("hello world".to_string()));
    }
}
