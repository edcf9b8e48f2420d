//! Adapter for OpenAI-compatible chat-completions backends.
//!
//! Covers OpenAI itself plus local servers that speak the same API (LM
//! Studio, vLLM, llama.cpp server). Schema mode uses strict
//! `response_format` with the tool set force-dropped; tool mode forces the
//! call with `tool_choice: "required"` when exactly one tool is supplied.

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

const ADAPTER_NAME: &str = "openai-compat";

/// Adapter bound to one backend endpoint, model, and role instruction.
pub struct OpenAiCompatAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    context_window: usize,
    timeout: Duration,
    instruction: String,
    retry: RetryPolicy,
}

impl OpenAiCompatAdapter {
    /// Construct an adapter from provider config plus the specialist's fixed
    /// role instruction.
    pub fn new(
        client: reqwest::Client,
        config: &ProviderConfig,
        instruction: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let base_url = config.base_url.clone().ok_or_else(|| {
            ProviderError::misconfiguration("openai-compatible backend requires a base_url")
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            context_window: config.context_window,
            timeout: Duration::from_secs(config.timeout_secs),
            instruction: instruction.into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Build the chat-completions payload for one request.
    ///
    /// The fixed instruction and any system-role turns in the history are
    /// merged into a single leading system message; some local servers only
    /// honor the first one.
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

        let mut messages: Vec<Value> = Vec::new();
        for message in &history {
            if message.role == Role::System {
                system_parts.push(message.content.clone());
                continue;
            }
            let mut entry = json!({
                "role": message.role.as_str(),
                "content": message.content,
            });
            if message.role == Role::Tool {
                if let Some(id) = &message.tool_call_id {
                    entry["tool_call_id"] = json!(id);
                }
            }
            messages.push(entry);
        }
        if !system_parts.is_empty() {
            messages.insert(0, json!({"role": "system", "content": system_parts.join("\n\n")}));
        }

        let mut payload = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_output_tokens,
        });

        match request.mode() {
            InvokeMode::Schema => {
                let schema = request.schema.as_ref().expect("schema mode implies schema");
                payload["response_format"] = json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": schema.name,
                        "schema": schema.schema,
                        "strict": true,
                    }
                });
                // The tool set is force-dropped in schema mode.
            }
            InvokeMode::Tools => {
                let tools: Vec<Value> = request
                    .tools
                    .iter()
                    .map(|tool| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": tool.name,
                                "description": tool.description,
                                "parameters": tool.parameters,
                            }
                        })
                    })
                    .collect();
                payload["tools"] = json!(tools);
                payload["tool_choice"] = if request.tools.len() == 1 {
                    json!("required")
                } else {
                    json!("auto")
                };
            }
            InvokeMode::Text => {}
        }

        payload
    }

    async fn send(&self, url: &str, payload: &Value) -> Result<Value, ProviderError> {
        let mut builder = self.client.post(url).json(payload).timeout(self.timeout);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
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
impl ProviderAdapter for OpenAiCompatAdapter {
    async fn invoke(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
        let mode = request.mode();
        debug!(
            backend = ADAPTER_NAME,
            model = %self.model,
            ?mode,
            messages = request.messages.len(),
            "invoking backend"
        );

        let url = format!("{}/chat/completions", self.base_url);
        let payload = self.build_payload(request);
        let forced_tool = mode == InvokeMode::Tools && request.tools.len() == 1;

        let body = self
            .retry
            .run(ADAPTER_NAME, || self.send(&url, &payload))
            .await?;

        parse_completion(&body, mode, forced_tool)
    }

    fn adapter_name(&self) -> &str {
        ADAPTER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Convert a chat-completions response body into the standardized union.
fn parse_completion(
    body: &Value,
    mode: InvokeMode,
    forced_tool: bool,
) -> Result<LlmResponse, ProviderError> {
    let message = body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| ProviderError::transport("response carried no choices"))?;

    let finish_reason = body["choices"][0]["finish_reason"].as_str().unwrap_or("");
    if finish_reason == "content_filter" {
        return Err(ProviderError::safety_blocked(
            "backend content filter suppressed the completion",
        ));
    }

    // Some servers emit an empty tool_calls array alongside ordinary
    // content; only a non-empty array is a tool-call response.
    if let Some(calls) = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .filter(|calls| !calls.is_empty())
    {
        let parsed: Vec<ToolCallRequest> = calls
            .iter()
            .filter_map(|call| {
                let function = call.get("function")?;
                let name = function.get("name")?.as_str()?.to_string();
                let arguments = function
                    .get("arguments")
                    .and_then(Value::as_str)
                    .and_then(|raw| extract_json(raw))
                    .unwrap_or_else(|| json!({}));
                let id = call
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Some(ToolCallRequest {
                    name,
                    arguments,
                    id,
                })
            })
            .collect();
        return Ok(LlmResponse::ToolCalls(parsed));
    }

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match mode {
        InvokeMode::Tools if forced_tool => {
            // The backend declined a forced call; surface that as an empty
            // call list so the caller can apply its own fallback.
            warn!(
                backend = ADAPTER_NAME,
                "forced tool call was not honored by the backend"
            );
            Ok(LlmResponse::ToolCalls(Vec::new()))
        }
        InvokeMode::Schema => match extract_json(&content) {
            Some(value) => Ok(LlmResponse::Json(value)),
            None => {
                warn!(
                    backend = ADAPTER_NAME,
                    "schema mode produced unparseable content, downgrading to text"
                );
                Ok(LlmResponse::Text(content))
            }
        },
        _ => Ok(LlmResponse::Text(content)),
    }
}
