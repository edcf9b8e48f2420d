//! Provider-agnostic request and response envelopes.
//!
//! Specialists describe what they want (messages plus an optional output
//! schema or tool set) and adapters translate that into each backend's call
//! shape. The response comes back as a tagged union with exactly one
//! populated variant.

use crate::state::Message;
use serde::{Deserialize, Serialize};

/// Declared output shape for schema-mode calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSpec {
    /// Schema name reported to the backend.
    pub name: String,
    /// JSON Schema for the expected object.
    pub schema: serde_json::Value,
}

impl SchemaSpec {
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// An invocable-tool descriptor for tool-mode calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub parameters: serde_json::Value,
}

impl ToolSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Invocation mode selected per request.
///
/// A request carrying both a schema and tools is legal; the schema wins and
/// the tool set is force-dropped, because backends that keep tool bindings
/// sticky across calls will otherwise ignore the schema instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeMode {
    Schema,
    Tools,
    Text,
}

/// Provider-agnostic request envelope.
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    /// Ordered conversation history (a copy - adapters may prune it).
    pub messages: Vec<Message>,
    /// Output schema for structured/JSON responses.
    pub schema: Option<SchemaSpec>,
    /// Invocable tools.
    pub tools: Vec<ToolSpec>,
}

impl LlmRequest {
    /// Text-mode request over the given history.
    pub fn text(messages: Vec<Message>) -> Self {
        Self {
            messages,
            schema: None,
            tools: Vec::new(),
        }
    }

    /// Schema-mode request.
    pub fn with_schema(messages: Vec<Message>, schema: SchemaSpec) -> Self {
        Self {
            messages,
            schema: Some(schema),
            tools: Vec::new(),
        }
    }

    /// Tool-mode request.
    pub fn with_tools(messages: Vec<Message>, tools: Vec<ToolSpec>) -> Self {
        Self {
            messages,
            schema: None,
            tools,
        }
    }

    /// Deterministic mode selection: schema > tools > text.
    pub fn mode(&self) -> InvokeMode {
        if self.schema.is_some() {
            InvokeMode::Schema
        } else if !self.tools.is_empty() {
            InvokeMode::Tools
        } else {
            InvokeMode::Text
        }
    }
}

/// One tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    /// Already-parsed arguments object.
    pub arguments: serde_json::Value,
    pub id: String,
}

/// Standardized response: exactly one variant is populated.
///
/// An adapter that cannot honor the requested mode downgrades to `Text` with
/// the raw content and lets the caller detect the mismatch - it never
/// fabricates a different shape. A forced-tool response with no call is
/// `ToolCalls(vec![])`, not `Text`.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmResponse {
    Text(String),
    Json(serde_json::Value),
    ToolCalls(Vec<ToolCallRequest>),
}

impl LlmResponse {
    /// The parsed object, when the structured mode was honored.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            LlmResponse::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The tool calls, when tool mode was honored (possibly empty).
    pub fn tool_calls(&self) -> Option<&[ToolCallRequest]> {
        match self {
            LlmResponse::ToolCalls(calls) => Some(calls),
            _ => None,
        }
    }

    /// Text content for any variant, for logging and degraded handling.
    pub fn text_lossy(&self) -> String {
        match self {
            LlmResponse::Text(text) => text.clone(),
            LlmResponse::Json(value) => value.to_string(),
            LlmResponse::ToolCalls(calls) => serde_json::to_string(calls).unwrap_or_default(),
        }
    }
}
