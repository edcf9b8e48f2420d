//! Configuration value types.
//!
//! The core treats configuration as already-validated input supplied by the
//! configuration boundary: one `RuntimeConfig` is constructed at startup and
//! passed by reference into the orchestrator builder and the adapter factory.
//! There is no global loader and no post-construction mutation.

use crate::state::ArtifactSlot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Backend type for a provider entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// OpenAI-compatible chat-completions server (OpenAI, LM Studio, vLLM...).
    #[serde(rename = "openai_compat")]
    OpenAiCompat,
    /// Google Gemini generateContent API.
    Gemini,
}

/// Configuration for one backend provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub backend: BackendKind,
    /// Model identifier sent to the backend.
    pub model: String,
    /// Base URL; required for OpenAI-compatible servers.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    4096
}

fn default_context_window() -> usize {
    8192
}

fn default_timeout_secs() -> u64 {
    120
}

/// Specialist category discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialistKind {
    Llm,
    Procedural,
    Wrapped,
}

/// Structured-output binding for an LLM-backed specialist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaBinding {
    /// Schema name reported to the backend.
    pub name: String,
    /// JSON Schema for the expected object.
    pub schema: serde_json::Value,
    /// Artifact slot the parsed object (or named field) is written to.
    pub slot: ArtifactSlot,
    /// Field extracted into the slot instead of the whole object, with
    /// HTML-entity repair applied (e.g. a "document" field).
    pub field: Option<String>,
}

/// Declares an artifact a specialist needs before it can run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputRequirement {
    pub slot: ArtifactSlot,
    /// Specialist recommended to the router when the slot is empty.
    pub recommend: String,
}

/// Bounded critique/rebuild loop parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementConfig {
    /// Number of build passes before the loop signals completion.
    pub cycles: u32,
    /// Specialist recommended between passes (the critic).
    pub critique_partner: String,
}

/// Deterministic action performed by a procedural specialist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProceduralAction {
    /// Persist the document artifact under the sandbox root.
    StoreDocument,
    /// Read a sandboxed file into the pending-text artifact.
    ReadFile,
    /// Assemble the run report from messages and artifacts.
    Archive,
}

/// Configuration for one specialist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialistConfig {
    pub name: String,
    /// One-line capability description shown to the router.
    #[serde(default)]
    pub description: String,
    pub kind: SpecialistKind,
    /// Provider identifier (LLM-backed specialists only).
    pub provider: Option<String>,
    /// Fixed role instruction bound into the adapter at construction.
    #[serde(default)]
    pub instruction: String,
    /// Structured-output binding; text mode when absent.
    pub schema: Option<SchemaBinding>,
    /// Required input artifact with a self-correction recommendation.
    pub requires: Option<InputRequirement>,
    /// Set `task_complete` after a successful turn.
    #[serde(default)]
    pub completes_task: bool,
    /// Bounded refinement loop this specialist drives.
    pub refinement: Option<RefinementConfig>,
    /// Procedural action (procedural specialists only).
    pub action: Option<ProceduralAction>,
    /// Sandbox root for procedural file I/O.
    pub sandbox_root: Option<PathBuf>,
    /// Output file name for `store_document`.
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Safety flag: file writes are dry-run unless explicitly enabled.
    #[serde(default)]
    pub allow_writes: bool,
}

fn default_file_name() -> String {
    "output.html".to_string()
}

impl SpecialistConfig {
    /// Minimal LLM-backed specialist config.
    pub fn llm(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind: SpecialistKind::Llm,
            provider: Some(provider.into()),
            instruction: String::new(),
            schema: None,
            requires: None,
            completes_task: false,
            refinement: None,
            action: None,
            sandbox_root: None,
            file_name: default_file_name(),
            allow_writes: false,
        }
    }

    /// Minimal procedural specialist config.
    pub fn procedural(name: impl Into<String>, action: ProceduralAction) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind: SpecialistKind::Procedural,
            provider: None,
            instruction: String::new(),
            schema: None,
            requires: None,
            completes_task: false,
            refinement: None,
            action: Some(action),
            sandbox_root: None,
            file_name: default_file_name(),
            allow_writes: false,
        }
    }
}

/// Orchestration-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Entry specialist (commonly the router).
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    /// Router name; the hub every non-terminal specialist returns to.
    #[serde(default = "default_router")]
    pub router: String,
    /// Fallback specialist when routing fails: produces a clarifying reply.
    #[serde(default = "default_clarifier")]
    pub default_specialist: String,
    /// Hard bound on specialist turns per run.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Static successors overriding the default return-to-router.
    /// The reserved value "END" terminates the run.
    #[serde(default)]
    pub edges: HashMap<String, String>,
}

fn default_entry_point() -> String {
    "router".to_string()
}

fn default_router() -> String {
    "router".to_string()
}

fn default_clarifier() -> String {
    "clarifier".to_string()
}

fn default_max_turns() -> u32 {
    25
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            entry_point: default_entry_point(),
            router: default_router(),
            default_specialist: default_clarifier(),
            max_turns: default_max_turns(),
            edges: HashMap::new(),
        }
    }
}

/// Complete, already-validated runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub specialists: Vec<SpecialistConfig>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workflow: WorkflowConfig::default(),
            providers: HashMap::new(),
            specialists: Vec::new(),
        }
    }
}
