//! Cadre: a multi-specialist orchestration core for LLM-backed workflows.
//!
//! A run threads one shared [`state::StateRecord`] through a small set of
//! specialists. A routing specialist decides each next step dynamically
//! (hub-and-spoke), specialists return partial [`state::StateUpdate`]s that
//! the [`orchestrator::Orchestrator`] merges between turns, and every backend
//! call goes through a [`provider::ProviderAdapter`] that hides call shapes,
//! retry, context pruning, and defensive parsing.
//!
//! The serving, CLI, configuration-loading, and archival-persistence layers
//! live outside this crate; they interact with the core only through
//! `RuntimeConfig` in and a terminal `StateRecord` out.

pub mod config;
pub mod orchestrator;
pub mod provider;
pub mod specialist;
pub mod state;

pub use config::{
    BackendKind, ProviderConfig, RuntimeConfig, SpecialistConfig, SpecialistKind, WorkflowConfig,
};
pub use orchestrator::{Edge, Orchestrator};
pub use provider::{
    AdapterFactory, InvokeMode, LlmRequest, LlmResponse, ProviderAdapter, ProviderError,
    RetryPolicy, SchemaSpec, ToolCallRequest, ToolSpec,
};
pub use specialist::{
    ArchiverSpecialist, ExternalAgent, FileReadSpecialist, FileStoreSpecialist, LlmSpecialist,
    OutputBinding, RefinementLoop, RouteOption, RouterSpecialist, Specialist, SpecialistRegistry,
    WrappedSpecialist,
};
pub use state::{
    ArtifactSlot, ArtifactValue, Artifacts, Message, Role, RunError, StateRecord, StateUpdate,
};
