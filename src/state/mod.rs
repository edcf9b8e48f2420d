//! Shared state record threaded through every specialist turn.
//!
//! The orchestrator exclusively owns the canonical `StateRecord`. Specialists
//! receive a read-only reference and return a `StateUpdate` describing only
//! the slots they intend to change; the orchestrator merges updates between
//! turns. Message history is append-only - nothing in the merge path ever
//! truncates it.

mod message;

pub use message::{Message, Role};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed named artifact slots.
///
/// Each slot holds at most one value and is overwritten wholesale by whichever
/// specialist produces it - never merged field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifacts {
    /// Structured data output (parsed JSON produced in schema mode).
    pub structured: Option<serde_json::Value>,
    /// Document output (e.g. a rendered HTML page).
    pub document: Option<String>,
    /// Raw text pending processing (e.g. file contents read into context).
    pub pending_text: Option<String>,
    /// Human-readable run report assembled by the archiver.
    pub report: Option<String>,
}

/// Identifies one artifact slot for reads and overwrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSlot {
    Structured,
    Document,
    PendingText,
    Report,
}

impl ArtifactSlot {
    /// Slot name used in corrective messages and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactSlot::Structured => "structured",
            ArtifactSlot::Document => "document",
            ArtifactSlot::PendingText => "pending_text",
            ArtifactSlot::Report => "report",
        }
    }
}

impl std::fmt::Display for ArtifactSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A value destined for one artifact slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtifactValue {
    Text(String),
    Structured(serde_json::Value),
}

impl Artifacts {
    /// True when the slot currently holds a value.
    pub fn has(&self, slot: ArtifactSlot) -> bool {
        match slot {
            ArtifactSlot::Structured => self.structured.is_some(),
            ArtifactSlot::Document => self.document.is_some(),
            ArtifactSlot::PendingText => self.pending_text.is_some(),
            ArtifactSlot::Report => self.report.is_some(),
        }
    }

    /// Overwrite one slot wholesale.
    pub fn set(&mut self, slot: ArtifactSlot, value: ArtifactValue) {
        match (slot, value) {
            (ArtifactSlot::Structured, ArtifactValue::Structured(v)) => self.structured = Some(v),
            (ArtifactSlot::Structured, ArtifactValue::Text(t)) => {
                self.structured = Some(serde_json::Value::String(t))
            }
            (ArtifactSlot::Document, v) => self.document = Some(v.into_text()),
            (ArtifactSlot::PendingText, v) => self.pending_text = Some(v.into_text()),
            (ArtifactSlot::Report, v) => self.report = Some(v.into_text()),
        }
    }
}

impl ArtifactValue {
    fn into_text(self) -> String {
        match self {
            ArtifactValue::Text(t) => t,
            ArtifactValue::Structured(v) => v.to_string(),
        }
    }
}

/// Structured error payload carried in state.
///
/// Presence halts the run; the payload stays in the terminal state so the
/// archival boundary can render a diagnosable report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunError {
    /// Name of the specialist (or "orchestrator") that failed.
    pub specialist: String,
    /// Short machine-readable failure category.
    pub kind: String,
    /// Human-readable description.
    pub message: String,
}

impl RunError {
    pub fn new(
        specialist: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            specialist: specialist.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// The single shared data structure for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateRecord {
    /// Ordered, append-only conversation history.
    pub messages: Vec<Message>,
    /// Next specialist chosen by the router; cleared by the orchestrator once
    /// consumed.
    pub routing_target: Option<String>,
    /// Corrective recommendations left for the router; consumed by the router.
    pub recommended_specialists: Vec<String>,
    /// Fixed named artifact slots.
    pub artifacts: Artifacts,
    /// Structured error payload; presence halts the run.
    pub error: Option<RunError>,
    /// Set by a specialist to request a clean successful halt.
    pub task_complete: bool,
    /// Per-specialist counters for bounded refinement loops.
    pub iteration_counters: HashMap<String, u32>,
    /// Every routing decision in order, for diagnosability.
    pub routing_history: Vec<String>,
}

impl StateRecord {
    /// Seed a fresh record from the user's goal.
    pub fn from_goal(goal: impl Into<String>) -> Self {
        let mut goal_message = Message::user(goal);
        goal_message.name = Some("user".to_string());
        Self {
            messages: vec![goal_message],
            ..Default::default()
        }
    }

    /// Current counter value for a refinement loop, zero when unset.
    pub fn counter(&self, name: &str) -> u32 {
        self.iteration_counters.get(name).copied().unwrap_or(0)
    }

    /// Merge a specialist's partial update into the canonical record.
    ///
    /// `messages` is appended; every other populated field overwrites its
    /// slot. Fields absent from the update are left bit-identical.
    pub fn merge(&mut self, update: StateUpdate) {
        self.messages.extend(update.messages);
        if let Some(target) = update.routing_target {
            self.routing_target = Some(target);
        }
        if let Some(recs) = update.recommended_specialists {
            self.recommended_specialists = recs;
        }
        for (slot, value) in update.artifacts {
            self.artifacts.set(slot, value);
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        if let Some(done) = update.task_complete {
            self.task_complete = done;
        }
        for (name, count) in update.iteration_counters {
            self.iteration_counters.insert(name, count);
        }
        self.routing_history.extend(update.routing_history);
    }
}

/// A partial update returned by one specialist turn.
///
/// Contains only the keys the specialist intends to change. Built with the
/// `with_*` helpers so call sites read as a description of the delta.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub messages: Vec<Message>,
    pub routing_target: Option<String>,
    pub recommended_specialists: Option<Vec<String>>,
    pub artifacts: Vec<(ArtifactSlot, ArtifactValue)>,
    pub error: Option<RunError>,
    pub task_complete: Option<bool>,
    pub iteration_counters: Vec<(String, u32)>,
    pub routing_history: Vec<String>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message to the history.
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Set the routing target (router only).
    pub fn with_routing_target(mut self, target: impl Into<String>) -> Self {
        let target = target.into();
        self.routing_history.push(target.clone());
        self.routing_target = Some(target);
        self
    }

    /// Overwrite the recommendation list (an empty list consumes it).
    pub fn with_recommendations(mut self, recs: Vec<String>) -> Self {
        self.recommended_specialists = Some(recs);
        self
    }

    /// Overwrite one artifact slot.
    pub fn with_artifact(mut self, slot: ArtifactSlot, value: ArtifactValue) -> Self {
        self.artifacts.push((slot, value));
        self
    }

    /// Record a soft failure; the orchestrator halts after the merge.
    pub fn with_error(mut self, error: RunError) -> Self {
        self.error = Some(error);
        self
    }

    /// Request a clean successful halt.
    pub fn with_task_complete(mut self) -> Self {
        self.task_complete = Some(true);
        self
    }

    /// Overwrite one refinement-loop counter.
    pub fn with_counter(mut self, name: impl Into<String>, count: u32) -> Self {
        self.iteration_counters.push((name.into(), count));
        self
    }
}
