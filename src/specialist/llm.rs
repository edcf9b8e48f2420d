//! LLM-backed specialist.
//!
//! Delegates to a bound provider adapter with a fixed role instruction. The
//! output binding decides whether the turn is a schema-mode call whose parsed
//! object lands in an artifact slot, or a plain text turn appended to the
//! history. An unparseable structured response fails the turn gracefully (a
//! message only), leaving the router to decide what happens next.

use crate::config::SpecialistConfig;
use crate::provider::parse::unescape_field;
use crate::provider::{LlmRequest, LlmResponse, ProviderAdapter, SchemaSpec};
use crate::specialist::helpers::{missing_artifact_update, provider_failure_update};
use crate::specialist::Specialist;
use crate::state::{ArtifactSlot, ArtifactValue, Message, StateRecord, StateUpdate};
use std::sync::Arc;
use tracing::{debug, warn};

/// How a specialist's output is captured.
pub enum OutputBinding {
    /// Schema-mode call; the parsed object (or one named field of it) is
    /// written to an artifact slot.
    Schema {
        spec: SchemaSpec,
        slot: ArtifactSlot,
        /// Extract this field into the slot instead of the whole object,
        /// repairing HTML-escaped entities first.
        field: Option<String>,
    },
    /// Plain text turn, history only.
    Text,
}

/// Bounded critique-and-rebuild loop this specialist drives.
pub struct RefinementLoop {
    /// Build passes before the loop signals completion.
    pub cycles: u32,
    /// Specialist recommended between passes.
    pub critique_partner: String,
}

pub struct LlmSpecialist {
    name: String,
    adapter: Arc<dyn ProviderAdapter>,
    output: OutputBinding,
    /// Input artifact required before this specialist can run, with the
    /// producer to recommend when it is missing.
    requires: Option<(ArtifactSlot, String)>,
    completes_task: bool,
    refinement: Option<RefinementLoop>,
}

impl LlmSpecialist {
    pub fn new(
        name: impl Into<String>,
        adapter: Arc<dyn ProviderAdapter>,
        output: OutputBinding,
    ) -> Self {
        Self {
            name: name.into(),
            adapter,
            output,
            requires: None,
            completes_task: false,
            refinement: None,
        }
    }

    /// Build from config plus an already-constructed adapter.
    pub fn from_config(config: &SpecialistConfig, adapter: Arc<dyn ProviderAdapter>) -> Self {
        let output = match &config.schema {
            Some(binding) => OutputBinding::Schema {
                spec: SchemaSpec::new(binding.name.clone(), binding.schema.clone()),
                slot: binding.slot,
                field: binding.field.clone(),
            },
            None => OutputBinding::Text,
        };

        let mut specialist = Self::new(config.name.clone(), adapter, output);
        if let Some(requirement) = &config.requires {
            specialist = specialist.with_requirement(requirement.slot, &requirement.recommend);
        }
        if config.completes_task {
            specialist = specialist.with_completes_task();
        }
        if let Some(refinement) = &config.refinement {
            specialist = specialist.with_refinement(RefinementLoop {
                cycles: refinement.cycles,
                critique_partner: refinement.critique_partner.clone(),
            });
        }
        specialist
    }

    /// Require an input artifact, recommending `producer` when absent.
    pub fn with_requirement(mut self, slot: ArtifactSlot, producer: &str) -> Self {
        self.requires = Some((slot, producer.to_string()));
        self
    }

    /// Mark a successful turn as completing the task.
    pub fn with_completes_task(mut self) -> Self {
        self.completes_task = true;
        self
    }

    /// Drive a bounded refinement loop.
    pub fn with_refinement(mut self, refinement: RefinementLoop) -> Self {
        self.refinement = Some(refinement);
        self
    }

    /// Completion/recommendation bookkeeping after a successful turn.
    ///
    /// Refinement loops run `cycles` passes: each non-final pass bumps the
    /// counter and recommends the critique partner; the final pass leaves the
    /// counter alone and signals completion.
    fn finish_successful_turn(&self, state: &StateRecord, mut update: StateUpdate) -> StateUpdate {
        if let Some(refinement) = &self.refinement {
            let completed = state.counter(&self.name);
            if completed + 1 >= refinement.cycles {
                debug!(specialist = %self.name, cycles = refinement.cycles, "refinement loop finished");
                if self.completes_task {
                    update = update.with_task_complete();
                }
            } else {
                update = update
                    .with_counter(&self.name, completed + 1)
                    .with_recommendations(vec![refinement.critique_partner.clone()]);
            }
        } else if self.completes_task {
            update = update.with_task_complete();
        }
        update
    }
}

#[async_trait::async_trait]
impl Specialist for LlmSpecialist {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, state: &StateRecord) -> StateUpdate {
        if let Some((slot, producer)) = &self.requires {
            if !state.artifacts.has(*slot) {
                return missing_artifact_update(&self.name, *slot, producer);
            }
        }

        let history = state.messages.clone();
        let request = match &self.output {
            OutputBinding::Schema { spec, .. } => LlmRequest::with_schema(history, spec.clone()),
            OutputBinding::Text => LlmRequest::text(history),
        };

        let response = match self.adapter.invoke(&request).await {
            Ok(response) => response,
            Err(error) => return provider_failure_update(&self.name, &error),
        };

        let update = match (&self.output, response) {
            (OutputBinding::Schema { slot, field, .. }, LlmResponse::Json(mut value)) => {
                let artifact = match field {
                    Some(field_name) => {
                        unescape_field(&mut value, field_name);
                        match value.get(field_name) {
                            Some(serde_json::Value::String(text)) => {
                                ArtifactValue::Text(text.clone())
                            }
                            Some(other) => ArtifactValue::Structured(other.clone()),
                            None => {
                                warn!(
                                    specialist = %self.name,
                                    field = %field_name,
                                    "expected field absent, storing whole object"
                                );
                                ArtifactValue::Structured(value.clone())
                            }
                        }
                    }
                    None => ArtifactValue::Structured(value.clone()),
                };
                StateUpdate::new()
                    .with_message(Message::assistant(&self.name, value.to_string()))
                    .with_artifact(*slot, artifact)
            }
            (OutputBinding::Schema { .. }, response) => {
                // Downgraded response: the turn failed softly, no artifact
                // and no halt.
                warn!(specialist = %self.name, "structured output unusable this turn");
                return StateUpdate::new().with_message(Message::assistant(
                    &self.name,
                    format!(
                        "I could not produce valid structured output this turn. \
                         Raw response: {}",
                        response.text_lossy()
                    ),
                ));
            }
            (OutputBinding::Text, response) => StateUpdate::new()
                .with_message(Message::assistant(&self.name, response.text_lossy())),
        };

        self.finish_successful_turn(state, update)
    }
}
