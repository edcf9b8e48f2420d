//! Wrapped-external specialist.
//!
//! Adapts an externally supplied agent's own run call into the specialist
//! contract via two translation functions: state to agent input, agent output
//! to state update. An agent that failed to load at construction time leaves
//! the specialist disabled rather than panicking; executing a disabled
//! specialist returns an error update.

use crate::specialist::Specialist;
use crate::state::{Message, RunError, StateRecord, StateUpdate};
use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

/// Contract for an externally supplied agent.
#[async_trait::async_trait]
pub trait ExternalAgent: Send + Sync {
    async fn run(&self, input: &str) -> Result<String>;
}

/// Translates run state into the external agent's input.
pub type ToInputFn = Box<dyn Fn(&StateRecord) -> String + Send + Sync>;

/// Translates the external agent's output into a state update.
pub type FromOutputFn = Box<dyn Fn(&str) -> StateUpdate + Send + Sync>;

pub struct WrappedSpecialist {
    name: String,
    /// `None` when the agent failed to load; the specialist is disabled.
    agent: Option<Arc<dyn ExternalAgent>>,
    to_input: ToInputFn,
    from_output: FromOutputFn,
}

impl WrappedSpecialist {
    pub fn new(
        name: impl Into<String>,
        agent: Option<Arc<dyn ExternalAgent>>,
        to_input: ToInputFn,
        from_output: FromOutputFn,
    ) -> Self {
        let name = name.into();
        if agent.is_none() {
            warn!(specialist = %name, "external agent unavailable, specialist disabled");
        }
        Self {
            name,
            agent,
            to_input,
            from_output,
        }
    }

    /// True when the underlying agent loaded successfully.
    pub fn is_enabled(&self) -> bool {
        self.agent.is_some()
    }
}

#[async_trait::async_trait]
impl Specialist for WrappedSpecialist {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, state: &StateRecord) -> StateUpdate {
        let Some(agent) = &self.agent else {
            return StateUpdate::new()
                .with_message(Message::assistant(
                    &self.name,
                    "this specialist is disabled: its external agent failed to load",
                ))
                .with_error(RunError::new(
                    &self.name,
                    "disabled",
                    "external agent failed to load at construction time",
                ));
        };

        let input = (self.to_input)(state);
        match agent.run(&input).await {
            Ok(output) => (self.from_output)(&output),
            Err(error) => {
                warn!(specialist = %self.name, error = %error, "external agent failed");
                StateUpdate::new()
                    .with_message(Message::assistant(
                        &self.name,
                        format!("external agent failed: {error:#}"),
                    ))
                    .with_error(RunError::new(&self.name, "external_agent", format!("{error:#}")))
            }
        }
    }
}
