//! Run state machine.
//!
//! States are the registered specialist names plus END. After each specialist
//! turn is merged, the next state is decided by a fixed priority: error halts,
//! completion halts, a fresh routing target wins, and otherwise the
//! specialist's static edge applies. Exactly one specialist runs at a time;
//! the canonical state is owned here and never shared mutably.

use crate::config::WorkflowConfig;
use crate::specialist::Specialist;
use crate::state::{RunError, StateRecord};
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// Static successor for one specialist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edge {
    To(String),
    End,
}

pub struct Orchestrator {
    specialists: HashMap<String, Arc<dyn Specialist>>,
    edges: HashMap<String, Edge>,
    entry: String,
    router: String,
    max_turns: u32,
}

impl Orchestrator {
    /// Assemble the state machine from workflow settings and the registered
    /// specialists.
    ///
    /// Every specialist without an explicit edge returns to the router
    /// (hub-and-spoke). Entry, router, fallback, and edge names must all
    /// resolve; the reserved edge target "END" terminates the run.
    pub fn new(
        workflow: &WorkflowConfig,
        specialists: HashMap<String, Arc<dyn Specialist>>,
    ) -> Result<Self> {
        for required in [
            &workflow.entry_point,
            &workflow.router,
            &workflow.default_specialist,
        ] {
            if !specialists.contains_key(required) {
                bail!("workflow references unregistered specialist '{required}'");
            }
        }

        let mut orchestrator = Self {
            specialists,
            edges: HashMap::new(),
            entry: workflow.entry_point.clone(),
            router: workflow.router.clone(),
            max_turns: workflow.max_turns,
        };
        for (from, to) in &workflow.edges {
            let edge = if to == "END" {
                Edge::End
            } else {
                Edge::To(to.clone())
            };
            orchestrator = orchestrator.with_edge(from.clone(), edge)?;
        }
        Ok(orchestrator)
    }

    /// Set a static edge, overriding the default return-to-router.
    pub fn with_edge(mut self, from: impl Into<String>, edge: Edge) -> Result<Self> {
        let from = from.into();
        if !self.specialists.contains_key(&from) {
            bail!("edge source '{from}' is not registered");
        }
        if let Edge::To(target) = &edge {
            if !self.specialists.contains_key(target) {
                bail!("edge target '{target}' is not registered");
            }
        }
        self.edges.insert(from, edge);
        Ok(self)
    }

    /// Execute one run to its terminal state.
    ///
    /// Always returns a complete, inspectable state: a halting failure is
    /// carried in `error`, partial artifacts and the full history intact.
    pub async fn run(&self, goal: impl Into<String>) -> StateRecord {
        let run_id = uuid::Uuid::new_v4();
        let span = info_span!("run", %run_id);
        self.run_inner(goal.into()).instrument(span).await
    }

    async fn run_inner(&self, goal: String) -> StateRecord {
        let mut state = StateRecord::from_goal(goal);
        let mut current = self.entry.clone();
        let mut turns = 0u32;

        loop {
            if turns >= self.max_turns {
                warn!(max_turns = self.max_turns, "turn bound reached, halting");
                state.error = Some(RunError::new(
                    "orchestrator",
                    "max_turns",
                    format!("run exceeded {} specialist turns", self.max_turns),
                ));
                break;
            }
            turns += 1;

            let Some(specialist) = self.specialists.get(&current) else {
                state.error = Some(RunError::new(
                    "orchestrator",
                    "unknown_specialist",
                    format!("no specialist registered as '{current}'"),
                ));
                break;
            };

            info!(specialist = %current, turn = turns, "executing");
            let update = specialist.execute(&state).await;
            state.merge(update);

            // Fixed transition priority.
            if let Some(error) = &state.error {
                warn!(
                    specialist = %error.specialist,
                    kind = %error.kind,
                    "halting on error"
                );
                break;
            }
            if state.task_complete {
                info!(turns, "task complete");
                break;
            }
            if current == self.router {
                match state.routing_target.take() {
                    Some(target) => {
                        current = target;
                        continue;
                    }
                    None => {
                        state.error = Some(RunError::new(
                            "orchestrator",
                            "routing",
                            "router produced no routing target",
                        ));
                        break;
                    }
                }
            }
            match self.edges.get(&current) {
                Some(Edge::To(next)) => current = next.clone(),
                Some(Edge::End) => break,
                None => current = self.router.clone(),
            }
        }

        state
    }
}
