//! Routing specialist: decides which specialist runs next.
//!
//! Routing is a forced tool call with a single "route" tool whose argument
//! schema constrains the target to the registered roster. A pending
//! recommendation from a previous turn short-circuits the backend call
//! entirely. Any failure to produce a valid target falls back to the default
//! clarifying specialist - routing never halts a run.

use crate::provider::{LlmRequest, LlmResponse, ProviderAdapter, ToolSpec};
use crate::specialist::Specialist;
use crate::state::{Message, StateRecord, StateUpdate};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

const ROUTE_TOOL: &str = "route";

/// One routable specialist, as presented to the routing model.
#[derive(Debug, Clone)]
pub struct RouteOption {
    pub name: String,
    pub description: String,
}

pub struct RouterSpecialist {
    name: String,
    adapter: Arc<dyn ProviderAdapter>,
    roster: Vec<RouteOption>,
    /// Clarifying specialist used whenever routing fails.
    fallback: String,
}

impl RouterSpecialist {
    pub fn new(
        name: impl Into<String>,
        adapter: Arc<dyn ProviderAdapter>,
        roster: Vec<RouteOption>,
        fallback: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            adapter,
            roster,
            fallback: fallback.into(),
        }
    }

    fn is_valid(&self, target: &str) -> bool {
        self.roster.iter().any(|option| option.name == target)
    }

    /// The single forced tool with the roster as an enum constraint.
    fn route_tool(&self) -> ToolSpec {
        let names: Vec<&str> = self.roster.iter().map(|o| o.name.as_str()).collect();
        ToolSpec::new(
            ROUTE_TOOL,
            "Select the next specialist to run.",
            json!({
                "type": "object",
                "properties": {
                    "next": {"type": "string", "enum": names},
                    "reason": {"type": "string"},
                },
                "required": ["next"],
            }),
        )
    }

    fn roster_prompt(&self) -> Message {
        let mut lines = vec![
            "Decide which specialist should act next. Available specialists:".to_string(),
        ];
        for option in &self.roster {
            lines.push(format!("- {}: {}", option.name, option.description));
        }
        Message::system(lines.join("\n"))
    }

    fn route_to(&self, target: &str, reason: &str) -> StateUpdate {
        info!(router = %self.name, target, reason, "routing decision");
        StateUpdate::new()
            .with_message(Message::assistant(
                &self.name,
                format!("Routing to '{target}': {reason}"),
            ))
            .with_routing_target(target)
            .with_recommendations(Vec::new())
    }

    fn fall_back(&self, why: &str) -> StateUpdate {
        warn!(router = %self.name, fallback = %self.fallback, why, "routing failed, using fallback");
        self.route_to(&self.fallback, why)
    }
}

#[async_trait::async_trait]
impl Specialist for RouterSpecialist {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, state: &StateRecord) -> StateUpdate {
        // A standing recommendation skips the backend call.
        if let Some(recommended) = state
            .recommended_specialists
            .iter()
            .find(|name| self.is_valid(name))
        {
            return self.route_to(recommended, "recommended by the previous specialist");
        }
        if !state.recommended_specialists.is_empty() {
            warn!(
                router = %self.name,
                recommendations = ?state.recommended_specialists,
                "ignoring recommendations outside the roster"
            );
        }

        let mut messages = state.messages.clone();
        messages.push(self.roster_prompt());
        let request = LlmRequest::with_tools(messages, vec![self.route_tool()]);

        match self.adapter.invoke(&request).await {
            Ok(LlmResponse::ToolCalls(calls)) => {
                let Some(call) = calls.first() else {
                    return self.fall_back("the routing model made no tool call");
                };
                if call.name != ROUTE_TOOL {
                    return self.fall_back("the routing model called an unknown tool");
                }
                let Some(target) = call.arguments.get("next").and_then(|v| v.as_str()) else {
                    return self.fall_back("the routing call carried no target");
                };
                if !self.is_valid(target) {
                    return self.fall_back("the routing call named an unknown specialist");
                }
                let reason = call
                    .arguments
                    .get("reason")
                    .and_then(|v| v.as_str())
                    .unwrap_or("selected by the routing model");
                self.route_to(target, reason)
            }
            Ok(_) => self.fall_back("the routing model answered in prose"),
            Err(error) => {
                // Routing never halts the run, even on backend failure.
                self.fall_back(&format!("routing backend failed: {error}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderError, ToolCallRequest};
    use std::sync::Mutex;

    struct ScriptedAdapter {
        responses: Mutex<Vec<Result<LlmResponse, ProviderError>>>,
        seen_tools: Mutex<Vec<ToolSpec>>,
    }

    impl ScriptedAdapter {
        fn new(responses: Vec<Result<LlmResponse, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                seen_tools: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl ProviderAdapter for ScriptedAdapter {
        async fn invoke(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
            self.seen_tools.lock().unwrap().extend(request.tools.clone());
            self.responses.lock().unwrap().remove(0)
        }

        fn adapter_name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-model"
        }
    }

    fn roster() -> Vec<RouteOption> {
        vec![
            RouteOption {
                name: "diagrammer".to_string(),
                description: "produces structured diagrams".to_string(),
            },
            RouteOption {
                name: "web_builder".to_string(),
                description: "renders HTML documents".to_string(),
            },
            RouteOption {
                name: "clarifier".to_string(),
                description: "asks the user a clarifying question".to_string(),
            },
        ]
    }

    fn route_call(next: &str) -> LlmResponse {
        LlmResponse::ToolCalls(vec![ToolCallRequest {
            name: ROUTE_TOOL.to_string(),
            arguments: json!({"next": next, "reason": "test"}),
            id: "call_route".to_string(),
        }])
    }

    #[tokio::test]
    async fn test_valid_tool_call_sets_routing_target() {
        let adapter = ScriptedAdapter::new(vec![Ok(route_call("diagrammer"))]);
        let router = RouterSpecialist::new("router", adapter.clone(), roster(), "clarifier");

        let update = router.execute(&StateRecord::from_goal("draw")).await;
        assert_eq!(update.routing_target.as_deref(), Some("diagrammer"));
        assert!(update.error.is_none());

        // The single tool constrains the target to the roster.
        let tools = adapter.seen_tools.lock().unwrap();
        assert_eq!(tools.len(), 1);
        let names = &tools[0].parameters["properties"]["next"]["enum"];
        assert_eq!(names, &json!(["diagrammer", "web_builder", "clarifier"]));
    }

    #[tokio::test]
    async fn test_unknown_target_falls_back_to_clarifier() {
        let adapter = ScriptedAdapter::new(vec![Ok(route_call("nonexistent"))]);
        let router = RouterSpecialist::new("router", adapter, roster(), "clarifier");

        let update = router.execute(&StateRecord::from_goal("draw")).await;
        assert_eq!(update.routing_target.as_deref(), Some("clarifier"));
        assert!(update.error.is_none());
    }

    #[tokio::test]
    async fn test_missing_tool_call_falls_back() {
        let adapter = ScriptedAdapter::new(vec![Ok(LlmResponse::ToolCalls(vec![]))]);
        let router = RouterSpecialist::new("router", adapter, roster(), "clarifier");

        let update = router.execute(&StateRecord::from_goal("draw")).await;
        assert_eq!(update.routing_target.as_deref(), Some("clarifier"));
    }

    #[tokio::test]
    async fn test_prose_answer_falls_back() {
        let adapter =
            ScriptedAdapter::new(vec![Ok(LlmResponse::Text("I'd pick diagrammer".into()))]);
        let router = RouterSpecialist::new("router", adapter, roster(), "clarifier");

        let update = router.execute(&StateRecord::from_goal("draw")).await;
        assert_eq!(update.routing_target.as_deref(), Some("clarifier"));
    }

    #[tokio::test]
    async fn test_backend_failure_falls_back_instead_of_halting() {
        let adapter = ScriptedAdapter::new(vec![Err(ProviderError::unavailable("503"))]);
        let router = RouterSpecialist::new("router", adapter, roster(), "clarifier");

        let update = router.execute(&StateRecord::from_goal("draw")).await;
        assert_eq!(update.routing_target.as_deref(), Some("clarifier"));
        assert!(update.error.is_none());
    }

    #[tokio::test]
    async fn test_recommendation_short_circuits_backend() {
        // No scripted responses: a backend call would panic.
        let adapter = ScriptedAdapter::new(vec![]);
        let router = RouterSpecialist::new("router", adapter, roster(), "clarifier");

        let mut state = StateRecord::from_goal("draw");
        state.recommended_specialists = vec!["web_builder".to_string()];

        let update = router.execute(&state).await;
        assert_eq!(update.routing_target.as_deref(), Some("web_builder"));
        // Consumed: merge will clear the standing recommendation.
        assert_eq!(update.recommended_specialists, Some(vec![]));
    }

    #[tokio::test]
    async fn test_invalid_recommendation_is_ignored() {
        let adapter = ScriptedAdapter::new(vec![Ok(route_call("diagrammer"))]);
        let router = RouterSpecialist::new("router", adapter, roster(), "clarifier");

        let mut state = StateRecord::from_goal("draw");
        state.recommended_specialists = vec!["ghost".to_string()];

        let update = router.execute(&state).await;
        assert_eq!(update.routing_target.as_deref(), Some("diagrammer"));
    }
}
