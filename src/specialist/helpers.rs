//! Shared update-building helpers for specialists.

use crate::provider::ProviderError;
use crate::state::{ArtifactSlot, Message, RunError, StateUpdate};
use tracing::warn;

/// Non-halting update for a missing input artifact.
///
/// The specialist cannot do its work yet, so it leaves a corrective
/// recommendation for the router instead of failing the run.
pub fn missing_artifact_update(
    specialist: &str,
    slot: ArtifactSlot,
    recommend: &str,
) -> StateUpdate {
    warn!(
        specialist,
        slot = slot.as_str(),
        recommend,
        "required artifact missing, recommending producer"
    );
    StateUpdate::new()
        .with_message(Message::assistant(
            specialist,
            format!(
                "I need the '{slot}' artifact before I can proceed. \
                 Run '{recommend}' first to produce it."
            ),
        ))
        .with_recommendations(vec![recommend.to_string()])
}

/// Halting update for a failed provider invocation.
pub fn provider_failure_update(specialist: &str, error: &ProviderError) -> StateUpdate {
    warn!(specialist, kind = error.kind(), error = %error, "provider invocation failed");
    StateUpdate::new()
        .with_message(Message::assistant(
            specialist,
            format!("backend invocation failed: {error}"),
        ))
        .with_error(RunError::new(specialist, error.kind(), error.to_string()))
}
