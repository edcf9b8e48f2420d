//! Specialist contract and the built-in specialist implementations.
//!
//! A specialist is one unit of work in a run: it reads the shared state and
//! returns a partial update. Failures are carried as data in the update -
//! `execute` never returns an error - so the orchestrator's transition rules
//! are the single place run-halting decisions are made.

pub mod helpers;
pub mod llm;
pub mod procedural;
pub mod registry;
pub mod router;
pub mod wrapped;

pub use llm::{LlmSpecialist, OutputBinding, RefinementLoop};
pub use procedural::{ArchiverSpecialist, FileReadSpecialist, FileStoreSpecialist};
pub use registry::SpecialistRegistry;
pub use router::{RouteOption, RouterSpecialist};
pub use wrapped::{ExternalAgent, WrappedSpecialist};

use crate::state::{StateRecord, StateUpdate};

/// Core trait every specialist implements.
///
/// One execution may invoke at most one provider adapter call; oversized
/// content is the adapter's problem (pruning), never the specialist's.
#[async_trait::async_trait]
pub trait Specialist: Send + Sync {
    /// Registered name, unique within a run.
    fn name(&self) -> &str;

    /// Run one turn against a read-only view of the state.
    ///
    /// Infallible by contract: faults are reported through the update's
    /// `error` slot (halting) or as corrective recommendations (non-halting).
    async fn execute(&self, state: &StateRecord) -> StateUpdate;
}
