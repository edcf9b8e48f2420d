//! Provider adapter abstraction for multi-backend support.
//!
//! An adapter converts the standardized request envelope into one backend's
//! call shape, executes it (with retry and context management), and converts
//! the raw response back into the standardized tagged union. Adapters are
//! fully configured at construction - including the specialist's fixed role
//! instruction - and hold no per-run state, so one instance is safely shared
//! across concurrent runs.

use crate::provider::error::ProviderError;
use crate::provider::types::{LlmRequest, LlmResponse};

/// Core trait all backend adapters implement.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Execute one standardized request against the backend.
    ///
    /// Returns the standardized response, downgrading to `Text` when the
    /// requested mode cannot be honored. Only transport-level and policy
    /// failures surface as errors; parse failures never do.
    async fn invoke(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError>;

    /// Adapter identifier for logging (e.g. "openai-compat", "gemini").
    fn adapter_name(&self) -> &str;

    /// Model identifier this adapter is bound to.
    fn model(&self) -> &str;
}
