//! Provider layer: standardized envelopes plus per-backend adapters.
//!
//! Specialists never talk to a backend directly. They build an `LlmRequest`,
//! hand it to a `ProviderAdapter`, and receive an `LlmResponse` tagged union.
//! Everything backend-specific - call shapes, retry, context pruning, role
//! normalization, defensive parsing - lives behind the trait.

pub mod context;
pub mod error;
pub mod factory;
pub mod gemini;
pub mod http;
pub mod openai;
pub mod parse;
pub mod retry;
pub mod traits;
pub mod types;

pub use error::ProviderError;
pub use factory::AdapterFactory;
pub use gemini::GeminiAdapter;
pub use openai::OpenAiCompatAdapter;
pub use retry::RetryPolicy;
pub use traits::ProviderAdapter;
pub use types::{InvokeMode, LlmRequest, LlmResponse, SchemaSpec, ToolCallRequest, ToolSpec};
