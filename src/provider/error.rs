//! Error types for the provider layer.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by provider adapters.
///
/// Only transient classifications (`is_transient`) are retried; safety blocks,
/// malformed requests, and authentication failures are fatal on first
/// occurrence.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network-level failure (DNS, connection reset, protocol error).
    #[error("transport error: {0}")]
    Transport(String),

    /// Backend signalled an explicit rate limit (HTTP 429).
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Backend reported itself unavailable (HTTP 5xx).
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The request exceeded its per-call timeout.
    #[error("request timed out after {duration:?}")]
    Timeout {
        /// Effective timeout that elapsed.
        duration: Duration,
    },

    /// Backend refused to answer for safety/policy reasons.
    #[error("safety filter blocked the response: {0}")]
    SafetyBlocked(String),

    /// Authentication or authorization failure (HTTP 401/403).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The backend rejected the request shape (HTTP 400/422).
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The adapter itself was configured incorrectly.
    #[error("misconfiguration: {0}")]
    Misconfiguration(String),
}

impl ProviderError {
    /// Create a Transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a RateLimited error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited(message.into())
    }

    /// Create an Unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Create a SafetyBlocked error.
    pub fn safety_blocked(message: impl Into<String>) -> Self {
        Self::SafetyBlocked(message.into())
    }

    /// Create an Auth error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Create a MalformedRequest error.
    pub fn malformed_request(message: impl Into<String>) -> Self {
        Self::MalformedRequest(message.into())
    }

    /// Create a Misconfiguration error.
    pub fn misconfiguration(message: impl Into<String>) -> Self {
        Self::Misconfiguration(message.into())
    }

    /// True for classifications that a bounded retry may recover from.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::RateLimited(_) | Self::Unavailable(_) | Self::Timeout { .. }
        )
    }

    /// Short category name used in `RunError.kind` and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::RateLimited(_) => "rate_limited",
            Self::Unavailable(_) => "unavailable",
            Self::Timeout { .. } => "timeout",
            Self::SafetyBlocked(_) => "safety_blocked",
            Self::Auth(_) => "auth",
            Self::MalformedRequest(_) => "malformed_request",
            Self::Misconfiguration(_) => "misconfiguration",
        }
    }
}
