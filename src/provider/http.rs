//! Shared HTTP infrastructure for network-backed adapters.
//!
//! One `reqwest::Client` is built per adapter factory and reused across all
//! backend invocations for connection pooling. Status codes are mapped to the
//! provider error taxonomy here so both backends classify failures the same
//! way.

use crate::provider::error::ProviderError;
use reqwest::StatusCode;
use std::time::Duration;

/// Connect timeout applied to every request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the shared HTTP client.
pub fn build_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_idle_timeout(Duration::from_secs(90))
        .use_rustls_tls()
        .build()
        .map_err(|e| ProviderError::misconfiguration(format!("failed to build HTTP client: {e}")))
}

/// Map a reqwest transport error into the taxonomy.
pub fn map_transport_error(error: reqwest::Error, timeout: Duration) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout { duration: timeout }
    } else {
        ProviderError::transport(error.to_string())
    }
}

/// Map an unsuccessful HTTP status (plus response body) into the taxonomy.
///
/// 429 and 5xx are transient; 401/403 and 400/422 are fatal on first
/// occurrence.
pub fn map_status_error(backend: &str, status: StatusCode, body: &str) -> ProviderError {
    let detail = format!("{backend} returned {status}: {}", truncate(body, 500));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::auth(detail),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ProviderError::malformed_request(detail)
        }
        status if status.is_server_error() => ProviderError::unavailable(detail),
        _ => ProviderError::transport(detail),
    }
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            map_status_error("b", StatusCode::UNAUTHORIZED, ""),
            ProviderError::Auth(_)
        ));
        assert!(matches!(
            map_status_error("b", StatusCode::TOO_MANY_REQUESTS, ""),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            map_status_error("b", StatusCode::BAD_REQUEST, ""),
            ProviderError::MalformedRequest(_)
        ));
        assert!(matches!(
            map_status_error("b", StatusCode::SERVICE_UNAVAILABLE, ""),
            ProviderError::Unavailable(_)
        ));
        assert!(matches!(
            map_status_error("b", StatusCode::NOT_FOUND, ""),
            ProviderError::Transport(_)
        ));
    }

    #[test]
    fn test_transient_statuses_retry_fatal_do_not() {
        assert!(map_status_error("b", StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(map_status_error("b", StatusCode::BAD_GATEWAY, "").is_transient());
        assert!(!map_status_error("b", StatusCode::FORBIDDEN, "").is_transient());
        assert!(!map_status_error("b", StatusCode::UNPROCESSABLE_ENTITY, "").is_transient());
    }

    #[test]
    fn test_body_is_truncated_in_detail() {
        let body = "e".repeat(2000);
        let error = map_status_error("backend", StatusCode::BAD_GATEWAY, &body);
        assert!(error.to_string().len() < 700);
    }
}
