//! Adapter construction from provider configuration.

use crate::config::{BackendKind, ProviderConfig};
use crate::provider::error::ProviderError;
use crate::provider::gemini::GeminiAdapter;
use crate::provider::http::build_client;
use crate::provider::openai::OpenAiCompatAdapter;
use crate::provider::traits::ProviderAdapter;
use std::sync::Arc;
use tracing::info;

/// Builds adapters for configured backends, sharing one HTTP client across
/// all of them for connection pooling.
pub struct AdapterFactory {
    client: reqwest::Client,
}

impl AdapterFactory {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client()?,
        })
    }

    /// Build an adapter bound to `config` and the given role instruction.
    pub fn create(
        &self,
        config: &ProviderConfig,
        instruction: &str,
    ) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
        let adapter: Arc<dyn ProviderAdapter> = match config.backend {
            BackendKind::OpenAiCompat => Arc::new(OpenAiCompatAdapter::new(
                self.client.clone(),
                config,
                instruction,
            )?),
            BackendKind::Gemini => Arc::new(GeminiAdapter::new(
                self.client.clone(),
                config,
                instruction,
            )?),
        };

        info!(
            backend = adapter.adapter_name(),
            model = adapter.model(),
            "adapter constructed"
        );
        Ok(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_builds_each_backend() {
        let factory = AdapterFactory::new().unwrap();

        let openai = ProviderConfig {
            backend: BackendKind::OpenAiCompat,
            model: "local-model".to_string(),
            base_url: Some("http://localhost:1234/v1".to_string()),
            api_key: None,
            temperature: 0.7,
            max_output_tokens: 4096,
            context_window: 8192,
            timeout_secs: 120,
        };
        let adapter = factory.create(&openai, "instruction").unwrap();
        assert_eq!(adapter.adapter_name(), "openai-compat");
        assert_eq!(adapter.model(), "local-model");

        let gemini = ProviderConfig {
            backend: BackendKind::Gemini,
            model: "gemini-2.0-flash".to_string(),
            base_url: None,
            api_key: Some("key".to_string()),
            ..openai
        };
        let adapter = factory.create(&gemini, "instruction").unwrap();
        assert_eq!(adapter.adapter_name(), "gemini");
    }

    #[test]
    fn test_factory_surfaces_misconfiguration() {
        let factory = AdapterFactory::new().unwrap();
        let config = ProviderConfig {
            backend: BackendKind::OpenAiCompat,
            model: "m".to_string(),
            base_url: None,
            api_key: None,
            temperature: 0.7,
            max_output_tokens: 4096,
            context_window: 8192,
            timeout_secs: 120,
        };
        assert!(factory.create(&config, "").is_err());
    }
}
