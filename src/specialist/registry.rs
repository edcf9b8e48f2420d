//! Static specialist registry.
//!
//! Specialists are looked up by name at orchestration time, but the mapping
//! itself is populated by explicit registration at startup - there is no
//! runtime module discovery. Construction faults (missing provider, invalid
//! sandbox path) abort registry construction, never a specific run.

use crate::config::{ProceduralAction, RuntimeConfig, SpecialistKind};
use crate::provider::AdapterFactory;
use crate::specialist::llm::LlmSpecialist;
use crate::specialist::procedural::{ArchiverSpecialist, FileReadSpecialist, FileStoreSpecialist};
use crate::specialist::router::{RouteOption, RouterSpecialist};
use crate::specialist::Specialist;
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Default)]
pub struct SpecialistRegistry {
    specialists: HashMap<String, Arc<dyn Specialist>>,
}

impl SpecialistRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one specialist under its own name.
    pub fn register(&mut self, specialist: Arc<dyn Specialist>) -> Result<()> {
        let name = specialist.name().to_string();
        if self.specialists.contains_key(&name) {
            bail!("specialist '{name}' is already registered");
        }
        info!(specialist = %name, "registered");
        self.specialists.insert(name, specialist);
        Ok(())
    }

    /// Build and register every specialist named in the runtime config.
    ///
    /// The entry matching `workflow.router` becomes the routing specialist;
    /// its roster is every other configured specialist. Wrapped-external
    /// specialists cannot be built from config alone - the host constructs
    /// them and calls `register` directly.
    pub fn build_from_config(
        &mut self,
        config: &RuntimeConfig,
        factory: &AdapterFactory,
    ) -> Result<()> {
        for spec in &config.specialists {
            let name = spec.name.as_str();
            let specialist: Arc<dyn Specialist> = match spec.kind {
                SpecialistKind::Llm => {
                    let provider_id = spec
                        .provider
                        .as_deref()
                        .with_context(|| format!("specialist '{name}' names no provider"))?;
                    let provider = config
                        .providers
                        .get(provider_id)
                        .with_context(|| format!("unknown provider '{provider_id}'"))?;
                    let adapter = factory
                        .create(provider, &spec.instruction)
                        .with_context(|| format!("building adapter for '{name}'"))?;

                    if name == config.workflow.router {
                        let roster: Vec<RouteOption> = config
                            .specialists
                            .iter()
                            .filter(|other| other.name != config.workflow.router)
                            .map(|other| RouteOption {
                                name: other.name.clone(),
                                description: other.description.clone(),
                            })
                            .collect();
                        Arc::new(RouterSpecialist::new(
                            name,
                            adapter,
                            roster,
                            &config.workflow.default_specialist,
                        ))
                    } else {
                        Arc::new(LlmSpecialist::from_config(spec, adapter))
                    }
                }
                SpecialistKind::Procedural => match spec.action {
                    Some(ProceduralAction::StoreDocument) => {
                        let root = spec
                            .sandbox_root
                            .as_ref()
                            .with_context(|| format!("specialist '{name}' needs a sandbox_root"))?;
                        let producer = spec
                            .requires
                            .as_ref()
                            .map(|r| r.recommend.clone())
                            .unwrap_or_else(|| config.workflow.default_specialist.clone());
                        Arc::new(FileStoreSpecialist::new(
                            name,
                            root,
                            &spec.file_name,
                            spec.allow_writes,
                            producer,
                        )?)
                    }
                    Some(ProceduralAction::ReadFile) => {
                        let root = spec
                            .sandbox_root
                            .as_ref()
                            .with_context(|| format!("specialist '{name}' needs a sandbox_root"))?;
                        Arc::new(FileReadSpecialist::new(name, root, spec.file_name.as_str())?)
                    }
                    Some(ProceduralAction::Archive) => Arc::new(ArchiverSpecialist::new(name)),
                    None => bail!("procedural specialist '{name}' names no action"),
                },
                SpecialistKind::Wrapped => {
                    bail!(
                        "wrapped specialist '{name}' must be constructed by the host \
                         and registered explicitly"
                    )
                }
            };
            self.register(specialist)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Specialist>> {
        self.specialists.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specialists.contains_key(name)
    }

    /// Consume the registry into the orchestrator's lookup map.
    pub fn into_map(self) -> HashMap<String, Arc<dyn Specialist>> {
        self.specialists
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        BackendKind, ProviderConfig, SpecialistConfig, WorkflowConfig,
    };

    fn runtime_config() -> RuntimeConfig {
        let mut providers = HashMap::new();
        providers.insert(
            "local".to_string(),
            ProviderConfig {
                backend: BackendKind::OpenAiCompat,
                model: "local-model".to_string(),
                base_url: Some("http://localhost:1234/v1".to_string()),
                api_key: None,
                temperature: 0.7,
                max_output_tokens: 4096,
                context_window: 8192,
                timeout_secs: 120,
            },
        );

        let mut router = SpecialistConfig::llm("router", "local");
        router.instruction = "Route requests.".to_string();
        let mut clarifier = SpecialistConfig::llm("clarifier", "local");
        clarifier.description = "asks clarifying questions".to_string();
        let archiver = SpecialistConfig::procedural("archiver", ProceduralAction::Archive);

        RuntimeConfig {
            workflow: WorkflowConfig::default(),
            providers,
            specialists: vec![router, clarifier, archiver],
        }
    }

    #[test]
    fn test_build_from_config_registers_all() {
        let mut registry = SpecialistRegistry::new();
        let factory = AdapterFactory::new().unwrap();
        registry
            .build_from_config(&runtime_config(), &factory)
            .unwrap();

        assert!(registry.contains("router"));
        assert!(registry.contains("clarifier"));
        assert!(registry.contains("archiver"));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = SpecialistRegistry::new();
        registry
            .register(Arc::new(ArchiverSpecialist::new("archiver")))
            .unwrap();
        let result = registry.register(Arc::new(ArchiverSpecialist::new("archiver")));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_provider_aborts_construction() {
        let mut config = runtime_config();
        config.specialists[1].provider = Some("missing".to_string());

        let mut registry = SpecialistRegistry::new();
        let factory = AdapterFactory::new().unwrap();
        let result = registry.build_from_config(&config, &factory);
        assert!(result.unwrap_err().to_string().contains("missing"));
    }

    #[test]
    fn test_wrapped_kind_requires_explicit_registration() {
        let mut config = runtime_config();
        config.specialists.push(SpecialistConfig {
            kind: SpecialistKind::Wrapped,
            ..SpecialistConfig::llm("wrapped", "local")
        });

        let mut registry = SpecialistRegistry::new();
        let factory = AdapterFactory::new().unwrap();
        assert!(registry.build_from_config(&config, &factory).is_err());
    }
}
