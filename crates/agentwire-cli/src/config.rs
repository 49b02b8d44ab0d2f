//! `agentwire.toml` loading and resolver construction.

use agentwire_a2a::{
    ClientConfig, DescriptorResolver, HttpRegistry, RegistryResolver, WellKnownResolver,
};
use agentwire_core::{AgentDescriptor, AgentwireError, AgentwireResult};
use agentwire_orchestrator::OrchestratorConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// An agent reachable at a well-known base URL.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentEntry {
    pub name: String,
    pub url: String,
}

/// Contents of `agentwire.toml`. Every section is optional.
#[derive(Debug, Default, Deserialize)]
pub struct AgentwireConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Base URL of a registry service consulted for agents not listed below.
    #[serde(default)]
    pub registry_url: Option<String>,
    #[serde(default)]
    pub agents: Vec<AgentEntry>,
}

/// Parse the config file at `path`.
pub fn parse_config(path: &Path) -> AgentwireResult<AgentwireConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AgentwireError::Config(format!("Failed to read config '{}': {e}", path.display()))
    })?;
    toml::from_str(&raw).map_err(|e| {
        AgentwireError::Config(format!("Failed to parse config '{}': {e}", path.display()))
    })
}

/// Like [`parse_config`], falling back to defaults when the file does not exist.
pub fn load_config(path: &Path) -> AgentwireResult<AgentwireConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file not found, using defaults");
        return Ok(AgentwireConfig::default());
    }
    parse_config(path)
}

/// Listed agents and absolute `http(s)` base URLs via their well-known
/// documents, everything else via the registry when one is configured.
pub struct ConfiguredResolver {
    listed: HashSet<String>,
    well_known: WellKnownResolver,
    registry: Option<RegistryResolver>,
}

impl ConfiguredResolver {
    pub fn from_config(config: &AgentwireConfig) -> AgentwireResult<Self> {
        let mut well_known = WellKnownResolver::new(&config.client)?;
        for entry in &config.agents {
            well_known = well_known.with_agent(entry.name.clone(), &entry.url)?;
        }
        let registry = match &config.registry_url {
            Some(url) => Some(RegistryResolver::new(Arc::new(HttpRegistry::new(
                url,
                &config.client,
            )?))),
            None => None,
        };
        Ok(Self {
            listed: config.agents.iter().map(|a| a.name.clone()).collect(),
            well_known,
            registry,
        })
    }

    fn uses_registry(&self, identifier: &str) -> bool {
        self.registry.is_some()
            && !self.listed.contains(identifier)
            && !identifier.starts_with("http://")
            && !identifier.starts_with("https://")
    }
}

#[async_trait]
impl DescriptorResolver for ConfiguredResolver {
    async fn resolve(&self, identifier: &str) -> AgentwireResult<AgentDescriptor> {
        match &self.registry {
            Some(registry) if self.uses_registry(identifier) => registry.resolve(identifier).await,
            _ => self.well_known.resolve(identifier).await,
        }
    }
}
