use crate::config::ClientConfig;
use crate::resolver::fetch_descriptor;
use agentwire_core::descriptor::parse_endpoint;
use agentwire_core::{AgentDescriptor, AgentwireError, AgentwireResult};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;
use url::Url;

/// Directory of agent descriptors keyed by name.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// Adds or replaces the descriptor registered under its name.
    async fn register(&self, descriptor: AgentDescriptor) -> AgentwireResult<()>;
    /// Removes `name`. Unknown names are `NotFound`.
    async fn deregister(&self, name: &str) -> AgentwireResult<()>;
    /// Looks up `name`.
    async fn resolve(&self, name: &str) -> AgentwireResult<AgentDescriptor>;
}

/// Process-local registry.
#[derive(Default)]
pub struct InMemoryRegistry {
    agents: RwLock<HashMap<String, AgentDescriptor>>,
}

impl InMemoryRegistry {
    /// Empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered agents.
    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    /// Whether nothing is registered.
    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }

    /// Registered names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl AgentRegistry for InMemoryRegistry {
    async fn register(&self, descriptor: AgentDescriptor) -> AgentwireResult<()> {
        info!(agent = %descriptor.name, endpoint = %descriptor.endpoint, "Agent registered");
        self.agents
            .write()
            .await
            .insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    async fn deregister(&self, name: &str) -> AgentwireResult<()> {
        match self.agents.write().await.remove(name) {
            Some(_) => {
                info!(agent = %name, "Agent deregistered");
                Ok(())
            }
            None => Err(AgentwireError::NotFound(format!("agent '{name}' is not registered"))),
        }
    }

    async fn resolve(&self, name: &str) -> AgentwireResult<AgentDescriptor> {
        self.agents
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AgentwireError::NotFound(format!("agent '{name}' is not registered")))
    }
}

/// Client for a remote registry service exposing `{base}/agents`.
pub struct HttpRegistry {
    http: reqwest::Client,
    base: Url,
}

impl HttpRegistry {
    /// Registry service at `base_url`.
    pub fn new(base_url: &str, config: &ClientConfig) -> AgentwireResult<Self> {
        let base = parse_endpoint(base_url)?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.card_timeout())
            .build()
            .map_err(|e| AgentwireError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, base })
    }

    fn agents_url(&self, name: Option<&str>) -> AgentwireResult<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                AgentwireError::Config(format!("registry URL {} cannot be a base", self.base))
            })?;
            segments.pop_if_empty().push("agents");
            if let Some(name) = name {
                segments.push(name);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl AgentRegistry for HttpRegistry {
    async fn register(&self, descriptor: AgentDescriptor) -> AgentwireResult<()> {
        let url = self.agents_url(None)?;
        let resp = self
            .http
            .post(url.clone())
            .json(&descriptor.to_document())
            .send()
            .await
            .map_err(|e| AgentwireError::Unavailable(format!("POST {url} failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AgentwireError::Unavailable(format!(
                "POST {url} returned HTTP {}",
                resp.status()
            )));
        }
        info!(agent = %descriptor.name, registry = %self.base, "Agent registered");
        Ok(())
    }

    async fn deregister(&self, name: &str) -> AgentwireResult<()> {
        let url = self.agents_url(Some(name))?;
        let resp = self
            .http
            .delete(url.clone())
            .send()
            .await
            .map_err(|e| AgentwireError::Unavailable(format!("DELETE {url} failed: {e}")))?;
        match resp.status() {
            s if s.is_success() => {
                info!(agent = %name, registry = %self.base, "Agent deregistered");
                Ok(())
            }
            reqwest::StatusCode::NOT_FOUND => Err(AgentwireError::NotFound(format!(
                "agent '{name}' is not registered at {}",
                self.base
            ))),
            s => Err(AgentwireError::Unavailable(format!(
                "DELETE {url} returned HTTP {s}"
            ))),
        }
    }

    async fn resolve(&self, name: &str) -> AgentwireResult<AgentDescriptor> {
        let url = self.agents_url(Some(name))?;
        fetch_descriptor(&self.http, url, name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> AgentDescriptor {
        AgentDescriptor::new(name, "http://127.0.0.1:9001/", "1.0").unwrap()
    }

    #[tokio::test]
    async fn test_register_resolve_deregister() {
        let registry = InMemoryRegistry::new();
        assert!(registry.is_empty().await);

        registry.register(descriptor("research")).await.unwrap();
        registry.register(descriptor("planner")).await.unwrap();
        assert_eq!(registry.len().await, 2);
        assert_eq!(registry.names().await, vec!["planner", "research"]);

        assert_eq!(registry.resolve("research").await.unwrap().name, "research");

        registry.deregister("research").await.unwrap();
        assert!(matches!(
            registry.resolve("research").await.unwrap_err(),
            AgentwireError::NotFound(_)
        ));
        assert!(registry.deregister("research").await.is_err());
    }

    #[tokio::test]
    async fn test_register_replaces() {
        let registry = InMemoryRegistry::new();
        registry.register(descriptor("research")).await.unwrap();
        let newer = AgentDescriptor::new("research", "http://127.0.0.1:9005/", "2.0").unwrap();
        registry.register(newer).await.unwrap();

        let resolved = registry.resolve("research").await.unwrap();
        assert_eq!(resolved.version, "2.0");
        assert_eq!(registry.len().await, 1);
    }

    #[test]
    fn test_agents_url() {
        let registry =
            HttpRegistry::new("http://registry.local:8500/v1/", &ClientConfig::default()).unwrap();
        assert_eq!(
            registry.agents_url(None).unwrap().as_str(),
            "http://registry.local:8500/v1/agents"
        );
        assert_eq!(
            registry.agents_url(Some("research")).unwrap().as_str(),
            "http://registry.local:8500/v1/agents/research"
        );
    }
}
