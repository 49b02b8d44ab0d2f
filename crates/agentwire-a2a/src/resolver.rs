use crate::config::ClientConfig;
use crate::registry::AgentRegistry;
use agentwire_core::descriptor::parse_endpoint;
use agentwire_core::{AgentDescriptor, AgentwireError, AgentwireResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Path of the descriptor document served by every agent.
pub const WELL_KNOWN_CARD_PATH: &str = ".well-known/agent-card.json";

/// Scheme prefix accepted on registry identifiers.
pub const AGENT_SCHEME: &str = "agent://";

/// Turns an agent identifier into a validated [`AgentDescriptor`].
///
/// No retries and no caching happen here; both are left to the caller.
#[async_trait]
pub trait DescriptorResolver: Send + Sync {
    /// Resolves an agent name or address to its descriptor.
    async fn resolve(&self, identifier: &str) -> AgentwireResult<AgentDescriptor>;
}

/// Fetches descriptor documents from `{base}/.well-known/agent-card.json`.
///
/// Identifiers are either a known alias (see [`with_agent`](Self::with_agent))
/// or an absolute base URL.
pub struct WellKnownResolver {
    http: reqwest::Client,
    aliases: HashMap<String, Url>,
}

impl WellKnownResolver {
    /// Resolver using the configured card timeout.
    pub fn new(config: &ClientConfig) -> AgentwireResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.card_timeout())
            .build()
            .map_err(|e| AgentwireError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            aliases: HashMap::new(),
        })
    }

    /// Registers `name` as an alias for the agent served at `base_url`.
    pub fn with_agent(mut self, name: impl Into<String>, base_url: &str) -> AgentwireResult<Self> {
        let base = parse_endpoint(base_url)?;
        self.aliases.insert(name.into(), base);
        Ok(self)
    }

    /// Known aliases, sorted.
    pub fn agents(&self) -> Vec<String> {
        let mut names: Vec<String> = self.aliases.keys().cloned().collect();
        names.sort();
        names
    }

    fn base_for(&self, identifier: &str) -> AgentwireResult<Url> {
        if let Some(base) = self.aliases.get(identifier) {
            return Ok(base.clone());
        }
        if identifier.starts_with("http://") || identifier.starts_with("https://") {
            return parse_endpoint(identifier);
        }
        Err(AgentwireError::NotFound(format!(
            "no base URL known for agent '{identifier}'"
        )))
    }
}

/// `{base}/.well-known/agent-card.json`, keeping any path prefix of `base`.
pub fn card_url(base: &Url) -> AgentwireResult<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(WELL_KNOWN_CARD_PATH)
        .map_err(|e| AgentwireError::Config(format!("invalid card URL for {base}: {e}")))
}

#[async_trait]
impl DescriptorResolver for WellKnownResolver {
    async fn resolve(&self, identifier: &str) -> AgentwireResult<AgentDescriptor> {
        let base = self.base_for(identifier)?;
        let url = card_url(&base)?;
        debug!(agent = %identifier, url = %url, "Fetching agent card");
        let descriptor = fetch_descriptor(&self.http, url, identifier).await?;
        info!(agent = %descriptor.name, endpoint = %descriptor.endpoint, "Resolved agent");
        Ok(descriptor)
    }
}

/// GETs a descriptor document and validates it.
pub(crate) async fn fetch_descriptor(
    http: &reqwest::Client,
    url: Url,
    identifier: &str,
) -> AgentwireResult<AgentDescriptor> {
    let resp = http
        .get(url.clone())
        .send()
        .await
        .map_err(|e| AgentwireError::Unavailable(format!("GET {url} failed: {e}")))?;

    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(AgentwireError::NotFound(format!(
            "agent '{identifier}' is unknown at {url}"
        )));
    }
    if !status.is_success() {
        return Err(AgentwireError::Unavailable(format!(
            "GET {url} returned HTTP {status}"
        )));
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| AgentwireError::Unavailable(format!("reading {url} failed: {e}")))?;
    let doc: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
        AgentwireError::MalformedDescriptor(format!("descriptor at {url} is not JSON: {e}"))
    })?;
    AgentDescriptor::from_document(&doc)
}

/// Resolves identifiers through an [`AgentRegistry`].
pub struct RegistryResolver {
    registry: Arc<dyn AgentRegistry>,
}

impl RegistryResolver {
    /// Creates a new instance.
    pub fn new(registry: Arc<dyn AgentRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl DescriptorResolver for RegistryResolver {
    async fn resolve(&self, identifier: &str) -> AgentwireResult<AgentDescriptor> {
        let name = identifier.strip_prefix(AGENT_SCHEME).unwrap_or(identifier);
        if name.is_empty() {
            return Err(AgentwireError::NotFound("empty agent identifier".into()));
        }
        self.registry.resolve(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryRegistry;

    #[test]
    fn test_card_url_keeps_prefix() {
        let base = Url::parse("http://127.0.0.1:9001/agents/research").unwrap();
        assert_eq!(
            card_url(&base).unwrap().as_str(),
            "http://127.0.0.1:9001/agents/research/.well-known/agent-card.json"
        );

        let root = Url::parse("http://127.0.0.1:9001").unwrap();
        assert_eq!(
            card_url(&root).unwrap().as_str(),
            "http://127.0.0.1:9001/.well-known/agent-card.json"
        );
    }

    #[tokio::test]
    async fn test_unknown_alias_is_not_found() {
        let resolver = WellKnownResolver::new(&ClientConfig::default()).unwrap();
        let err = resolver.resolve("planner").await.unwrap_err();
        assert!(matches!(err, AgentwireError::NotFound(_)));
    }

    #[test]
    fn test_alias_requires_valid_base() {
        let resolver = WellKnownResolver::new(&ClientConfig::default()).unwrap();
        assert!(resolver.with_agent("bad", "not a url").is_err());

        let resolver = WellKnownResolver::new(&ClientConfig::default())
            .unwrap()
            .with_agent("research", "http://127.0.0.1:9001")
            .unwrap()
            .with_agent("planner", "http://127.0.0.1:9002")
            .unwrap();
        assert_eq!(resolver.agents(), vec!["planner", "research"]);
    }

    #[tokio::test]
    async fn test_registry_resolver_strips_scheme() {
        let registry = Arc::new(InMemoryRegistry::new());
        let research = AgentDescriptor::new("research", "http://127.0.0.1:9001/", "1.0").unwrap();
        registry.register(research.clone()).await.unwrap();

        let resolver = RegistryResolver::new(registry);
        assert_eq!(resolver.resolve("research").await.unwrap(), research);
        assert_eq!(resolver.resolve("agent://research").await.unwrap(), research);
        assert!(matches!(
            resolver.resolve("agent://nobody").await.unwrap_err(),
            AgentwireError::NotFound(_)
        ));
        assert!(resolver.resolve("agent://").await.is_err());
    }
}
