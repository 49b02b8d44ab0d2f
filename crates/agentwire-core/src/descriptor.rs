use crate::error::{AgentwireError, AgentwireResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use url::Url;

/// Machine-readable metadata describing where an agent lives and what it can do.
///
/// Immutable once resolved. Construct through [`AgentDescriptor::new`] or
/// [`AgentDescriptor::from_document`], both of which guarantee that
/// `endpoint` is an absolute `http`/`https` URL. Deserialization goes through
/// `from_document` as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct AgentDescriptor {
    /// Registry name of the agent.
    pub name: String,
    /// RPC endpoint that accepts request envelopes.
    pub endpoint: Url,
    /// Capability tags advertised by the agent.
    pub capabilities: BTreeSet<String>,
    /// Agent version string.
    pub version: String,
}

impl AgentDescriptor {
    /// Creates a descriptor, validating the endpoint.
    pub fn new(
        name: impl Into<String>,
        endpoint: &str,
        version: impl Into<String>,
    ) -> AgentwireResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AgentwireError::MalformedDescriptor(
                "agent name must not be empty".into(),
            ));
        }
        Ok(Self {
            name,
            endpoint: parse_endpoint(endpoint)?,
            capabilities: BTreeSet::new(),
            version: version.into(),
        })
    }

    /// Adds a capability tag.
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    /// Whether the agent advertises the given capability.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Validates and converts a raw descriptor document.
    ///
    /// Accepts the plain `{ name, endpoint, capabilities, version }` shape as
    /// well as A2A agent cards, where the endpoint is named `url`,
    /// `capabilities` is an object of boolean flags and `skills` carry ids.
    pub fn from_document(doc: &serde_json::Value) -> AgentwireResult<Self> {
        let obj = doc.as_object().ok_or_else(|| {
            AgentwireError::MalformedDescriptor("descriptor document is not an object".into())
        })?;

        let name = required_str(obj, "name")?;
        if name.trim().is_empty() {
            return Err(AgentwireError::MalformedDescriptor(
                "field 'name' must not be empty".into(),
            ));
        }

        let endpoint = match obj.get("endpoint").or_else(|| obj.get("url")) {
            Some(serde_json::Value::String(s)) => parse_endpoint(s)?,
            Some(other) => {
                return Err(AgentwireError::MalformedDescriptor(format!(
                    "field 'endpoint' must be a string, got {other}"
                )))
            }
            None => {
                return Err(AgentwireError::MalformedDescriptor(
                    "missing required field 'endpoint'".into(),
                ))
            }
        };

        let version = required_str(obj, "version")?;

        let mut capabilities = BTreeSet::new();
        match obj.get("capabilities") {
            None | Some(serde_json::Value::Null) => {}
            Some(serde_json::Value::Array(items)) => {
                for item in items {
                    let tag = item.as_str().ok_or_else(|| {
                        AgentwireError::MalformedDescriptor(format!(
                            "capability entries must be strings, got {item}"
                        ))
                    })?;
                    capabilities.insert(tag.to_string());
                }
            }
            Some(serde_json::Value::Object(flags)) => {
                for (flag, enabled) in flags {
                    if enabled.as_bool() == Some(true) {
                        capabilities.insert(flag.clone());
                    }
                }
            }
            Some(other) => {
                return Err(AgentwireError::MalformedDescriptor(format!(
                    "field 'capabilities' must be an array or object, got {other}"
                )))
            }
        }

        if let Some(skills) = obj.get("skills").and_then(|s| s.as_array()) {
            for skill in skills {
                if let Some(id) = skill.get("id").and_then(|id| id.as_str()) {
                    capabilities.insert(id.to_string());
                }
            }
        }

        Ok(Self {
            name: name.to_string(),
            endpoint,
            capabilities,
            version: version.to_string(),
        })
    }

    /// Renders the descriptor in the plain document shape.
    pub fn to_document(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "endpoint": self.endpoint.as_str(),
            "capabilities": self.capabilities,
            "version": self.version,
        })
    }
}

impl TryFrom<serde_json::Value> for AgentDescriptor {
    type Error = AgentwireError;

    fn try_from(doc: serde_json::Value) -> AgentwireResult<Self> {
        Self::from_document(&doc)
    }
}

fn required_str<'a>(
    obj: &'a serde_json::Map<String, serde_json::Value>,
    field: &str,
) -> AgentwireResult<&'a str> {
    match obj.get(field) {
        Some(serde_json::Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(AgentwireError::MalformedDescriptor(format!(
            "field '{field}' must be a string, got {other}"
        ))),
        None => Err(AgentwireError::MalformedDescriptor(format!(
            "missing required field '{field}'"
        ))),
    }
}

/// Parses an agent endpoint, requiring an absolute `http`/`https` URL with a host.
pub fn parse_endpoint(raw: &str) -> AgentwireResult<Url> {
    let url = Url::parse(raw).map_err(|e| {
        AgentwireError::MalformedDescriptor(format!("invalid endpoint '{raw}': {e}"))
    })?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AgentwireError::MalformedDescriptor(format!(
                "unsupported endpoint scheme '{scheme}'"
            )))
        }
    }
    if url.host_str().is_none() {
        return Err(AgentwireError::MalformedDescriptor(format!(
            "endpoint '{raw}' has no host"
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_validates() {
        let err = serde_json::from_value::<AgentDescriptor>(json!({
            "name": "",
            "endpoint": "file:///etc/passwd",
            "version": "1"
        }));
        assert!(err.is_err());

        let err = serde_json::from_value::<AgentDescriptor>(json!({
            "name": "research",
            "endpoint": "file:///etc/passwd",
            "version": "1"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("unsupported endpoint scheme"));

        let agent = AgentDescriptor::new("research", "http://localhost:9001/", "1.0")
            .unwrap()
            .with_capability("summarize");
        let back: AgentDescriptor =
            serde_json::from_str(&serde_json::to_string(&agent).unwrap()).unwrap();
        assert_eq!(back, agent);
    }

    #[test]
    fn test_plain_document() {
        let doc = json!({
            "name": "research",
            "endpoint": "http://localhost:9001/",
            "capabilities": ["summarize", "search"],
            "version": "1.0.0"
        });
        let desc = AgentDescriptor::from_document(&doc).unwrap();
        assert_eq!(desc.name, "research");
        assert_eq!(desc.endpoint.as_str(), "http://localhost:9001/");
        assert!(desc.has_capability("summarize"));
        assert!(desc.has_capability("search"));
        assert_eq!(desc.version, "1.0.0");
    }

    #[test]
    fn test_a2a_card_shape() {
        let doc = json!({
            "name": "Planner Agent",
            "description": "Creates plans",
            "url": "http://localhost:9002/",
            "version": "0.2.0",
            "capabilities": {"streaming": false, "pushNotifications": true},
            "skills": [{"id": "plan", "name": "Planning"}]
        });
        let desc = AgentDescriptor::from_document(&doc).unwrap();
        assert_eq!(desc.endpoint.as_str(), "http://localhost:9002/");
        assert!(desc.has_capability("pushNotifications"));
        assert!(!desc.has_capability("streaming"));
        assert!(desc.has_capability("plan"));
    }

    #[test]
    fn test_missing_fields_rejected() {
        let no_endpoint = json!({"name": "x", "version": "1"});
        assert!(matches!(
            AgentDescriptor::from_document(&no_endpoint),
            Err(AgentwireError::MalformedDescriptor(_))
        ));

        let no_version = json!({"name": "x", "endpoint": "http://h/"});
        assert!(matches!(
            AgentDescriptor::from_document(&no_version),
            Err(AgentwireError::MalformedDescriptor(_))
        ));

        let not_object = json!(["name"]);
        assert!(AgentDescriptor::from_document(&not_object).is_err());
    }

    #[test]
    fn test_wrong_types_rejected() {
        let numeric_name = json!({"name": 7, "endpoint": "http://h/", "version": "1"});
        assert!(AgentDescriptor::from_document(&numeric_name).is_err());

        let bad_caps = json!({
            "name": "x", "endpoint": "http://h/", "version": "1", "capabilities": [1, 2]
        });
        assert!(AgentDescriptor::from_document(&bad_caps).is_err());

        let bad_caps_kind = json!({
            "name": "x", "endpoint": "http://h/", "version": "1", "capabilities": "all"
        });
        assert!(AgentDescriptor::from_document(&bad_caps_kind).is_err());
    }

    #[test]
    fn test_endpoint_validation() {
        assert!(parse_endpoint("https://agents.example.com/rpc").is_ok());
        assert!(parse_endpoint("ftp://agents.example.com/").is_err());
        assert!(parse_endpoint("not a url").is_err());
        assert!(parse_endpoint("/relative/path").is_err());
    }

    #[test]
    fn test_document_roundtrip_shape() {
        let desc = AgentDescriptor::new("research", "http://localhost:9001/", "1.0")
            .unwrap()
            .with_capability("summarize");
        let doc = desc.to_document();
        assert_eq!(doc["endpoint"], "http://localhost:9001/");
        assert_eq!(doc["capabilities"], json!(["summarize"]));
        assert_eq!(AgentDescriptor::from_document(&doc).unwrap(), desc);
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(AgentDescriptor::new("  ", "http://h/", "1").is_err());
    }
}
