use crate::config::ClientConfig;
use crate::protocol::{RpcRequest, RpcResponse};
use agentwire_core::{AgentwireError, AgentwireResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

const MAX_ERROR_BODY: usize = 512;

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Total request timeout for this call; the client default applies when `None`.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    /// Overrides the request timeout for one call.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Sends one request envelope and returns the `result` value.
///
/// Implementations must keep the two failure channels apart:
/// [`AgentwireError::Transport`] for network/HTTP failures and
/// [`AgentwireError::Protocol`] for error envelopes.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Sends one request to `endpoint` and returns its `result`.
    async fn call(
        &self,
        endpoint: &Url,
        method: &str,
        params: serde_json::Value,
        options: &CallOptions,
    ) -> AgentwireResult<serde_json::Value>;
}

/// JSON-RPC over HTTP(S) POST.
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport with the connect and request timeouts from `config`.
    pub fn new(config: &ClientConfig) -> AgentwireResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AgentwireError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Wraps an existing client.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(
        &self,
        endpoint: &Url,
        method: &str,
        params: serde_json::Value,
        options: &CallOptions,
    ) -> AgentwireResult<serde_json::Value> {
        let request = RpcRequest::new(method, params);
        debug!(
            endpoint = %endpoint,
            method = %method,
            correlation_id = %request.correlation_id,
            "RPC call"
        );

        let mut builder = self.http.post(endpoint.clone()).json(&request);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| AgentwireError::Transport(describe(&e, endpoint)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(AgentwireError::Transport(format!(
                "HTTP {status} from {endpoint}: {snippet}"
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AgentwireError::Transport(describe(&e, endpoint)))?;

        let envelope: RpcResponse = serde_json::from_slice(&bytes).map_err(|e| {
            AgentwireError::MalformedResponse(format!("invalid response envelope from {endpoint}: {e}"))
        })?;
        envelope.check_correlation(&request.correlation_id)?;

        debug!(
            method = %method,
            correlation_id = %request.correlation_id,
            is_error = envelope.error.is_some(),
            "RPC response"
        );
        envelope.into_result()
    }
}

fn describe(err: &reqwest::Error, endpoint: &Url) -> String {
    if err.is_timeout() {
        format!("request to {endpoint} timed out: {err}")
    } else if err.is_connect() {
        format!("could not connect to {endpoint}: {err}")
    } else {
        format!("request to {endpoint} failed: {err}")
    }
}
