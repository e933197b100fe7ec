//! Client for the remote step-execution agent service.
//!
//! The agent service performs the actual enrichment work (LLM calls,
//! thumbnail rendering); this crate only dispatches single steps to it over
//! HTTP and passes responses through. Unreachable or non-JSON responses are
//! mapped to a service-unavailable error rather than a parse panic.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::models::EnrichStep;
use crate::pipeline::{PipelineError, Result};

/// Configuration for the agent service client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the agent service (default: http://localhost:3001)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key sent as X-API-Key
    #[serde(default)]
    pub api_key: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "http://localhost:3001".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Response from the agent service, passed through verbatim.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub status: u16,
    pub body: Value,
}

/// Seam for dispatching a single enrichment step to the remote service.
#[async_trait]
pub trait StepService: Send + Sync {
    async fn execute(&self, item_id: &str, step: EnrichStep) -> Result<AgentResponse>;
}

/// Request body for the single-step endpoint.
#[derive(Debug, Serialize)]
struct StepRequest<'a> {
    id: &'a str,
    step: &'a str,
}

/// HTTP client for the agent service.
pub struct AgentClient {
    config: AgentConfig,
    client: Client,
}

impl AgentClient {
    /// Create a new agent client with the given configuration.
    pub fn new(config: AgentConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::ServiceUnavailable {
                status: None,
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl StepService for AgentClient {
    async fn execute(&self, item_id: &str, step: EnrichStep) -> Result<AgentResponse> {
        let url = format!("{}/api/agents/enrich-single-step", self.config.endpoint);
        debug!(item_id, step = step.as_str(), %url, "dispatching enrichment step");

        let resp = self
            .client
            .post(&url)
            .header("X-API-Key", &self.config.api_key)
            .json(&StepRequest {
                id: item_id,
                step: step.as_str(),
            })
            .send()
            .await
            .map_err(|e| PipelineError::ServiceUnavailable {
                status: None,
                message: format!("agent service unreachable: {e}"),
            })?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| PipelineError::ServiceUnavailable {
                status: Some(status),
                message: format!("failed to read agent response: {e}"),
            })?;

        match serde_json::from_str::<Value>(&text) {
            Ok(body) => Ok(AgentResponse { status, body }),
            // HTML error page when the service is down, proxy errors, ...
            Err(_) => Err(PipelineError::ServiceUnavailable {
                status: Some(status),
                message: format!("agent service returned non-JSON: {}", preview(&text)),
            }),
        }
    }
}

/// Short, whitespace-collapsed preview of an unparseable response body.
fn preview(text: &str) -> String {
    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut end = collapsed.len().min(100);
    while end > 0 && !collapsed.is_char_boundary(end) {
        end -= 1;
    }
    if end < collapsed.len() {
        format!("{}...", &collapsed[..end])
    } else {
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_collapses_whitespace() {
        assert_eq!(preview("<html>\n  <body>down</body>\n</html>"), "<html> <body>down</body> </html>");
    }

    #[test]
    fn test_preview_truncates_long_bodies() {
        let long = "x".repeat(300);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.len(), 103);
    }

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.endpoint, "http://localhost:3001");
        assert_eq!(config.timeout_secs, 120);
    }
}
