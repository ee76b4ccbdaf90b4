use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use testforge_core::{AgentType, Operation, Payload, TaskParameters};
use tracing::debug;

use crate::agent::Agent;
use crate::error::{AgentError, Result};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    agent: AgentType,
    operation: Operation,
    parameters: &'a TaskParameters,
}

/// Client for the code-generation service.
pub struct GenerationClient {
    base_url: String,
    client: Client,
}

impl GenerationClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn generate(
        &self,
        agent: AgentType,
        operation: Operation,
        parameters: &TaskParameters,
    ) -> Result<Payload> {
        let request = GenerateRequest {
            agent,
            operation,
            parameters,
        };

        debug!(agent = %agent, operation = %operation, url = %self.base_url, "Requesting generation");

        let response = self
            .client
            .post(format!("{}/v1/generate", self.base_url))
            .json(&request)
            .send()
            .await?;

        let payload: Payload = self.handle_response(response).await?;

        if payload.get("status").and_then(Value::as_str) == Some("rejected") {
            let reason = payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("rejected by generation service");
            return Err(AgentError::Rejected(reason.to_string()));
        }

        Ok(payload)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::InvalidResponse(format!(
                "Status {}: {}",
                status, body
            )));
        }

        let body = response.json().await?;
        Ok(body)
    }
}

/// Agent that forwards its operations to the generation service.
pub struct RemoteAgent {
    agent_type: AgentType,
    client: Arc<GenerationClient>,
}

impl RemoteAgent {
    pub fn new(agent_type: AgentType, client: Arc<GenerationClient>) -> Self {
        Self { agent_type, client }
    }
}

#[async_trait]
impl Agent for RemoteAgent {
    fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    async fn execute(&self, operation: Operation, params: &TaskParameters) -> Result<Payload> {
        self.client.generate(self.agent_type, operation, params).await
    }
}
