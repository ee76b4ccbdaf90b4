use async_trait::async_trait;
use testforge_core::{AgentType, Operation, Payload, TaskParameters};

use crate::error::{AgentError, Result};

/// A worker able to perform the operations of one [`AgentType`].
///
/// Results carry at least `operation` and `status`; parsing workers add
/// `parsed_data`.
#[async_trait]
pub trait Agent: Send + Sync {
    fn agent_type(&self) -> AgentType;

    async fn execute(&self, operation: Operation, params: &TaskParameters) -> Result<Payload>;
}

/// Stand-in registered when a worker's backend is not configured. Every call
/// fails as unavailable so the dispatch policy decides what happens.
pub struct UnavailableAgent {
    agent_type: AgentType,
    reason: String,
}

impl UnavailableAgent {
    pub fn new(agent_type: AgentType, reason: impl Into<String>) -> Self {
        Self {
            agent_type,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Agent for UnavailableAgent {
    fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    async fn execute(&self, _operation: Operation, _params: &TaskParameters) -> Result<Payload> {
        Err(AgentError::Unavailable(self.reason.clone()))
    }
}
