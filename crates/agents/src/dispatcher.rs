use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use testforge_core::{AgentType, Operation, Payload, TaskParameters};
use tracing::{debug, error, warn};

use crate::agent::Agent;
use crate::error::{AgentError, DispatchError};
use crate::simulation::simulated_result;

/// What to do when a worker fails or times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// Replace the failure with a flagged simulated result.
    #[default]
    Simulate,
    /// Surface the failure to the caller.
    FailFast,
}

/// What to do with an operation the addressed agent does not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownOperation {
    #[default]
    Reject,
    /// Run the agent's primary operation instead, with a warning.
    UsePrimary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPolicy {
    pub fallback: FallbackMode,
    pub unknown_operation: UnknownOperation,
    pub timeout: Duration,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            fallback: FallbackMode::Simulate,
            unknown_operation: UnknownOperation::Reject,
            timeout: Duration::from_secs(300),
        }
    }
}

impl DispatchPolicy {
    pub fn with_fallback(mut self, fallback: FallbackMode) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_unknown_operation(mut self, unknown_operation: UnknownOperation) -> Self {
        self.unknown_operation = unknown_operation;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Routes `(agent_type, operation)` pairs to registered workers.
pub struct Dispatcher {
    agents: HashMap<AgentType, Arc<dyn Agent>>,
    policy: DispatchPolicy,
}

impl Dispatcher {
    pub fn new(policy: DispatchPolicy) -> Self {
        Self {
            agents: HashMap::new(),
            policy,
        }
    }

    /// Registers `agent` under its own type, replacing any previous worker.
    pub fn register(&mut self, agent: Arc<dyn Agent>) {
        self.agents.insert(agent.agent_type(), agent);
    }

    pub fn with_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.register(agent);
        self
    }

    pub fn is_registered(&self, agent_type: AgentType) -> bool {
        self.agents.contains_key(&agent_type)
    }

    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    /// Fails with the error `invoke` would raise for a miswired pair, without
    /// calling any worker.
    pub fn check(&self, agent_type: AgentType, operation: Operation) -> Result<(), DispatchError> {
        if !self.is_registered(agent_type) {
            return Err(DispatchError::UnregisteredAgent(agent_type));
        }
        if operation.agent() != agent_type
            && self.policy.unknown_operation == UnknownOperation::Reject
        {
            return Err(DispatchError::UnsupportedOperation {
                agent: agent_type,
                operation,
            });
        }
        Ok(())
    }

    pub async fn invoke(
        &self,
        agent_type: AgentType,
        operation: Operation,
        params: &TaskParameters,
    ) -> Result<Payload, DispatchError> {
        let Some(agent) = self.agents.get(&agent_type) else {
            error!(agent = %agent_type, operation = %operation, "No worker registered");
            return Err(DispatchError::UnregisteredAgent(agent_type));
        };

        let operation = self.resolve_operation(agent_type, operation)?;
        debug!(agent = %agent_type, operation = %operation, "Dispatching");

        let outcome = tokio::time::timeout(self.policy.timeout, agent.execute(operation, params)).await;

        match outcome {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(AgentError::Rejected(reason))) => {
                warn!(agent = %agent_type, operation = %operation, reason = %reason, "Worker rejected task");
                Err(DispatchError::Rejected {
                    agent: agent_type,
                    operation,
                    reason,
                })
            }
            Ok(Err(source)) => match self.policy.fallback {
                FallbackMode::Simulate => {
                    error!(
                        agent = %agent_type,
                        operation = %operation,
                        error = %source,
                        "Worker failed, falling back to simulation"
                    );
                    Ok(simulated_result(agent_type, operation, params, &source.to_string()))
                }
                FallbackMode::FailFast => Err(DispatchError::Worker {
                    agent: agent_type,
                    operation,
                    source,
                }),
            },
            Err(_) => {
                let timeout = DispatchError::Timeout {
                    agent: agent_type,
                    operation,
                    after: self.policy.timeout,
                };
                match self.policy.fallback {
                    FallbackMode::Simulate => {
                        error!(
                            agent = %agent_type,
                            operation = %operation,
                            timeout_secs = self.policy.timeout.as_secs(),
                            "Worker timed out, falling back to simulation"
                        );
                        Ok(simulated_result(agent_type, operation, params, &timeout.to_string()))
                    }
                    FallbackMode::FailFast => Err(timeout),
                }
            }
        }
    }

    fn resolve_operation(
        &self,
        agent_type: AgentType,
        operation: Operation,
    ) -> Result<Operation, DispatchError> {
        if operation.agent() == agent_type {
            return Ok(operation);
        }

        match self.policy.unknown_operation {
            UnknownOperation::Reject => Err(DispatchError::UnsupportedOperation {
                agent: agent_type,
                operation,
            }),
            UnknownOperation::UsePrimary => {
                let primary = agent_type.primary_operation();
                warn!(
                    agent = %agent_type,
                    requested = %operation,
                    rerouted = %primary,
                    "Operation not owned by agent, using its primary operation"
                );
                Ok(primary)
            }
        }
    }
}
