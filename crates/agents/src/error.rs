use std::time::Duration;
use testforge_core::{AgentType, Operation};
use thiserror::Error;

/// Failure reported by a single worker.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Worker unavailable: {0}")]
    Unavailable(String),

    #[error("Worker failed: {0}")]
    Failed(String),

    /// The worker understood the request and refused it. Never replaced by a
    /// simulated result.
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl AgentError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No worker registered for agent type {0}")]
    UnregisteredAgent(AgentType),

    #[error("Operation {operation} is not supported by {agent}")]
    UnsupportedOperation {
        agent: AgentType,
        operation: Operation,
    },

    #[error("{agent}/{operation} timed out after {after:?}")]
    Timeout {
        agent: AgentType,
        operation: Operation,
        after: Duration,
    },

    #[error("{agent}/{operation} rejected: {reason}")]
    Rejected {
        agent: AgentType,
        operation: Operation,
        reason: String,
    },

    #[error("{agent}/{operation} failed: {source}")]
    Worker {
        agent: AgentType,
        operation: Operation,
        #[source]
        source: AgentError,
    },
}

impl DispatchError {
    /// Configuration errors abort the run instead of failing a single task.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnregisteredAgent(_) | Self::UnsupportedOperation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(DispatchError::UnregisteredAgent(AgentType::Api).is_configuration());
        assert!(DispatchError::UnsupportedOperation {
            agent: AgentType::Parser,
            operation: Operation::GenerateTests,
        }
        .is_configuration());

        let timeout = DispatchError::Timeout {
            agent: AgentType::Devops,
            operation: Operation::CreateDockerSetup,
            after: Duration::from_secs(300),
        };
        assert!(!timeout.is_configuration());
        assert_eq!(
            timeout.to_string(),
            "devops_agent/create_docker_setup timed out after 300s"
        );
    }

    #[test]
    fn test_rejection_detection() {
        assert!(AgentError::Rejected("quota".into()).is_rejection());
        assert!(!AgentError::Failed("boom".into()).is_rejection());
    }
}
