use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoreError;

/// Worker families a task can be dispatched to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgentType {
    #[serde(rename = "parser_agent")]
    Parser,
    #[serde(rename = "api_agent")]
    Api,
    #[serde(rename = "devops_agent")]
    Devops,
}

impl AgentType {
    pub const ALL: [AgentType; 3] = [AgentType::Parser, AgentType::Api, AgentType::Devops];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parser => "parser_agent",
            Self::Api => "api_agent",
            Self::Devops => "devops_agent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "parser_agent" => Some(Self::Parser),
            "api_agent" => Some(Self::Api),
            "devops_agent" => Some(Self::Devops),
            _ => None,
        }
    }

    /// Operation a worker of this type performs when asked for one it does not own
    /// and the dispatch policy allows rerouting.
    pub fn primary_operation(&self) -> Operation {
        match self {
            Self::Parser => Operation::ParseApiSpecification,
            Self::Api => Operation::CreateProjectStructure,
            Self::Devops => Operation::CreateDockerSetup,
        }
    }

    pub fn operations(&self) -> Vec<Operation> {
        Operation::ALL
            .into_iter()
            .filter(|op| op.agent() == *self)
            .collect()
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::unknown("agent type", s))
    }
}

/// The closed set of operations agents understand. Each operation belongs to
/// exactly one [`AgentType`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ParseApiSpecification,
    CreateProjectStructure,
    GenerateTests,
    CreateDocumentation,
    CreateDockerSetup,
    SetupEnvironment,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::ParseApiSpecification,
        Operation::CreateProjectStructure,
        Operation::GenerateTests,
        Operation::CreateDocumentation,
        Operation::CreateDockerSetup,
        Operation::SetupEnvironment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseApiSpecification => "parse_api_specification",
            Self::CreateProjectStructure => "create_project_structure",
            Self::GenerateTests => "generate_tests",
            Self::CreateDocumentation => "create_documentation",
            Self::CreateDockerSetup => "create_docker_setup",
            Self::SetupEnvironment => "setup_environment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "parse_api_specification" => Some(Self::ParseApiSpecification),
            "create_project_structure" => Some(Self::CreateProjectStructure),
            "generate_tests" => Some(Self::GenerateTests),
            "create_documentation" => Some(Self::CreateDocumentation),
            "create_docker_setup" => Some(Self::CreateDockerSetup),
            "setup_environment" => Some(Self::SetupEnvironment),
            _ => None,
        }
    }

    pub fn agent(&self) -> AgentType {
        match self {
            Self::ParseApiSpecification => AgentType::Parser,
            Self::CreateProjectStructure | Self::GenerateTests | Self::CreateDocumentation => {
                AgentType::Api
            }
            Self::CreateDockerSetup | Self::SetupEnvironment => AgentType::Devops,
        }
    }

    /// Parsing operations produce `parsed_data` that later tasks consume.
    pub fn is_parsing(&self) -> bool {
        matches!(self, Self::ParseApiSpecification)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::unknown("operation", s))
    }
}
