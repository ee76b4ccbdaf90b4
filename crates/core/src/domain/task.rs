use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use uuid::Uuid;

use super::agent::{AgentType, Operation};
use super::project::{Language, Project, ProjectKind};
use super::status::Status;

/// Open-ended JSON object used for metadata and agent results.
pub type Payload = serde_json::Map<String, Value>;

/// Parameter key under which the latest parsing output is threaded into later tasks.
pub const PARSED_DATA_KEY: &str = "parsed_data";

/// Inputs handed to an agent. Everything an agent needs travels here, so a task
/// can be executed without further lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskParameters {
    pub project_id: Uuid,
    pub project_name: String,
    pub project_type: ProjectKind,
    pub language: Language,
    pub output_path: PathBuf,
    #[serde(default)]
    pub description: String,
    /// Operations this task logically requires. Informational only.
    #[serde(default)]
    pub dependencies: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_data: Option<Value>,
    #[serde(flatten)]
    pub extra: Payload,
}

impl TaskParameters {
    pub fn for_project(project: &Project) -> Self {
        Self {
            project_id: project.id,
            project_name: project.name.clone(),
            project_type: project.kind,
            language: project.language,
            output_path: project.output_location.clone(),
            description: String::new(),
            dependencies: Vec::new(),
            spec_file_path: None,
            parsed_data: None,
            extra: Payload::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<Operation>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_spec_file(mut self, spec_file_path: Option<String>) -> Self {
        self.spec_file_path = spec_file_path;
        self
    }
}

/// One step of a project's plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub project_id: Uuid,
    pub sequence: u32,
    pub agent_type: AgentType,
    pub operation: Operation,
    pub parameters: TaskParameters,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: Payload,
    pub error_message: Option<String>,
}

impl Task {
    pub fn new(
        project_id: Uuid,
        sequence: u32,
        agent_type: AgentType,
        operation: Operation,
        parameters: TaskParameters,
    ) -> Self {
        Self {
            id: Self::id_for(project_id, sequence),
            project_id,
            sequence,
            agent_type,
            operation,
            parameters,
            status: Status::default(),
            created_at: Utc::now(),
            completed_at: None,
            result: Payload::new(),
            error_message: None,
        }
    }

    /// Task ids are `<project id>-task-<n>` with `n` counted from 1.
    pub fn id_for(project_id: Uuid, sequence: u32) -> String {
        format!("{}-task-{}", project_id, sequence + 1)
    }

    pub fn start(&mut self) {
        self.status = Status::InProgress;
    }

    pub fn complete(&mut self, result: Payload) {
        self.status = Status::Completed;
        self.completed_at = Some(Utc::now());
        self.result = result;
        self.error_message = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = Status::Failed;
        self.completed_at = Some(Utc::now());
        self.result = Payload::new();
        self.error_message = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_project() -> Project {
        Project::new("orders", ProjectKind::Api, Language::Java, "/tmp/orders")
    }

    #[test]
    fn test_task_creation() {
        let project = sample_project();
        let params = TaskParameters::for_project(&project);
        let task = Task::new(
            project.id,
            0,
            AgentType::Api,
            Operation::CreateProjectStructure,
            params,
        );

        assert_eq!(task.id, format!("{}-task-1", project.id));
        assert_eq!(task.status, Status::Pending);
        assert!(task.completed_at.is_none());
        assert!(task.result.is_empty());
    }

    #[test]
    fn test_complete_and_fail_are_exclusive() {
        let project = sample_project();
        let mut task = Task::new(
            project.id,
            1,
            AgentType::Devops,
            Operation::CreateDockerSetup,
            TaskParameters::for_project(&project),
        );

        let mut result = Payload::new();
        result.insert("status".into(), json!("completed"));
        task.complete(result);
        assert_eq!(task.status, Status::Completed);
        assert!(task.completed_at.is_some());
        assert!(task.error_message.is_none());

        task.fail("boom");
        assert_eq!(task.status, Status::Failed);
        assert!(task.result.is_empty());
        assert_eq!(task.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_parameters_serialize_with_extra_fields() {
        let project = sample_project();
        let mut params = TaskParameters::for_project(&project)
            .with_description("Create project structure")
            .with_dependencies(vec![Operation::ParseApiSpecification]);
        params.extra.insert("framework".into(), json!("maven"));

        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["project_type"], "api");
        assert_eq!(value["dependencies"], json!(["parse_api_specification"]));
        assert_eq!(value["framework"], "maven");
        assert!(value.get("parsed_data").is_none());

        let back: TaskParameters = serde_json::from_value(value).unwrap();
        assert_eq!(back, params);
    }
}
