use serde::Serialize;
use serde_json::json;
use testforge_core::{AgentType, Operation, Project, Task, TaskParameters};

use crate::error::Result;

/// Parameter key carrying a task's estimated duration.
pub const ESTIMATED_MINUTES_KEY: &str = "estimated_duration_minutes";

/// One step of a plan, before it becomes a [`Task`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedTask {
    pub sequence: u32,
    pub agent_type: AgentType,
    pub operation: Operation,
    pub description: String,
    pub dependencies: Vec<Operation>,
    pub estimated_minutes: u32,
    pub spec_file_path: Option<String>,
}

impl PlannedTask {
    pub fn into_task(self, project: &Project) -> Task {
        let mut params = TaskParameters::for_project(project)
            .with_description(self.description)
            .with_dependencies(self.dependencies)
            .with_spec_file(self.spec_file_path);
        params
            .extra
            .insert(ESTIMATED_MINUTES_KEY.into(), json!(self.estimated_minutes));

        Task::new(
            project.id,
            self.sequence,
            self.agent_type,
            self.operation,
            params,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub required_agents: Vec<AgentType>,
    pub total_estimated_minutes: u32,
    pub complexity: Complexity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub tasks: Vec<PlannedTask>,
    pub summary: PlanSummary,
}

impl Plan {
    /// Builds a plan and derives its summary from the tasks.
    pub fn new(tasks: Vec<PlannedTask>) -> Self {
        let mut required_agents = Vec::new();
        for task in &tasks {
            if !required_agents.contains(&task.agent_type) {
                required_agents.push(task.agent_type);
            }
        }
        let complexity = if tasks.iter().any(|t| t.operation.is_parsing()) {
            Complexity::Medium
        } else {
            Complexity::Simple
        };

        Self {
            summary: PlanSummary {
                required_agents,
                total_estimated_minutes: tasks.iter().map(|t| t.estimated_minutes).sum(),
                complexity,
            },
            tasks,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Turns a project into an ordered task list.
pub trait TaskPlanner: Send + Sync {
    fn plan(&self, project: &Project) -> Result<Plan>;
}

/// Fixed plan: optional spec parsing, project structure, then environment setup.
#[derive(Debug, Default, Clone)]
pub struct DefaultPlanner;

impl DefaultPlanner {
    pub fn new() -> Self {
        Self
    }
}

impl TaskPlanner for DefaultPlanner {
    fn plan(&self, project: &Project) -> Result<Plan> {
        let spec_file = project.spec_file();
        let mut steps: Vec<(Operation, String, Vec<Operation>, u32)> = Vec::new();

        if spec_file.is_some() {
            steps.push((
                Operation::ParseApiSpecification,
                "Parse API specification and extract endpoints".into(),
                vec![],
                3,
            ));
        }
        steps.push((
            Operation::CreateProjectStructure,
            if spec_file.is_some() {
                "Create project structure with parsed API data".into()
            } else {
                "Create project structure".into()
            },
            if spec_file.is_some() {
                vec![Operation::ParseApiSpecification]
            } else {
                vec![]
            },
            5,
        ));
        steps.push((
            Operation::CreateDockerSetup,
            "Setup Docker environment".into(),
            vec![Operation::CreateProjectStructure],
            4,
        ));

        let tasks = steps
            .into_iter()
            .enumerate()
            .map(|(i, (operation, description, dependencies, estimated_minutes))| {
                PlannedTask {
                    sequence: i as u32,
                    agent_type: operation.agent(),
                    operation,
                    description,
                    dependencies,
                    estimated_minutes,
                    spec_file_path: operation
                        .is_parsing()
                        .then(|| spec_file.map(str::to_string))
                        .flatten(),
                }
            })
            .collect();

        Ok(Plan::new(tasks))
    }
}
