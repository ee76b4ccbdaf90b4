use serde::Serialize;
use serde_json::Value;
use testforge_core::{AgentType, Operation, Payload, Project, Status, Task};
use uuid::Uuid;

use crate::planner::PlanSummary;

/// Outcome of one executed task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub task_id: String,
    pub sequence: u32,
    pub agent_type: AgentType,
    pub operation: Operation,
    pub status: Status,
    pub simulated: bool,
    pub result: Payload,
    pub error_message: Option<String>,
}

impl From<&Task> for TaskReport {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            sequence: task.sequence,
            agent_type: task.agent_type,
            operation: task.operation,
            status: task.status,
            simulated: agents::simulation::is_simulated(&task.result),
            result: task.result.clone(),
            error_message: task.error_message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub project_id: Uuid,
    pub final_status: Status,
    pub tasks_completed_count: usize,
    pub total_task_count: usize,
    pub per_task_results: Vec<TaskReport>,
    /// `parsed_data` of the last parsing task that produced one.
    pub last_parsed_payload: Option<Value>,
    pub plan: PlanSummary,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.final_status == Status::Completed
    }

    /// First task that did not complete.
    pub fn failed_task(&self) -> Option<&TaskReport> {
        self.per_task_results
            .iter()
            .find(|t| t.status != Status::Completed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
}

impl TaskSummary {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut summary = Self {
            total: tasks.len(),
            ..Default::default()
        };
        for task in tasks {
            match task.status {
                Status::Pending => summary.pending += 1,
                Status::InProgress => summary.in_progress += 1,
                Status::Completed => summary.completed += 1,
                Status::Failed => summary.failed += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectStatus {
    pub project: Project,
    pub tasks: Vec<Task>,
    pub summary: TaskSummary,
}
