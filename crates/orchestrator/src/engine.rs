use agents::Dispatcher;
use db::Store;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use testforge_core::{Language, Project, ProjectKind, Status, Task, PARSED_DATA_KEY};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{OrchestratorError, Result};
use crate::paths::{absolutize, check_output_location};
use crate::planner::{DefaultPlanner, TaskPlanner};
use crate::report::{ProjectStatus, RunReport, TaskReport, TaskSummary};
use crate::state_machine::LifecycleStateMachine;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directories an output location may not equal or be nested under.
    pub protected_roots: Vec<PathBuf>,
}

impl EngineConfig {
    pub fn new(protected_roots: Vec<PathBuf>) -> Self {
        Self { protected_roots }
    }

    pub fn with_protected_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.protected_roots.push(root.into());
        self
    }
}

/// Request to create a project.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub kind: ProjectKind,
    pub language: Language,
    pub output_location: PathBuf,
    pub spec_file: Option<PathBuf>,
}

impl NewProject {
    pub fn new(
        name: impl Into<String>,
        kind: ProjectKind,
        language: Language,
        output_location: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            language,
            output_location: output_location.into(),
            spec_file: None,
        }
    }

    pub fn with_spec_file(mut self, spec_file: impl Into<PathBuf>) -> Self {
        self.spec_file = Some(spec_file.into());
        self
    }
}

pub struct ExecutionEngine {
    store: Store,
    dispatcher: Arc<Dispatcher>,
    planner: Arc<dyn TaskPlanner>,
    config: EngineConfig,
}

impl ExecutionEngine {
    pub fn new(store: Store, dispatcher: Arc<Dispatcher>, config: EngineConfig) -> Self {
        Self {
            store,
            dispatcher,
            planner: Arc::new(DefaultPlanner::new()),
            config,
        }
    }

    pub fn with_planner(mut self, planner: Arc<dyn TaskPlanner>) -> Self {
        self.planner = planner;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Validates the request, then persists a new `Pending` project. Nothing is
    /// written when validation fails.
    pub async fn create_project(&self, request: NewProject) -> Result<Project> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(OrchestratorError::configuration("project name must not be blank"));
        }

        let output_location =
            check_output_location(&request.output_location, &self.config.protected_roots)?;

        let spec_file = match request.spec_file {
            Some(path) => {
                let path = absolutize(&path)?;
                if !tokio::fs::try_exists(&path).await? {
                    return Err(OrchestratorError::SpecFileNotFound(path));
                }
                Some(path)
            }
            None => None,
        };

        let mut project = Project::new(name, request.kind, request.language, output_location);
        if let Some(spec) = spec_file {
            project = project.with_spec_file(spec.to_string_lossy());
        }

        self.store.save_project(&project).await?;
        info!(
            project_id = %project.id,
            name = %project.name,
            kind = %project.kind,
            language = %project.language,
            output = %project.output_location.display(),
            "Created project"
        );
        Ok(project)
    }

    /// Loads a project and runs it.
    pub async fn run_by_id(&self, project_id: Uuid) -> Result<RunReport> {
        let mut project = self
            .store
            .load_project(project_id)
            .await?
            .ok_or(OrchestratorError::ProjectNotFound(project_id))?;
        self.run(&mut project).await
    }

    /// Executes the project's plan to completion or first failure. Task failures
    /// are reported in the returned [`RunReport`]. A planned agent with no
    /// registered worker, or an operation its worker does not accept, is
    /// rejected before anything is persisted. Planning and
    /// persistence errors are returned as `Err` after the project is marked
    /// failed where possible.
    pub async fn run(&self, project: &mut Project) -> Result<RunReport> {
        LifecycleStateMachine::validate_transition(&project.status, &Status::InProgress)?;

        let plan = self.planner.plan(project);
        if let Ok(plan) = &plan {
            if let Some(err) = plan
                .tasks
                .iter()
                .find_map(|t| self.dispatcher.check(t.agent_type, t.operation).err())
            {
                error!(project_id = %project.id, error = %err, "Project cannot run");
                return Err(OrchestratorError::Configuration(err.to_string()));
            }
        }

        LifecycleStateMachine::transition_project(project, Status::InProgress)?;
        if let Err(e) = self.store.save_project(project).await {
            return Err(self.abort(project, e.into()).await);
        }
        info!(project_id = %project.id, name = %project.name, "Project started");

        let plan = match plan {
            Ok(plan) => plan,
            Err(e) => return Err(self.abort(project, e).await),
        };

        let total_tasks = plan.len();
        debug!(project_id = %project.id, total_tasks, "Plan ready");

        let mut reports = Vec::with_capacity(total_tasks);
        let mut parsed_data: Option<Value> = None;
        let mut failed = false;

        for planned in plan.tasks {
            let mut task = planned.into_task(project);
            task.parameters.parsed_data = parsed_data.clone();
            if let Err(e) = LifecycleStateMachine::start_task(&mut task) {
                return Err(self.abort(project, e).await);
            }

            info!(
                project_id = %project.id,
                task_id = %task.id,
                agent = %task.agent_type,
                operation = %task.operation,
                "Executing task"
            );

            let fatal = self.execute_task(&mut task).await;

            if let Err(e) = self.store.save_task(&task).await {
                return Err(self.abort(project, e.into()).await);
            }
            if let Some(err) = fatal {
                return Err(self.abort(project, err).await);
            }

            if task.status == Status::Completed {
                if task.operation.is_parsing() {
                    if let Some(data) = task.result.get(PARSED_DATA_KEY) {
                        parsed_data = Some(data.clone());
                    }
                }
                info!(task_id = %task.id, "Task completed");
                reports.push(TaskReport::from(&task));
            } else {
                warn!(
                    task_id = %task.id,
                    error = task.error_message.as_deref().unwrap_or_default(),
                    "Task failed, stopping plan"
                );
                reports.push(TaskReport::from(&task));
                failed = true;
                break;
            }
        }

        let final_status = if failed { Status::Failed } else { Status::Completed };
        let mut finished = project.clone();
        LifecycleStateMachine::transition_project(&mut finished, final_status)?;
        if let Err(e) = self.store.save_project(&finished).await {
            return Err(self.abort(project, e.into()).await);
        }
        *project = finished;

        let tasks_completed_count = reports
            .iter()
            .filter(|r| r.status == Status::Completed)
            .count();
        info!(
            project_id = %project.id,
            status = %final_status,
            tasks_completed_count,
            total_tasks,
            "Project finished"
        );

        Ok(RunReport {
            project_id: project.id,
            final_status,
            tasks_completed_count,
            total_task_count: total_tasks,
            per_task_results: reports,
            last_parsed_payload: parsed_data,
            plan: plan.summary,
        })
    }

    /// Dispatches `task` and moves it to a terminal state. Returns the error
    /// that must abort the whole run, if any.
    async fn execute_task(&self, task: &mut Task) -> Option<OrchestratorError> {
        let outcome = self
            .dispatcher
            .invoke(task.agent_type, task.operation, &task.parameters)
            .await;

        match outcome {
            Ok(result) => {
                match reported_failure(&result) {
                    Some(message) => task.fail(message),
                    None => task.complete(result),
                }
                None
            }
            Err(e) if e.is_configuration() => {
                error!(task_id = %task.id, error = %e, "Dispatch misconfigured");
                task.fail(e.to_string());
                Some(OrchestratorError::Configuration(e.to_string()))
            }
            Err(e) => {
                error!(task_id = %task.id, error = %e, "Dispatch failed");
                task.fail(e.to_string());
                None
            }
        }
    }

    /// Marks the project failed on a best-effort basis and hands back `err`.
    async fn abort(&self, project: &mut Project, err: OrchestratorError) -> OrchestratorError {
        error!(project_id = %project.id, error = %err, "Project run aborted");

        if LifecycleStateMachine::transition_project(project, Status::Failed).is_ok() {
            if let Err(save_err) = self.store.save_project(project).await {
                warn!(project_id = %project.id, error = %save_err, "Could not persist failed status");
            }
        }
        err
    }

    /// Project with its tasks and per-status counts; `None` for an unknown id.
    pub async fn get_status(&self, project_id: Uuid) -> Result<Option<ProjectStatus>> {
        let Some(project) = self.store.load_project(project_id).await? else {
            return Ok(None);
        };
        let tasks = self.store.load_tasks_for_project(project_id).await?;

        Ok(Some(ProjectStatus {
            summary: TaskSummary::from_tasks(&tasks),
            project,
            tasks,
        }))
    }

    /// All projects, most recently created first.
    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.store.load_all_projects().await?)
    }
}

/// A worker result whose `status` is `failed` or `error` counts as a failure.
fn reported_failure(result: &testforge_core::Payload) -> Option<String> {
    let status = result.get("status").and_then(Value::as_str)?;
    if !matches!(status, "failed" | "error") {
        return None;
    }

    let detail = ["error", "message"]
        .iter()
        .find_map(|key| result.get(*key).and_then(Value::as_str))
        .unwrap_or("no details given");
    Some(format!("worker reported status {status}: {detail}"))
}
