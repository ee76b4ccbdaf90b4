pub mod engine;
pub mod error;
pub mod paths;
pub mod planner;
pub mod report;
pub mod state_machine;

pub use engine::{EngineConfig, ExecutionEngine, NewProject};
pub use error::{OrchestratorError, Result};
pub use paths::{check_output_location, default_protected_roots};
pub use planner::{Complexity, DefaultPlanner, Plan, PlanSummary, PlannedTask, TaskPlanner};
pub use report::{ProjectStatus, RunReport, TaskReport, TaskSummary};
pub use state_machine::LifecycleStateMachine;
