use testforge_core::{Project, Status, Task};

use crate::error::{OrchestratorError, Result};

/// Lifecycle shared by projects and tasks:
/// `Pending -> InProgress -> {Completed, Failed}`.
pub struct LifecycleStateMachine;

impl LifecycleStateMachine {
    pub fn validate_transition(from: &Status, to: &Status) -> Result<()> {
        let allowed = Self::allowed_transitions(from);

        if allowed.contains(to) {
            Ok(())
        } else {
            Err(OrchestratorError::InvalidTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }

    fn allowed_transitions(from: &Status) -> Vec<Status> {
        match from {
            Status::Pending => vec![Status::InProgress],
            Status::InProgress => vec![Status::Completed, Status::Failed],
            Status::Completed | Status::Failed => vec![],
        }
    }

    pub fn can_transition(from: &Status, to: &Status) -> bool {
        Self::validate_transition(from, to).is_ok()
    }

    /// Moves `project` to `to`, bumping `updated_at`.
    pub fn transition_project(project: &mut Project, to: Status) -> Result<()> {
        Self::validate_transition(&project.status, &to)?;
        project.set_status(to);
        Ok(())
    }

    pub fn start_task(task: &mut Task) -> Result<()> {
        Self::validate_transition(&task.status, &Status::InProgress)?;
        task.start();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testforge_core::{Language, ProjectKind};

    #[test]
    fn test_valid_transitions() {
        assert!(LifecycleStateMachine::can_transition(
            &Status::Pending,
            &Status::InProgress
        ));
        assert!(LifecycleStateMachine::can_transition(
            &Status::InProgress,
            &Status::Completed
        ));
        assert!(LifecycleStateMachine::can_transition(
            &Status::InProgress,
            &Status::Failed
        ));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!LifecycleStateMachine::can_transition(
            &Status::Pending,
            &Status::Completed
        ));
        assert!(!LifecycleStateMachine::can_transition(
            &Status::InProgress,
            &Status::Pending
        ));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [Status::Completed, Status::Failed] {
            for to in Status::ALL {
                assert!(!LifecycleStateMachine::can_transition(&terminal, &to));
            }
        }
    }

    #[test]
    fn test_transition_project_rejects_restart() {
        let mut project = Project::new("p", ProjectKind::Api, Language::Java, "/tmp/p");
        LifecycleStateMachine::transition_project(&mut project, Status::InProgress).unwrap();
        LifecycleStateMachine::transition_project(&mut project, Status::Completed).unwrap();

        let err = LifecycleStateMachine::transition_project(&mut project, Status::InProgress)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid state transition from completed to in_progress"
        );
        assert_eq!(project.status, Status::Completed);
    }
}
