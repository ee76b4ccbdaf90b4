use crate::error::DbError;
use crate::models::TaskRow;
use sqlx::SqlitePool;
use testforge_core::Task;
use tracing::debug;
use uuid::Uuid;

const TASK_COLUMNS: &str = "id, project_id, sequence, agent_type, operation, parameters, status, \
     created_at, completed_at, result, error_message";

#[derive(Clone)]
pub struct TaskRepository {
    pool: SqlitePool,
}

impl TaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts or updates by id. The owning project must already exist.
    pub async fn save(&self, task: &Task) -> Result<(), DbError> {
        let row = TaskRow::from_domain(task)?;

        sqlx::query(
            r#"
            INSERT INTO tasks (id, project_id, sequence, agent_type, operation, parameters, status, created_at, completed_at, result, error_message)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                project_id = excluded.project_id,
                sequence = excluded.sequence,
                agent_type = excluded.agent_type,
                operation = excluded.operation,
                parameters = excluded.parameters,
                status = excluded.status,
                created_at = excluded.created_at,
                completed_at = excluded.completed_at,
                result = excluded.result,
                error_message = excluded.error_message
            "#,
        )
        .bind(&row.id)
        .bind(&row.project_id)
        .bind(row.sequence)
        .bind(&row.agent_type)
        .bind(&row.operation)
        .bind(&row.parameters)
        .bind(&row.status)
        .bind(&row.created_at)
        .bind(&row.completed_at)
        .bind(&row.result)
        .bind(&row.error_message)
        .execute(&self.pool)
        .await?;

        debug!(task_id = %task.id, status = %task.status, "Saved task");
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Task>, DbError> {
        let row: Option<TaskRow> =
            sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TaskRow::into_domain).transpose()
    }

    /// Ordered by creation time, plan sequence breaking ties.
    pub async fn find_by_project(&self, project_id: Uuid) -> Result<Vec<Task>, DbError> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ? ORDER BY created_at, sequence"
        ))
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TaskRow::into_domain).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::setup_test_db;
    use crate::ProjectRepository;
    use serde_json::json;
    use testforge_core::{
        AgentType, Language, Operation, Payload, Project, ProjectKind, Status, TaskParameters,
    };

    async fn saved_project(pool: &SqlitePool) -> Project {
        let project = Project::new("billing", ProjectKind::Api, Language::Python, "/tmp/billing");
        ProjectRepository::new(pool.clone()).save(&project).await.unwrap();
        project
    }

    fn task(project: &Project, sequence: u32, op: Operation) -> Task {
        let params = TaskParameters::for_project(project).with_description(op.as_str());
        Task::new(project.id, sequence, op.agent(), op, params)
    }

    #[tokio::test]
    async fn test_save_and_find_task() {
        let (pool, _dir) = setup_test_db().await;
        let project = saved_project(&pool).await;
        let repo = TaskRepository::new(pool);

        let mut t = task(&project, 0, Operation::ParseApiSpecification);
        t.parameters.spec_file_path = Some("/specs/billing.json".into());
        let mut result = Payload::new();
        result.insert("parsed_data".into(), json!({"endpoints": []}));
        t.complete(result);
        repo.save(&t).await.unwrap();

        let found = repo.find_by_id(&t.id).await.unwrap().unwrap();
        assert_eq!(found, t);
        assert_eq!(found.agent_type, AgentType::Parser);
    }

    #[tokio::test]
    async fn test_failed_task_round_trip() {
        let (pool, _dir) = setup_test_db().await;
        let project = saved_project(&pool).await;
        let repo = TaskRepository::new(pool);

        let mut t = task(&project, 0, Operation::CreateProjectStructure);
        t.fail("generation service returned 502");
        repo.save(&t).await.unwrap();

        let found = repo.find_by_id(&t.id).await.unwrap().unwrap();
        assert_eq!(found.status, Status::Failed);
        assert!(found.result.is_empty());
        assert_eq!(found.error_message.as_deref(), Some("generation service returned 502"));
    }

    #[tokio::test]
    async fn test_tasks_ordered_by_creation_then_sequence() {
        let (pool, _dir) = setup_test_db().await;
        let project = saved_project(&pool).await;
        let repo = TaskRepository::new(pool);

        let first = task(&project, 0, Operation::CreateProjectStructure);
        let mut second = task(&project, 1, Operation::CreateDockerSetup);
        second.created_at = first.created_at;
        repo.save(&second).await.unwrap();
        repo.save(&first).await.unwrap();

        let ops: Vec<_> = repo
            .find_by_project(project.id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.operation)
            .collect();
        assert_eq!(
            ops,
            vec![Operation::CreateProjectStructure, Operation::CreateDockerSetup]
        );
    }

    #[tokio::test]
    async fn test_task_requires_existing_project() {
        let (pool, _dir) = setup_test_db().await;
        let repo = TaskRepository::new(pool);

        let orphan = Project::new("orphan", ProjectKind::Ui, Language::Java, "/tmp/orphan");
        let err = repo
            .save(&task(&orphan, 0, Operation::GenerateTests))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Sqlx(_)));
    }

    #[tokio::test]
    async fn test_deleting_project_cascades() {
        let (pool, _dir) = setup_test_db().await;
        let project = saved_project(&pool).await;
        let repo = TaskRepository::new(pool.clone());

        repo.save(&task(&project, 0, Operation::CreateProjectStructure))
            .await
            .unwrap();
        repo.save(&task(&project, 1, Operation::CreateDockerSetup))
            .await
            .unwrap();

        assert!(ProjectRepository::new(pool).delete(project.id).await.unwrap());
        assert!(repo.find_by_project(project.id).await.unwrap().is_empty());
    }
}
