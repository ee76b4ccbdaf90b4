use crate::error::DbError;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeMap;

/// Aggregate counts over the current store contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total_projects: u64,
    pub projects_by_status: BTreeMap<String, u64>,
    pub projects_by_type: BTreeMap<String, u64>,
    pub projects_by_language: BTreeMap<String, u64>,
    pub total_tasks: u64,
    pub tasks_by_status: BTreeMap<String, u64>,
}

#[derive(Clone)]
pub struct StatsRepository {
    pool: SqlitePool,
}

impl StatsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn compute(&self) -> Result<Statistics, DbError> {
        let projects_by_status = self.group_count("projects", "status").await?;
        let tasks_by_status = self.group_count("tasks", "status").await?;

        Ok(Statistics {
            total_projects: projects_by_status.values().sum(),
            projects_by_type: self.group_count("projects", "kind").await?,
            projects_by_language: self.group_count("projects", "language").await?,
            total_tasks: tasks_by_status.values().sum(),
            projects_by_status,
            tasks_by_status,
        })
    }

    async fn group_count(
        &self,
        table: &'static str,
        column: &'static str,
    ) -> Result<BTreeMap<String, u64>, DbError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(&format!(
            "SELECT {column}, COUNT(*) FROM {table} GROUP BY {column}"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(key, count)| (key, count.max(0) as u64))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::setup_test_db;
    use crate::{ProjectRepository, TaskRepository};
    use testforge_core::{Language, Operation, Project, ProjectKind, Status, Task, TaskParameters};

    #[tokio::test]
    async fn test_empty_store() {
        let (pool, _dir) = setup_test_db().await;
        let stats = StatsRepository::new(pool).compute().await.unwrap();

        assert_eq!(stats, Statistics::default());
    }

    #[tokio::test]
    async fn test_counts_by_dimension() {
        let (pool, _dir) = setup_test_db().await;
        let projects = ProjectRepository::new(pool.clone());
        let tasks = TaskRepository::new(pool.clone());

        let mut done = Project::new("a", ProjectKind::Api, Language::Java, "/tmp/a");
        done.set_status(Status::Completed);
        let pending = Project::new("b", ProjectKind::Full, Language::Python, "/tmp/b");
        let mut failed = Project::new("c", ProjectKind::Api, Language::Python, "/tmp/c");
        failed.set_status(Status::Failed);
        for p in [&done, &pending, &failed] {
            projects.save(p).await.unwrap();
        }

        let op = Operation::CreateProjectStructure;
        let mut t = Task::new(done.id, 0, op.agent(), op, TaskParameters::for_project(&done));
        t.complete(Default::default());
        tasks.save(&t).await.unwrap();

        let stats = StatsRepository::new(pool).compute().await.unwrap();
        assert_eq!(stats.total_projects, 3);
        assert_eq!(stats.projects_by_status.get("completed"), Some(&1));
        assert_eq!(stats.projects_by_status.get("pending"), Some(&1));
        assert_eq!(stats.projects_by_type.get("api"), Some(&2));
        assert_eq!(stats.projects_by_language.get("python"), Some(&2));
        assert_eq!(stats.total_tasks, 1);
        assert_eq!(stats.tasks_by_status.get("completed"), Some(&1));
        assert!(stats.tasks_by_status.get("failed").is_none());
    }
}
