use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::Path;
use testforge_core::{Project, Task};
use tracing::info;
use uuid::Uuid;

use crate::error::DbError;
use crate::pool::{create_pool_at, run_migrations};
use crate::repositories::{ProjectRepository, Statistics, StatsRepository, TaskRepository};

/// Persistence facade over the project, task and statistics repositories.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    projects: ProjectRepository,
    tasks: TaskRepository,
    stats: StatsRepository,
}

impl Store {
    /// Opens the database at `path`, creating parent directories, the file and
    /// the schema when missing.
    pub async fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let pool = create_pool_at(path).await?;
        run_migrations(&pool).await?;
        info!(path = %path.display(), "Database ready");

        Ok(Self::from_pool(pool))
    }

    /// Wraps an already migrated pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            projects: ProjectRepository::new(pool.clone()),
            tasks: TaskRepository::new(pool.clone()),
            stats: StatsRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn save_project(&self, project: &Project) -> Result<(), DbError> {
        self.projects.save(project).await
    }

    pub async fn load_project(&self, id: Uuid) -> Result<Option<Project>, DbError> {
        self.projects.find_by_id(id).await
    }

    pub async fn load_all_projects(&self) -> Result<Vec<Project>, DbError> {
        self.projects.find_all().await
    }

    pub async fn delete_project(&self, id: Uuid) -> Result<bool, DbError> {
        self.projects.delete(id).await
    }

    pub async fn save_task(&self, task: &Task) -> Result<(), DbError> {
        self.tasks.save(task).await
    }

    pub async fn load_tasks_for_project(&self, project_id: Uuid) -> Result<Vec<Task>, DbError> {
        self.tasks.find_by_project(project_id).await
    }

    pub async fn get_statistics(&self) -> Result<Statistics, DbError> {
        self.stats.compute().await
    }

    pub async fn cleanup_finished_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let removed = self.projects.delete_finished_before(cutoff).await?;
        info!(removed, cutoff = %cutoff, "Cleaned up finished projects");
        Ok(removed)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
