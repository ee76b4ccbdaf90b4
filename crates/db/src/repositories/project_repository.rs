use crate::error::DbError;
use crate::models::{encode_timestamp, ProjectRow};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use testforge_core::{Project, Status};
use tracing::debug;
use uuid::Uuid;

const PROJECT_COLUMNS: &str =
    "id, name, kind, language, output_location, status, created_at, updated_at, metadata";

#[derive(Clone)]
pub struct ProjectRepository {
    pool: SqlitePool,
}

impl ProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts or updates by id. An update never touches the project's tasks.
    pub async fn save(&self, project: &Project) -> Result<(), DbError> {
        let row = ProjectRow::from_domain(project)?;

        sqlx::query(
            r#"
            INSERT INTO projects (id, name, kind, language, output_location, status, created_at, updated_at, metadata)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                kind = excluded.kind,
                language = excluded.language,
                output_location = excluded.output_location,
                status = excluded.status,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                metadata = excluded.metadata
            "#,
        )
        .bind(&row.id)
        .bind(&row.name)
        .bind(&row.kind)
        .bind(&row.language)
        .bind(&row.output_location)
        .bind(&row.status)
        .bind(&row.created_at)
        .bind(&row.updated_at)
        .bind(&row.metadata)
        .execute(&self.pool)
        .await?;

        debug!(project_id = %project.id, status = %project.status, "Saved project");
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>, DbError> {
        let row: Option<ProjectRow> =
            sqlx::query_as(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(ProjectRow::into_domain).transpose()
    }

    /// Most recently created first.
    pub async fn find_all(&self) -> Result<Vec<Project>, DbError> {
        let rows: Vec<ProjectRow> = sqlx::query_as(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ProjectRow::into_domain).collect()
    }

    /// Removes the project and its tasks in one transaction. Returns `false` when
    /// no such project existed.
    pub async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let id = id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM tasks WHERE project_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let deleted = result.rows_affected() > 0;
        debug!(project_id = %id, deleted, "Deleted project");
        Ok(deleted)
    }

    /// Deletes finished projects last updated before `cutoff`, with their tasks.
    /// Returns the number of projects removed.
    pub async fn delete_finished_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let cutoff = encode_timestamp(cutoff);
        let completed = Status::Completed.as_str();
        let failed = Status::Failed.as_str();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM tasks WHERE project_id IN (
                SELECT id FROM projects WHERE status IN (?, ?) AND updated_at < ?
            )
            "#,
        )
        .bind(completed)
        .bind(failed)
        .bind(&cutoff)
        .execute(&mut *tx)
        .await?;
        let result = sqlx::query("DELETE FROM projects WHERE status IN (?, ?) AND updated_at < ?")
            .bind(completed)
            .bind(failed)
            .bind(&cutoff)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::setup_test_db;
    use chrono::Duration;
    use serde_json::json;
    use testforge_core::{Language, ProjectKind};

    fn project(name: &str) -> Project {
        Project::new(name, ProjectKind::Api, Language::Java, format!("/tmp/{name}"))
    }

    #[tokio::test]
    async fn test_round_trip_all_combinations() {
        let (pool, _dir) = setup_test_db().await;
        let repo = ProjectRepository::new(pool);

        for kind in ProjectKind::ALL {
            for language in Language::ALL {
                for status in Status::ALL {
                    let mut p = Project::new("combo", kind, language, "/tmp/combo")
                        .with_spec_file("/specs/petstore.yaml");
                    p.metadata.insert("owner".into(), json!({"team": "qa"}));
                    p.set_status(status);

                    repo.save(&p).await.unwrap();
                    let loaded = repo.find_by_id(p.id).await.unwrap().unwrap();
                    assert_eq!(loaded, p);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_save_twice_keeps_one_record() {
        let (pool, _dir) = setup_test_db().await;
        let repo = ProjectRepository::new(pool);

        let mut p = project("orders");
        repo.save(&p).await.unwrap();
        p.set_status(Status::InProgress);
        repo.save(&p).await.unwrap();

        let all = repo.find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, Status::InProgress);
    }

    #[tokio::test]
    async fn test_find_all_most_recent_first() {
        let (pool, _dir) = setup_test_db().await;
        let repo = ProjectRepository::new(pool);

        let mut older = project("older");
        older.created_at -= Duration::minutes(5);
        let newer = project("newer");
        repo.save(&older).await.unwrap();
        repo.save(&newer).await.unwrap();

        let names: Vec<_> = repo
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["newer", "older"]);
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let (pool, _dir) = setup_test_db().await;
        let repo = ProjectRepository::new(pool);

        let p = project("gone");
        repo.save(&p).await.unwrap();

        assert!(repo.delete(p.id).await.unwrap());
        assert!(!repo.delete(p.id).await.unwrap());
        assert!(repo.find_by_id(p.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_unknown_id() {
        let (pool, _dir) = setup_test_db().await;
        let repo = ProjectRepository::new(pool);

        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_row_is_reported() {
        let (pool, _dir) = setup_test_db().await;
        let repo = ProjectRepository::new(pool.clone());

        let p = project("broken");
        repo.save(&p).await.unwrap();
        sqlx::query("UPDATE projects SET language = 'cobol' WHERE id = ?")
            .bind(p.id.to_string())
            .execute(&pool)
            .await
            .unwrap();

        let err = repo.find_by_id(p.id).await.unwrap_err();
        assert!(matches!(err, DbError::Corrupt { table: "projects", .. }));
    }

    #[tokio::test]
    async fn test_delete_finished_before_cutoff() {
        let (pool, _dir) = setup_test_db().await;
        let repo = ProjectRepository::new(pool);
        let cutoff = Utc::now() - Duration::days(30);

        let mut stale_done = project("stale-done");
        stale_done.status = Status::Completed;
        stale_done.updated_at = cutoff - Duration::days(1);

        let mut stale_pending = project("stale-pending");
        stale_pending.updated_at = cutoff - Duration::days(1);

        let mut fresh_failed = project("fresh-failed");
        fresh_failed.status = Status::Failed;

        for p in [&stale_done, &stale_pending, &fresh_failed] {
            repo.save(p).await.unwrap();
        }

        assert_eq!(repo.delete_finished_before(cutoff).await.unwrap(), 1);
        assert!(repo.find_by_id(stale_done.id).await.unwrap().is_none());
        assert!(repo.find_by_id(stale_pending.id).await.unwrap().is_some());
        assert!(repo.find_by_id(fresh_failed.id).await.unwrap().is_some());
    }
}
