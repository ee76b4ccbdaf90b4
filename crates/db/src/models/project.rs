use std::path::PathBuf;
use testforge_core::{Language, Project, ProjectKind, Status};
use uuid::Uuid;

use super::{decode_payload, decode_timestamp, encode_payload, encode_timestamp};
use crate::error::DbError;

const TABLE: &str = "projects";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub language: String,
    pub output_location: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub metadata: Option<String>,
}

impl ProjectRow {
    pub fn from_domain(project: &Project) -> Result<Self, DbError> {
        Ok(Self {
            id: project.id.to_string(),
            name: project.name.clone(),
            kind: project.kind.as_str().to_string(),
            language: project.language.as_str().to_string(),
            output_location: project.output_location.to_string_lossy().into_owned(),
            status: project.status.as_str().to_string(),
            created_at: encode_timestamp(project.created_at),
            updated_at: encode_timestamp(project.updated_at),
            metadata: encode_payload("metadata", &project.metadata)?,
        })
    }

    pub fn into_domain(self) -> Result<Project, DbError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| DbError::corrupt(TABLE, &self.id, format!("bad id: {e}")))?;
        let kind = ProjectKind::parse(&self.kind)
            .ok_or_else(|| DbError::corrupt(TABLE, &self.id, format!("unknown kind {}", self.kind)))?;
        let language = Language::parse(&self.language).ok_or_else(|| {
            DbError::corrupt(TABLE, &self.id, format!("unknown language {}", self.language))
        })?;
        let status = Status::parse(&self.status).ok_or_else(|| {
            DbError::corrupt(TABLE, &self.id, format!("unknown status {}", self.status))
        })?;

        Ok(Project {
            id,
            kind,
            language,
            status,
            created_at: decode_timestamp(TABLE, &self.id, &self.created_at)?,
            updated_at: decode_timestamp(TABLE, &self.id, &self.updated_at)?,
            metadata: decode_payload(TABLE, &self.id, self.metadata.as_deref())?,
            output_location: PathBuf::from(self.output_location),
            name: self.name,
        })
    }
}
