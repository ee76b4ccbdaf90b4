use testforge_core::{AgentType, Operation, Status, Task, TaskParameters};
use uuid::Uuid;

use super::{decode_payload, decode_timestamp, encode_payload, encode_timestamp};
use crate::error::DbError;

const TABLE: &str = "tasks";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRow {
    pub id: String,
    pub project_id: String,
    pub sequence: i64,
    pub agent_type: String,
    pub operation: String,
    pub parameters: String,
    pub status: String,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub result: Option<String>,
    pub error_message: Option<String>,
}

impl TaskRow {
    pub fn from_domain(task: &Task) -> Result<Self, DbError> {
        let parameters = serde_json::to_string(&task.parameters).map_err(|source| DbError::Encode {
            field: "parameters",
            source,
        })?;

        Ok(Self {
            id: task.id.clone(),
            project_id: task.project_id.to_string(),
            sequence: i64::from(task.sequence),
            agent_type: task.agent_type.as_str().to_string(),
            operation: task.operation.as_str().to_string(),
            parameters,
            status: task.status.as_str().to_string(),
            created_at: encode_timestamp(task.created_at),
            completed_at: task.completed_at.map(encode_timestamp),
            result: encode_payload("result", &task.result)?,
            error_message: task.error_message.clone(),
        })
    }

    pub fn into_domain(self) -> Result<Task, DbError> {
        let id = self.id;
        let project_id = Uuid::parse_str(&self.project_id)
            .map_err(|e| DbError::corrupt(TABLE, &id, format!("bad project id: {e}")))?;
        let sequence = u32::try_from(self.sequence)
            .map_err(|_| DbError::corrupt(TABLE, &id, format!("bad sequence {}", self.sequence)))?;
        let agent_type = AgentType::parse(&self.agent_type).ok_or_else(|| {
            DbError::corrupt(TABLE, &id, format!("unknown agent type {}", self.agent_type))
        })?;
        let operation = Operation::parse(&self.operation).ok_or_else(|| {
            DbError::corrupt(TABLE, &id, format!("unknown operation {}", self.operation))
        })?;
        let status = Status::parse(&self.status)
            .ok_or_else(|| DbError::corrupt(TABLE, &id, format!("unknown status {}", self.status)))?;
        let parameters: TaskParameters = serde_json::from_str(&self.parameters)
            .map_err(|e| DbError::corrupt(TABLE, &id, format!("bad parameters: {e}")))?;
        let created_at = decode_timestamp(TABLE, &id, &self.created_at)?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(|ts| decode_timestamp(TABLE, &id, ts))
            .transpose()?;
        let result = decode_payload(TABLE, &id, self.result.as_deref())?;

        Ok(Task {
            id,
            project_id,
            sequence,
            agent_type,
            operation,
            parameters,
            status,
            created_at,
            completed_at,
            result,
            error_message: self.error_message,
        })
    }
}
