use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use super::status::Status;
use super::task::Payload;
use crate::error::CoreError;

/// Metadata key holding the optional path of an API specification file.
pub const API_SPEC_FILE_KEY: &str = "api_spec_file";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProjectKind {
    #[default]
    Api,
    Ui,
    Full,
}

impl ProjectKind {
    pub const ALL: [ProjectKind; 3] = [ProjectKind::Api, ProjectKind::Ui, ProjectKind::Full];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Ui => "ui",
            Self::Full => "full",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "api" => Some(Self::Api),
            "ui" => Some(Self::Ui),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

impl FromStr for ProjectKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(&s.to_ascii_lowercase()).ok_or_else(|| CoreError::unknown("project type", s))
    }
}

impl std::fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Java,
    Python,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Java, Language::Python];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Python => "python",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "java" => Some(Self::Java),
            "python" => Some(Self::Python),
            _ => None,
        }
    }
}

impl FromStr for Language {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(&s.to_ascii_lowercase()).ok_or_else(|| CoreError::unknown("language", s))
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-requested test-automation project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub kind: ProjectKind,
    pub language: Language,
    pub output_location: PathBuf,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Payload,
}

impl Project {
    pub fn new(
        name: impl Into<String>,
        kind: ProjectKind,
        language: Language,
        output_location: impl Into<PathBuf>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            language,
            output_location: output_location.into(),
            status: Status::default(),
            created_at: now,
            updated_at: now,
            metadata: Payload::new(),
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_spec_file(mut self, spec_file: impl Into<String>) -> Self {
        self.metadata
            .insert(API_SPEC_FILE_KEY.to_string(), Value::String(spec_file.into()));
        self
    }

    /// Path of the input API specification, if the project was created with one.
    pub fn spec_file(&self) -> Option<&str> {
        self.metadata
            .get(API_SPEC_FILE_KEY)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Sets the status and bumps `updated_at`. Transition rules are enforced by the
    /// orchestrator, not here.
    pub fn set_status(&mut self, status: Status) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
