use agents::{DispatchPolicy, FallbackMode, UnknownOperation};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use testforge_core::Language;

pub const TESTFORGE_DIR: &str = ".testforge";
pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_DB_NAME: &str = "testforge.db";
pub const DEFAULT_OUTPUT_DIR: &str = "testforge-projects";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_LOG_FILTER: &str = "testforge=info,orchestrator=info,agents=info,db=warn";

/// `~/.testforge`, or `./.testforge` when no home directory is known.
pub fn testforge_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(TESTFORGE_DIR)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub project: ProjectConfig,
    pub dispatch: DispatchConfig,
    pub generation: GenerationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub default_output_dir: PathBuf,
    pub default_language: Language,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub fallback: FallbackMode,
    pub unknown_operation: UnknownOperation,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Generation service; without it the api and devops agents are unavailable.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_home(&testforge_home())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: testforge_home().join(DEFAULT_DB_NAME),
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            default_output_dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(DEFAULT_OUTPUT_DIR),
            default_language: Language::Java,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            fallback: FallbackMode::Simulate,
            unknown_operation: UnknownOperation::Reject,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    fn with_home(home: &Path) -> Self {
        Self {
            database: DatabaseConfig {
                path: home.join(DEFAULT_DB_NAME),
            },
            project: ProjectConfig::default(),
            dispatch: DispatchConfig::default(),
            generation: GenerationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Reads `path` (or the default config file) if it exists, then applies
    /// `TESTFORGE_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| testforge_home().join(CONFIG_FILE));

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            Self::parse(&content)
                .with_context(|| format!("Invalid config {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Applies overrides looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = var("TESTFORGE_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(dir) = var("TESTFORGE_OUTPUT_DIR") {
            self.project.default_output_dir = PathBuf::from(dir);
        }
        if let Some(url) = var("TESTFORGE_GENERATION_URL") {
            self.generation.base_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(secs) = var("TESTFORGE_TIMEOUT_SECS") {
            self.dispatch.timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("TESTFORGE_TIMEOUT_SECS is not a number: {secs}"))?;
        }
        if let Some(level) = var("TESTFORGE_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn dispatch_policy(&self) -> DispatchPolicy {
        DispatchPolicy::default()
            .with_fallback(self.dispatch.fallback)
            .with_unknown_operation(self.dispatch.unknown_operation)
            .with_timeout(Duration::from_secs(self.dispatch.timeout_secs))
    }
}
