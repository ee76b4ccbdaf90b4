mod config;

use agents::{
    DispatchPolicy, Dispatcher, GenerationClient, RemoteAgent, SpecParserAgent, UnavailableAgent,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use db::Store;
use orchestrator::{default_protected_roots, EngineConfig, ExecutionEngine, NewProject, RunReport};
use std::path::PathBuf;
use std::sync::Arc;
use testforge_core::{AgentType, Language, ProjectKind, Status};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::config::{testforge_home, Config, CONFIG_FILE};

#[derive(Parser)]
#[command(name = "testforge")]
#[command(about = "Generate test automation projects with AI agents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.testforge/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config and create the database
    Init,
    #[command(subcommand)]
    Project(ProjectCommands),
    /// Show project and task statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Delete finished projects older than the given number of days
    Cleanup {
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Create a project and run its plan
    Create {
        name: String,

        #[arg(long = "type", default_value = "api")]
        kind: ProjectKind,

        #[arg(long)]
        language: Option<Language>,

        /// Output directory (defaults to <default_output_dir>/<name>)
        #[arg(long)]
        output: Option<PathBuf>,

        /// OpenAPI, Swagger or Postman file to generate tests from
        #[arg(long)]
        spec: Option<PathBuf>,

        /// Only create the project, do not run it
        #[arg(long)]
        no_run: bool,
    },
    /// Run a pending project
    Run { id: Uuid },
    List,
    Status {
        id: Uuid,

        #[arg(long)]
        json: bool,
    },
    Delete { id: Uuid },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config, cli.verbose);

    match cli.command {
        Commands::Init => init(&config, cli.config).await,
        Commands::Project(command) => {
            let engine = build_engine(&config).await?;
            project_command(&engine, &config, command).await
        }
        Commands::Stats { json } => stats(&open_store(&config).await?, json).await,
        Commands::Cleanup { days } => cleanup(&open_store(&config).await?, days).await,
    }
}

async fn init(config: &Config, config_path: Option<PathBuf>) -> Result<()> {
    let config_path = config_path.unwrap_or_else(|| testforge_home().join(CONFIG_FILE));

    if config_path.exists() {
        println!("Config already present at {}", config_path.display());
    } else {
        if let Some(parent) = config_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&config_path, config.to_toml()?)
            .await
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!("Wrote {}", config_path.display());
    }

    let store = open_store(config).await?;
    store.close().await;
    println!("Database ready at {}", config.database.path.display());

    Ok(())
}

async fn open_store(config: &Config) -> Result<Store> {
    Store::open(&config.database.path)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.path.display()))
}

fn build_dispatcher(config: &Config, policy: DispatchPolicy) -> Dispatcher {
    let mut dispatcher = Dispatcher::new(policy).with_agent(Arc::new(SpecParserAgent::new()));

    match config.generation.base_url.as_deref() {
        Some(base_url) => {
            tracing::info!(url = %base_url, "Using generation service");
            let client = Arc::new(GenerationClient::new(base_url));
            for agent_type in [AgentType::Api, AgentType::Devops] {
                dispatcher.register(Arc::new(RemoteAgent::new(agent_type, client.clone())));
            }
        }
        None => {
            tracing::info!("No generation service configured, api and devops agents unavailable");
            for agent_type in [AgentType::Api, AgentType::Devops] {
                dispatcher.register(Arc::new(UnavailableAgent::new(
                    agent_type,
                    "no generation service configured",
                )));
            }
        }
    }
    dispatcher
}

async fn build_engine(config: &Config) -> Result<ExecutionEngine> {
    let store = open_store(config).await?;
    let dispatcher = build_dispatcher(config, config.dispatch_policy());
    let engine_config = EngineConfig::new(default_protected_roots(Some(&testforge_home())));

    Ok(ExecutionEngine::new(store, Arc::new(dispatcher), engine_config))
}

async fn project_command(
    engine: &ExecutionEngine,
    config: &Config,
    command: ProjectCommands,
) -> Result<()> {
    match command {
        ProjectCommands::Create {
            name,
            kind,
            language,
            output,
            spec,
            no_run,
        } => {
            let output = output.unwrap_or_else(|| config.project.default_output_dir.join(&name));
            let language = language.unwrap_or(config.project.default_language);
            let mut request = NewProject::new(name, kind, language, output);
            if let Some(spec) = spec {
                request = request.with_spec_file(spec);
            }

            let mut project = engine.create_project(request).await?;
            println!(
                "{} {} ({})",
                "Created project".green(),
                project.name.bold(),
                project.id
            );
            println!("  Output: {}", project.output_location.display());

            if no_run {
                return Ok(());
            }
            let report = engine.run(&mut project).await?;
            print_report(&report);
            if !report.is_success() {
                bail!("project {} failed", report.project_id);
            }
            Ok(())
        }
        ProjectCommands::Run { id } => {
            let report = engine.run_by_id(id).await?;
            print_report(&report);
            if !report.is_success() {
                bail!("project {} failed", report.project_id);
            }
            Ok(())
        }
        ProjectCommands::List => {
            let projects = engine.list_projects().await?;
            if projects.is_empty() {
                println!("No projects yet.");
                return Ok(());
            }
            println!("Projects ({}):", projects.len());
            for project in &projects {
                println!(
                    "  {} {} {:<24} {}/{} {}",
                    status_icon(project.status),
                    project.id,
                    project.name,
                    project.kind,
                    project.language,
                    project.created_at.format("%Y-%m-%d %H:%M")
                );
            }
            Ok(())
        }
        ProjectCommands::Status { id, json } => {
            let Some(status) = engine.get_status(id).await? else {
                bail!("project {id} not found");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
                return Ok(());
            }

            let project = &status.project;
            println!();
            println!("Project: {} ({})", project.name.bold(), project.id);
            println!("Status:  {} {}", status_icon(project.status), project.status);
            println!("Type:    {} / {}", project.kind, project.language);
            println!("Output:  {}", project.output_location.display());
            if let Some(spec) = project.spec_file() {
                println!("Spec:    {spec}");
            }
            println!();
            println!(
                "Tasks: {} total, {} completed, {} failed",
                status.summary.total, status.summary.completed, status.summary.failed
            );
            for task in &status.tasks {
                println!(
                    "  {} {} {}",
                    status_icon(task.status),
                    task.agent_type,
                    task.operation
                );
                if let Some(error) = &task.error_message {
                    println!("      {}", error.red());
                }
            }
            println!();
            Ok(())
        }
        ProjectCommands::Delete { id } => {
            if engine.store().delete_project(id).await? {
                println!("Deleted project {id}");
            } else {
                println!("No project {id}");
            }
            Ok(())
        }
    }
}

async fn stats(store: &Store, json: bool) -> Result<()> {
    let stats = store.get_statistics().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!("Projects: {}", stats.total_projects);
    for (label, counts) in [
        ("by status", &stats.projects_by_status),
        ("by type", &stats.projects_by_type),
        ("by language", &stats.projects_by_language),
    ] {
        let line: Vec<String> = counts.iter().map(|(k, v)| format!("{k}={v}")).collect();
        println!("  {label:<12} {}", line.join(", "));
    }
    println!("Tasks:    {}", stats.total_tasks);
    let line: Vec<String> = stats
        .tasks_by_status
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    println!("  {:<12} {}", "by status", line.join(", "));
    println!();
    Ok(())
}

async fn cleanup(store: &Store, days: u32) -> Result<()> {
    let cutoff = chrono::Utc::now() - chrono::Duration::days(i64::from(days));
    let removed = store.cleanup_finished_before(cutoff).await?;
    println!("Removed {removed} finished project(s) older than {days} day(s)");
    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    for task in &report.per_task_results {
        let note = if task.simulated { " (simulated)".yellow().to_string() } else { String::new() };
        println!(
            "  {} {}{}",
            status_icon(task.status),
            task.operation,
            note
        );
        if let Some(error) = &task.error_message {
            println!("      {}", error.red());
        }
    }
    println!();

    let summary = format!(
        "{}/{} tasks completed, {} min estimated",
        report.tasks_completed_count, report.total_task_count, report.plan.total_estimated_minutes
    );
    if report.is_success() {
        println!("{} {}", "Completed:".green().bold(), summary);
    } else {
        println!("{} {}", "Failed:".red().bold(), summary);
    }
}

fn status_icon(status: Status) -> String {
    match status {
        Status::Pending => "○".normal().to_string(),
        Status::InProgress => "◑".yellow().to_string(),
        Status::Completed => "●".green().to_string(),
        Status::Failed => "✗".red().to_string(),
    }
}

fn init_tracing(config: &Config, verbose: bool) {
    let default_filter = if verbose {
        "testforge=debug,orchestrator=debug,agents=debug,db=debug".to_string()
    } else {
        config.logging.level.clone()
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
