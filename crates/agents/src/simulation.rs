//! Deterministic stand-in results used when a worker cannot deliver.

use serde_json::{json, Value};
use testforge_core::{AgentType, Language, Operation, Payload, TaskParameters};

pub const SIMULATED_KEY: &str = "simulated";
pub const FALLBACK_REASON_KEY: &str = "fallback_reason";

/// Builds the simulated result for `operation`, flagged with the reason the
/// real worker was bypassed.
pub fn simulated_result(
    agent_type: AgentType,
    operation: Operation,
    params: &TaskParameters,
    reason: &str,
) -> Payload {
    let body = match operation {
        Operation::ParseApiSpecification => sample_parse(),
        Operation::CreateProjectStructure => project_structure(params),
        Operation::GenerateTests => generated_tests(params),
        Operation::CreateDockerSetup | Operation::SetupEnvironment => json!({
            "created_files": [
                output_file(params, "Dockerfile"),
                output_file(params, "docker-compose.yml"),
            ],
            "message": "Environment setup completed",
        }),
        Operation::CreateDocumentation => json!({
            "message": format!("Completed {operation}"),
        }),
    };

    let mut payload = Payload::new();
    payload.insert("operation".into(), json!(operation.as_str()));
    payload.insert("status".into(), json!("completed"));
    if let Value::Object(fields) = body {
        payload.extend(fields);
    }
    payload.insert("agent".into(), json!(agent_type.as_str()));
    payload.insert(SIMULATED_KEY.into(), Value::Bool(true));
    payload.insert(FALLBACK_REASON_KEY.into(), json!(reason));
    payload
}

pub fn is_simulated(payload: &Payload) -> bool {
    payload
        .get(SIMULATED_KEY)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn output_file(params: &TaskParameters, relative: &str) -> String {
    params.output_path.join(relative).to_string_lossy().into_owned()
}

fn sample_parse() -> Value {
    let endpoints: Vec<Value> = [
        ("/users", "GET"),
        ("/users", "POST"),
        ("/users/{id}", "GET"),
        ("/users/{id}", "PUT"),
        ("/users/{id}", "DELETE"),
    ]
    .into_iter()
    .map(|(path, method)| json!({"path": path, "method": method, "test_scenarios": []}))
    .collect();

    json!({
        "spec_type": "openapi",
        "endpoints_count": endpoints.len(),
        "parsed_data": {
            "title": "Sample API",
            "base_url": "${api.base.url}",
            "authentication": {"type": "bearer"},
            "endpoints": endpoints,
        },
        "message": "Simulated API specification parsing",
    })
}

fn project_structure(params: &TaskParameters) -> Value {
    let files = match params.language {
        Language::Java => vec![
            output_file(params, "pom.xml"),
            output_file(params, "src/test/java"),
            output_file(params, "src/main/resources"),
        ],
        Language::Python => vec![
            output_file(params, "requirements.txt"),
            output_file(params, "tests"),
            output_file(params, "config"),
        ],
    };

    json!({
        "created_files": files,
        "message": format!(
            "Created {} {} project structure",
            params.language, params.project_type
        ),
    })
}

fn generated_tests(params: &TaskParameters) -> Value {
    let file = match params.language {
        Language::Java => output_file(params, "src/test/java/ApiTests.java"),
        Language::Python => output_file(params, "tests/test_api.py"),
    };

    json!({
        "generated_files": [file],
        "test_count": 5,
        "message": "Generated basic API tests",
    })
}
