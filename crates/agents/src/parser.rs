//! Local reader for OpenAPI, Swagger, Postman and plain YAML API descriptions.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::path::Path;
use testforge_core::{AgentType, Operation, Payload, TaskParameters, PARSED_DATA_KEY};
use tracing::info;

use crate::agent::Agent;
use crate::error::{AgentError, Result};

const DEFAULT_BASE_URL: &str = "${api.base.url}";
const HTTP_METHODS: [&str; 5] = ["GET", "POST", "PUT", "DELETE", "PATCH"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecKind {
    OpenApi,
    Postman,
    Yaml,
}

impl SpecKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenApi => "openapi",
            Self::Postman => "postman",
            Self::Yaml => "yaml",
        }
    }
}

/// Parser agent backed by local file parsing.
#[derive(Debug, Default, Clone)]
pub struct SpecParserAgent;

impl SpecParserAgent {
    pub fn new() -> Self {
        Self
    }

    async fn parse_api_specification(&self, params: &TaskParameters) -> Result<Payload> {
        let spec_file = params
            .spec_file_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AgentError::Failed("no API specification file given".into()))?;

        info!(spec_file = %spec_file, project = %params.project_name, "Parsing API specification");

        let content = tokio::fs::read_to_string(spec_file).await.map_err(|e| {
            AgentError::Failed(format!("cannot read specification {spec_file}: {e}"))
        })?;
        let (kind, parsed) = parse_document(Path::new(spec_file), &content)?;
        let endpoints = parsed["endpoints"].as_array().map_or(0, Vec::len);

        info!(spec_type = kind.as_str(), endpoints, "Parsed API specification");

        let mut payload = Payload::new();
        payload.insert("operation".into(), json!(Operation::ParseApiSpecification.as_str()));
        payload.insert("status".into(), json!("completed"));
        payload.insert("spec_type".into(), json!(kind.as_str()));
        payload.insert("spec_file".into(), json!(spec_file));
        payload.insert("endpoints_count".into(), json!(endpoints));
        payload.insert(
            "message".into(),
            json!(format!("Parsed {} specification with {endpoints} endpoints", kind.as_str())),
        );
        payload.insert(PARSED_DATA_KEY.into(), parsed);
        Ok(payload)
    }
}

#[async_trait]
impl Agent for SpecParserAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::Parser
    }

    async fn execute(&self, operation: Operation, params: &TaskParameters) -> Result<Payload> {
        match operation {
            Operation::ParseApiSpecification => self.parse_api_specification(params).await,
            other => Err(AgentError::Rejected(format!("parser cannot perform {other}"))),
        }
    }
}

/// Decodes `content` according to the file extension, detects the flavour and
/// returns the normalised `parsed_data` document.
pub fn parse_document(path: &Path, content: &str) -> Result<(SpecKind, Value)> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let (document, is_yaml) = match extension.as_deref() {
        Some("json") => (serde_json::from_str::<Value>(content)?, false),
        Some("yml") | Some("yaml") => (from_yaml(content)?, true),
        _ => match serde_json::from_str::<Value>(content) {
            Ok(value) => (value, false),
            Err(_) => (from_yaml(content)?, true),
        },
    };

    let Value::Object(doc) = document else {
        return Err(AgentError::Failed(
            "specification must be a mapping at the top level".into(),
        ));
    };

    let kind = detect_kind(&doc, is_yaml);
    let parsed = match kind {
        SpecKind::OpenApi => parse_openapi(&doc),
        SpecKind::Postman => parse_postman(&doc),
        SpecKind::Yaml => parse_generic_yaml(&doc),
    };
    Ok((kind, parsed))
}

fn from_yaml(content: &str) -> Result<Value> {
    serde_yaml::from_str(content)
        .map_err(|e| AgentError::Failed(format!("invalid YAML specification: {e}")))
}

fn detect_kind(doc: &Map<String, Value>, is_yaml: bool) -> SpecKind {
    let openapi = doc.contains_key("openapi") || doc.contains_key("swagger");
    if !is_yaml && doc.contains_key("info") && doc.contains_key("item") {
        SpecKind::Postman
    } else if openapi || !is_yaml {
        SpecKind::OpenApi
    } else {
        SpecKind::Yaml
    }
}

fn str_or<'a>(value: &'a Value, key: &str, default: &'a str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or(default)
}

fn field_or(value: &Value, key: &str, default: Value) -> Value {
    value.get(key).cloned().unwrap_or(default)
}

fn parse_openapi(doc: &Map<String, Value>) -> Value {
    let root = Value::Object(doc.clone());
    let info = field_or(&root, "info", json!({}));
    let schemes = root.pointer("/components/securitySchemes").cloned().unwrap_or(json!({}));

    let mut endpoints = Vec::new();
    if let Some(paths) = doc.get("paths").and_then(Value::as_object) {
        for (path, methods) in paths {
            let Some(methods) = methods.as_object() else {
                continue;
            };
            for (method, details) in methods {
                let method = method.to_ascii_uppercase();
                if HTTP_METHODS.contains(&method.as_str()) {
                    endpoints.push(openapi_endpoint(path, &method, details));
                }
            }
        }
    }

    json!({
        "title": str_or(&info, "title", "API Tests"),
        "version": str_or(&info, "version", "1.0.0"),
        "description": str_or(&info, "description", ""),
        "base_url": openapi_base_url(&root),
        "authentication": openapi_auth(&root, &schemes),
        "endpoints": endpoints,
        "models": openapi_models(&root),
    })
}

fn openapi_base_url(root: &Value) -> String {
    if let Some(server) = root.pointer("/servers/0") {
        return str_or(server, "url", DEFAULT_BASE_URL).to_string();
    }

    let host = str_or(root, "host", "");
    if host.is_empty() {
        return DEFAULT_BASE_URL.to_string();
    }
    let scheme = root.pointer("/schemes/0").and_then(Value::as_str).unwrap_or("https");
    format!("{scheme}://{host}{}", str_or(root, "basePath", ""))
}

fn openapi_auth(root: &Value, schemes: &Value) -> Value {
    let names: Vec<&String> = schemes.as_object().map(|s| s.keys().collect()).unwrap_or_default();
    let kind = schemes
        .as_object()
        .and_then(|s| s.values().next())
        .map_or("none", |first| str_or(first, "type", "none"));

    json!({
        "type": kind,
        "schemes": names,
        "security_requirements": field_or(root, "security", json!([])),
    })
}

fn openapi_models(root: &Value) -> Value {
    let mut models = Map::new();
    if let Some(schemas) = root.pointer("/components/schemas").and_then(Value::as_object) {
        for (name, schema) in schemas {
            models.insert(
                name.clone(),
                json!({
                    "type": str_or(schema, "type", "object"),
                    "properties": field_or(schema, "properties", json!({})),
                    "required": field_or(schema, "required", json!([])),
                }),
            );
        }
    }
    Value::Object(models)
}

fn slug(method: &str, path: &str) -> String {
    let path: String = path
        .chars()
        .filter(|c| *c != '{' && *c != '}')
        .map(|c| if c == '/' { '_' } else { c })
        .collect();
    format!("{}_{path}", method.to_ascii_lowercase())
}

fn openapi_endpoint(path: &str, method: &str, details: &Value) -> Value {
    let parameters: Vec<Value> = details
        .get("parameters")
        .and_then(Value::as_array)
        .map(|params| {
            params
                .iter()
                .map(|p| {
                    json!({
                        "name": str_or(p, "name", ""),
                        "in": str_or(p, "in", "query"),
                        "required": p.get("required").and_then(Value::as_bool).unwrap_or(false),
                        "type": p.pointer("/schema/type").and_then(Value::as_str).unwrap_or("string"),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    json!({
        "path": path,
        "method": method,
        "operation_id": details
            .get("operationId")
            .and_then(Value::as_str)
            .map_or_else(|| slug(method, path), str::to_string),
        "summary": str_or(details, "summary", ""),
        "description": str_or(details, "description", ""),
        "tags": field_or(details, "tags", json!([])),
        "parameters": parameters,
        "security": field_or(details, "security", json!([])),
        "test_scenarios": test_scenarios(path, method, details),
    })
}

fn test_scenarios(path: &str, method: &str, details: &Value) -> Vec<Value> {
    let base = format!("test_{}", slug(method, path));
    let non_empty = |key: &str| {
        details
            .get(key)
            .and_then(Value::as_array)
            .is_some_and(|a| !a.is_empty())
    };

    let mut scenarios = vec![json!({
        "name": format!("{base}_success"),
        "type": "positive",
        "description": format!("Successful {method} request to {path}"),
        "expected_status": success_status(method, details),
    })];
    if non_empty("parameters") {
        scenarios.push(json!({
            "name": format!("{base}_invalid_params"),
            "type": "negative",
            "description": format!("Invalid parameters for {method} {path}"),
            "expected_status": 400,
        }));
    }
    if non_empty("security") {
        scenarios.push(json!({
            "name": format!("{base}_unauthorized"),
            "type": "negative",
            "description": format!("Unauthorized access to {method} {path}"),
            "expected_status": 401,
        }));
    }
    scenarios
}

fn success_status(method: &str, details: &Value) -> u16 {
    let responses = details.get("responses").and_then(Value::as_object);
    for code in ["200", "201", "202", "204"] {
        if responses.is_some_and(|r| r.contains_key(code)) {
            return code.parse().unwrap_or(200);
        }
    }
    match method {
        "POST" => 201,
        "DELETE" => 204,
        _ => 200,
    }
}

fn parse_postman(doc: &Map<String, Value>) -> Value {
    let root = Value::Object(doc.clone());
    let info = field_or(&root, "info", json!({}));
    let auth = field_or(&root, "auth", json!({}));

    let base_url = doc
        .get("variable")
        .and_then(Value::as_array)
        .and_then(|vars| {
            vars.iter().find(|v| {
                matches!(
                    v.get("key").and_then(Value::as_str),
                    Some("baseUrl" | "base_url" | "host")
                )
            })
        })
        .map_or(DEFAULT_BASE_URL, |v| str_or(v, "value", DEFAULT_BASE_URL));

    let mut endpoints = Vec::new();
    if let Some(items) = doc.get("item").and_then(Value::as_array) {
        collect_postman_items(items, &mut endpoints);
    }

    json!({
        "title": str_or(&info, "name", "API Tests"),
        "version": str_or(&info, "version", "1.0.0"),
        "description": str_or(&info, "description", ""),
        "base_url": base_url,
        "authentication": {"type": str_or(&auth, "type", "none"), "config": auth},
        "endpoints": endpoints,
        "models": {},
    })
}

fn collect_postman_items(items: &[Value], endpoints: &mut Vec<Value>) {
    for item in items {
        if let Some(children) = item.get("item").and_then(Value::as_array) {
            collect_postman_items(children, endpoints);
        } else if let Some(request) = item.get("request") {
            endpoints.push(postman_endpoint(item, request));
        }
    }
}

fn postman_endpoint(item: &Value, request: &Value) -> Value {
    let url = request.get("url").cloned().unwrap_or(Value::Null);
    let path = match &url {
        Value::String(raw) => raw.clone(),
        Value::Object(_) => match url.get("path") {
            Some(Value::Array(segments)) => {
                let segments: Vec<&str> = segments.iter().filter_map(Value::as_str).collect();
                format!("/{}", segments.join("/"))
            }
            Some(Value::String(p)) => p.clone(),
            _ => str_or(&url, "raw", "").to_string(),
        },
        _ => String::new(),
    };
    let name = str_or(item, "name", "");

    json!({
        "path": path,
        "method": str_or(request, "method", "GET"),
        "operation_id": name.replace(' ', "_").to_lowercase(),
        "summary": name,
        "description": str_or(item, "description", ""),
        "tags": [],
        "test_scenarios": [],
    })
}

fn parse_generic_yaml(doc: &Map<String, Value>) -> Value {
    let root = Value::Object(doc.clone());
    let endpoints: Vec<Value> = doc
        .get("endpoints")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .map(|e| {
                    json!({
                        "path": str_or(e, "path", "/"),
                        "method": str_or(e, "method", "GET"),
                        "operation_id": str_or(e, "name", "").replace(' ', "_").to_lowercase(),
                        "summary": str_or(e, "summary", ""),
                        "description": str_or(e, "description", ""),
                        "tags": [],
                        "test_scenarios": [],
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    json!({
        "title": str_or(&root, "title", "API Tests"),
        "version": str_or(&root, "version", "1.0.0"),
        "description": str_or(&root, "description", ""),
        "base_url": str_or(&root, "base_url", DEFAULT_BASE_URL),
        "authentication": {"type": "none"},
        "endpoints": endpoints,
        "models": {},
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use testforge_core::{Language, Project, ProjectKind};

    const PETSTORE: &str = r#"{
        "openapi": "3.0.0",
        "info": {"title": "Petstore", "version": "2.1.0"},
        "servers": [{"url": "https://pets.example.com/v1"}],
        "components": {
            "securitySchemes": {"bearerAuth": {"type": "http", "scheme": "bearer"}},
            "schemas": {"Pet": {"type": "object", "required": ["name"]}}
        },
        "paths": {
            "/pets": {
                "get": {"operationId": "listPets", "parameters": [{"name": "limit", "in": "query"}]},
                "post": {"responses": {"201": {"description": "created"}}, "security": [{"bearerAuth": []}]}
            },
            "/pets/{petId}": {
                "delete": {},
                "parameters": [{"name": "petId", "in": "path"}]
            }
        }
    }"#;

    #[test]
    fn test_openapi_json() {
        let (kind, parsed) = parse_document(Path::new("petstore.json"), PETSTORE).unwrap();

        assert_eq!(kind, SpecKind::OpenApi);
        assert_eq!(parsed["title"], "Petstore");
        assert_eq!(parsed["version"], "2.1.0");
        assert_eq!(parsed["base_url"], "https://pets.example.com/v1");
        assert_eq!(parsed["authentication"]["type"], "http");
        assert_eq!(parsed["models"]["Pet"]["required"], json!(["name"]));

        let endpoints = parsed["endpoints"].as_array().unwrap();
        assert_eq!(endpoints.len(), 3);

        let list = endpoints.iter().find(|e| e["operation_id"] == "listPets").unwrap();
        assert_eq!(list["test_scenarios"].as_array().unwrap().len(), 2);

        let delete = endpoints.iter().find(|e| e["method"] == "DELETE").unwrap();
        assert_eq!(delete["operation_id"], "delete__pets_petId");
        assert_eq!(delete["test_scenarios"][0]["expected_status"], 204);

        let create = endpoints.iter().find(|e| e["method"] == "POST").unwrap();
        assert_eq!(create["test_scenarios"][1]["expected_status"], 401);
    }

    #[test]
    fn test_swagger_yaml_base_url() {
        let spec = "swagger: '2.0'\nhost: api.example.com\nbasePath: /v2\nschemes: [http]\npaths: {}\n";
        let (kind, parsed) = parse_document(Path::new("api.yaml"), spec).unwrap();

        assert_eq!(kind, SpecKind::OpenApi);
        assert_eq!(parsed["base_url"], "http://api.example.com/v2");
        assert_eq!(parsed["endpoints"], json!([]));
    }

    #[test]
    fn test_postman_collection() {
        let collection = r#"{
            "info": {"name": "Orders"},
            "variable": [{"key": "baseUrl", "value": "https://orders.local"}],
            "item": [
                {"name": "Folder", "item": [
                    {"name": "List Orders", "request": {"method": "GET", "url": {"path": ["orders"]}}}
                ]},
                {"name": "Create Order", "request": {"method": "POST", "url": "https://orders.local/orders"}}
            ]
        }"#;
        let (kind, parsed) = parse_document(Path::new("orders.json"), collection).unwrap();

        assert_eq!(kind, SpecKind::Postman);
        assert_eq!(parsed["title"], "Orders");
        assert_eq!(parsed["base_url"], "https://orders.local");
        assert_eq!(parsed["endpoints"][0]["path"], "/orders");
        assert_eq!(parsed["endpoints"][0]["operation_id"], "list_orders");
        assert_eq!(parsed["endpoints"][1]["method"], "POST");
    }

    #[test]
    fn test_generic_yaml() {
        let spec = "title: Inventory\nendpoints:\n  - path: /items\n    method: GET\n    name: List Items\n";
        let (kind, parsed) = parse_document(Path::new("inventory.yml"), spec).unwrap();

        assert_eq!(kind, SpecKind::Yaml);
        assert_eq!(parsed["title"], "Inventory");
        assert_eq!(parsed["base_url"], DEFAULT_BASE_URL);
        assert_eq!(parsed["endpoints"][0]["operation_id"], "list_items");
    }

    #[test]
    fn test_top_level_must_be_mapping() {
        let err = parse_document(Path::new("bad.json"), "[1, 2]").unwrap_err();
        assert!(matches!(err, AgentError::Failed(_)));
    }

    #[tokio::test]
    async fn test_agent_parses_file() {
        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("petstore.json");
        std::fs::write(&spec, PETSTORE).unwrap();

        let project = Project::new("pets", ProjectKind::Api, Language::Java, dir.path())
            .with_spec_file(spec.to_string_lossy());
        let params = TaskParameters::for_project(&project)
            .with_spec_file(project.spec_file().map(str::to_string));

        let result = SpecParserAgent::new()
            .execute(Operation::ParseApiSpecification, &params)
            .await
            .unwrap();

        assert_eq!(result["status"], "completed");
        assert_eq!(result["spec_type"], "openapi");
        assert_eq!(result["endpoints_count"], 3);
        assert_eq!(result[PARSED_DATA_KEY]["title"], "Petstore");
    }

    #[tokio::test]
    async fn test_missing_spec_path_fails() {
        let project = Project::new("pets", ProjectKind::Api, Language::Java, "/tmp/pets");
        let err = SpecParserAgent::new()
            .execute(
                Operation::ParseApiSpecification,
                &TaskParameters::for_project(&project),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Failed(_)));
    }
}
