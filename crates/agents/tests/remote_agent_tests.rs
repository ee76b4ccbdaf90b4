use agents::{Agent, AgentError, DispatchPolicy, Dispatcher, GenerationClient, RemoteAgent};
use serde_json::json;
use std::sync::Arc;
use testforge_core::{AgentType, Language, Operation, Project, ProjectKind, TaskParameters};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn params() -> TaskParameters {
    let project = Project::new("orders", ProjectKind::Api, Language::Java, "/out/orders");
    TaskParameters::for_project(&project).with_description("Create project structure")
}

fn agent(server: &MockServer, agent_type: AgentType) -> RemoteAgent {
    RemoteAgent::new(agent_type, Arc::new(GenerationClient::new(server.uri())))
}

#[tokio::test]
async fn test_successful_generation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .and(body_partial_json(json!({
            "agent": "api_agent",
            "operation": "create_project_structure",
            "parameters": {"project_name": "orders"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "operation": "create_project_structure",
            "status": "completed",
            "created_files": ["/out/orders/pom.xml"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = agent(&server, AgentType::Api)
        .execute(Operation::CreateProjectStructure, &params())
        .await
        .unwrap();

    assert_eq!(result["status"], "completed");
    assert_eq!(result["created_files"][0], "/out/orders/pom.xml");
}

#[tokio::test]
async fn test_server_error_is_worker_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = agent(&server, AgentType::Devops)
        .execute(Operation::CreateDockerSetup, &params())
        .await
        .unwrap_err();

    match err {
        AgentError::InvalidResponse(msg) => assert!(msg.contains("upstream down")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_rejection_body_is_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "rejected",
            "message": "project name violates policy"
        })))
        .mount(&server)
        .await;

    let err = agent(&server, AgentType::Api)
        .execute(Operation::GenerateTests, &params())
        .await
        .unwrap_err();

    assert!(err.is_rejection());
    assert_eq!(err.to_string(), "Rejected: project name violates policy");
}

#[tokio::test]
async fn test_dispatcher_simulates_over_failed_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dispatcher =
        Dispatcher::new(DispatchPolicy::default()).with_agent(Arc::new(agent(&server, AgentType::Api)));

    let result = dispatcher
        .invoke(AgentType::Api, Operation::GenerateTests, &params())
        .await
        .unwrap();

    assert_eq!(result["simulated"], true);
    assert_eq!(result["status"], "completed");
}
