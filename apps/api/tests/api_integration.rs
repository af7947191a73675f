//! End-to-end API integration tests
//!
//! These tests verify the HTTP routes including:
//! - Agent spawn, move, removal and input validation
//! - Block and zone replacement
//! - The work and review flows through their HTTP triggers
//! - Error status codes and the `{"error": ...}` body

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use gameboard_api::agents::{AgentEvent, Orchestrator, OrchestratorSettings, RetryPolicy};
use gameboard_api::api;
use gameboard_api::infrastructure::artifacts::MemoryArtifactStore;
use gameboard_api::infrastructure::providers::{Reply, ScriptedGateway};
use gameboard_api::infrastructure::repositories::MemoryEntityStore;
use serde_json::{json, Value};
use tower::util::ServiceExt; // for oneshot

/// Setup test application over in-memory stores
fn setup_app(gateway: ScriptedGateway) -> (Router, Orchestrator) {
    let orchestrator = Orchestrator::new(
        Arc::new(MemoryEntityStore::new()),
        Arc::new(MemoryArtifactStore::new()),
        Arc::new(gateway),
        OrchestratorSettings {
            retry: RetryPolicy::immediate(1),
            rng_seed: Some(11),
            pass_probability: 1.0,
            ..OrchestratorSettings::default()
        },
    );
    (api::router(orchestrator.clone()), orchestrator)
}

fn python_gateway() -> ScriptedGateway {
    ScriptedGateway::new()
        .on("ARCHITECTURE:", Reply::text("FILES:\n1. main.py - entry point"))
        .on("Analyze this task", Reply::text("A small script."))
        .on("File to create: main.py", Reply::text("print('hello')"))
        .on("Create a README.md", Reply::text("# Script"))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn spawn(app: &Router, body: Value) -> String {
    let (status, json) = send(app, "POST", "/agents", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    json["agent_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup_app(ScriptedGateway::new());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_spawn_agent_wire_format() {
    let (app, _) = setup_app(ScriptedGateway::new());

    let (status, json) = send(
        &app,
        "POST",
        "/agents",
        Some(json!({"agent_type": "qa", "name": "Inspector", "llm_type": "openai", "llm_model": "gpt-4o"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(json["agent_id"].as_str().unwrap().starts_with("agent_"));
    assert_eq!(json["name"], "Inspector");
    assert_eq!(json["agent_type"], "reviewer");
    assert_eq!(json["state"], "idle");
    assert_eq!(json["x"], 50.0);
    assert_eq!(json["y"], 50.0);
    assert_eq!(json["llm_config"]["type"], "openai");
    assert_eq!(json["llm_config"]["model"], "gpt-4o");

    let (status, list) = send(&app, "GET", "/agents", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_spawn_defaults_and_validation() {
    let (app, _) = setup_app(ScriptedGateway::new());

    let (status, json) = send(&app, "POST", "/agents", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["agent_type"], "producer");
    assert!(json["name"].as_str().unwrap().starts_with("Developer_"));
    assert_eq!(json["llm_config"]["type"], "anthropic");

    let (status, json) = send(&app, "POST", "/agents", Some(json!({"agent_type": "pirate"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["agent_type"], "producer");

    let (status, json) = send(&app, "POST", "/agents", Some(json!({"llm_type": "mistral"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("mistral"));
}

#[tokio::test]
async fn test_move_and_delete_agent() {
    let (app, _) = setup_app(ScriptedGateway::new());
    let id = spawn(&app, json!({})).await;

    let (status, json) = send(&app, "POST", &format!("/agents/{}/move", id), Some(json!({"x": 10}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Missing target coordinates (x, y)");

    let (status, json) = send(
        &app,
        "POST",
        &format!("/agents/{}/move", id),
        Some(json!({"x": 120.5, "y": 80})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Move command processed");
    assert_eq!(json["new_x"], 120.5);
    assert_eq!(json["new_y"], 80.0);

    let (status, _) = send(&app, "DELETE", &format!("/agents/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "DELETE", &format!("/agents/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_invalid_agent_id_format() {
    let (app, _) = setup_app(ScriptedGateway::new());

    let (status, json) = send(&app, "POST", "/agents/robot_1/move", Some(json!({"x": 1, "y": 1}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid agent ID format");
}

#[tokio::test]
async fn test_interrogate_unknown_block() {
    let (app, _) = setup_app(ScriptedGateway::new());
    let id = spawn(&app, json!({})).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/agents/{}/interrogate", id),
        Some(json!({"x": 1, "y": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &app,
        "POST",
        &format!("/agents/{}/interrogate", id),
        Some(json!({"blockId": "block_nope00", "x": 1, "y": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("block_nope00"));
}

#[tokio::test]
async fn test_blocks_replace_all() {
    let (app, _) = setup_app(ScriptedGateway::new());

    let (status, _) = send(&app, "POST", "/blocks", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &app,
        "POST",
        "/blocks",
        Some(json!({"blocks": [
            {"title": "Website", "description": "landing page", "x": 10},
            {"block_id": "block_keep01", "title": "Script", "description": "python"}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["count"], 2);

    let (status, json) = send(
        &app,
        "POST",
        "/blocks",
        Some(json!({"blocks": [{"block_id": "block_keep01", "title": "Script"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);

    let (_, list) = send(&app, "GET", "/blocks", None).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["block_id"], "block_keep01");
}

#[tokio::test]
async fn test_zones_and_state() {
    let (app, _) = setup_app(ScriptedGateway::new());

    let (_, zones) = send(&app, "GET", "/zones", None).await;
    assert_eq!(zones.as_array().unwrap().len(), 6);
    assert_eq!(zones[0]["id"], "finish-zone-1");
    assert_eq!(zones[0]["type"], "arrival");

    let duplicate = json!({"zones": [
        {"id": "z", "x": 0, "y": 0, "width": 10, "height": 10},
        {"id": "z", "x": 20, "y": 0, "width": 10, "height": 10}
    ]});
    let (status, json) = send(&app, "POST", "/zones", Some(duplicate)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Duplicate zone id"));

    let layout = json!({"zones": [
        {"id": "a", "x": 0, "y": 0, "width": 100, "height": 100, "type": "finish"},
        {"id": "d", "x": 200, "y": 0, "width": 100, "height": 100, "type": "dropoff"}
    ]});
    let (status, json) = send(&app, "POST", "/zones", Some(layout)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Saved 2 zone positions.");

    let (status, state) = send(&app, "GET", "/state", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["zones"].as_array().unwrap().len(), 2);
    assert_eq!(state["zones"][1]["type"], "dropoff");
    assert!(state["agents"].is_array());
    assert!(state["blocks"].is_array());
}

#[tokio::test]
async fn test_work_and_review_flow_over_http() {
    let (app, orchestrator) = setup_app(python_gateway());
    let mut events = orchestrator.subscribe();

    let (_, blocks) = send(
        &app,
        "POST",
        "/blocks",
        Some(json!({"blocks": [{"title": "Script", "description": "python automation"}]})),
    )
    .await;
    let block_id = blocks["blocks"][0]["block_id"].as_str().unwrap().to_string();
    let dev = spawn(&app, json!({"agent_type": "developer"})).await;
    let qa = spawn(&app, json!({"agent_type": "qa"})).await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/agents/{}/interrogate", dev),
        Some(json!({"blockId": block_id, "markerId": "m-1", "x": 300, "y": 300})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["agent_state"], "working");

    wait_for_end(&mut events, &dev).await;

    let (status, json) = send(&app, "POST", &format!("/agents/{}/complete_and_move", dev), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["new_state"], "idle");
    assert!(json["zone_id"].is_string());

    // A producer cannot review
    let (status, _) = send(
        &app,
        "POST",
        &format!("/agents/{}/start_qa", dev),
        Some(json!({"developer_agent_id": qa})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = send(
        &app,
        "POST",
        &format!("/agents/{}/start_qa", qa),
        Some(json!({"developer_agent_id": dev})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["qa_agent_state"], "working_qa");
    assert_eq!(json["developer_agent_state"], "under_qa");

    wait_for_end(&mut events, &qa).await;

    let (status, json) = send(&app, "POST", &format!("/agents/{}/complete_qa_and_move", qa), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["new_state"], "idle");

    let (_, agents) = send(&app, "GET", "/agents", None).await;
    let dev_record = agents
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["agent_id"] == dev.as_str())
        .unwrap();
    assert_eq!(dev_record["state"], "idle");
    assert_eq!(dev_record["status_title"], "QA Completed");
}

async fn wait_for_end(events: &mut tokio::sync::broadcast::Receiver<AgentEvent>, id: &str) {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let event = events.recv().await.unwrap();
            if event.is_pipeline_end() && event.agent_id().as_str() == id {
                return;
            }
        }
    })
    .await
    .unwrap();
}
