use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::agents::{Orchestrator, Relocation};
use crate::api::errors::ApiError;
use crate::domain::agent::{Agent, AgentId, AgentRole, AgentState, Position, ProviderConfig};

/// Request body for spawning an agent
#[derive(Debug, Default, Deserialize)]
pub struct SpawnAgentRequest {
    pub agent_type: Option<String>,
    pub llm_type: Option<String>,
    pub llm_model: Option<String>,
    pub name: Option<String>,
}

/// Request body for a manual move
#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// Request body for sending a producer to a block
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterrogateRequest {
    pub block_id: Option<String>,
    pub marker_id: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// Request body for starting a review
#[derive(Debug, Deserialize)]
pub struct StartQaRequest {
    pub developer_agent_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MoveResponse {
    pub message: String,
    pub new_x: f64,
    pub new_y: f64,
}

#[derive(Debug, Serialize)]
pub struct InterrogateResponse {
    pub message: String,
    pub agent_state: AgentState,
}

/// Response from both completion endpoints
#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub message: String,
    pub new_state: AgentState,
    pub new_x: f64,
    pub new_y: f64,
    pub zone_id: Option<String>,
}

impl From<Relocation> for CompletionResponse {
    fn from(relocation: Relocation) -> Self {
        let agent = relocation.agent;
        let message = match &relocation.zone_id {
            Some(zone) => format!("Agent {} moved to zone {} and set to idle.", agent.id, zone),
            None => format!(
                "Agent {} stayed at {} (no free zone) and set to idle.",
                agent.id, agent.position
            ),
        };
        Self {
            message,
            new_state: agent.state,
            new_x: agent.position.x,
            new_y: agent.position.y,
            zone_id: relocation.zone_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StartQaResponse {
    pub message: String,
    pub qa_agent_state: AgentState,
    pub developer_agent_state: AgentState,
}

fn agent_id(raw: &str) -> Result<AgentId, ApiError> {
    if raw.starts_with("agent_") {
        Ok(AgentId::from(raw))
    } else {
        Err(ApiError::bad_request("Invalid agent ID format"))
    }
}

/// List all agents
///
/// GET /agents
pub async fn list_agents(
    State(orchestrator): State<Orchestrator>,
) -> Result<Json<Vec<Agent>>, ApiError> {
    Ok(Json(orchestrator.list_agents().await?))
}

/// Spawn a new agent
///
/// POST /agents
///
/// An unknown `agent_type` falls back to a producer; an unknown `llm_type` is rejected.
pub async fn spawn_agent(
    State(orchestrator): State<Orchestrator>,
    body: Option<Json<SpawnAgentRequest>>,
) -> Result<(StatusCode, Json<Agent>), ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let role = match req.agent_type.as_deref() {
        None => AgentRole::Producer,
        Some(raw) => raw.parse().unwrap_or_else(|e: String| {
            tracing::warn!(error = %e, "Defaulting to producer");
            AgentRole::Producer
        }),
    };

    let provider = match req.llm_type.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(raw) => Some(ProviderConfig::new(
            raw.parse().map_err(ApiError::bad_request)?,
            req.llm_model.filter(|m| !m.trim().is_empty()),
        )),
        None => None,
    };

    let agent = orchestrator.spawn_agent(role, provider, req.name).await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

/// Remove an agent and its artifacts
///
/// DELETE /agents/:id
pub async fn delete_agent(
    State(orchestrator): State<Orchestrator>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = agent_id(&id)?;
    orchestrator.remove_agent(&id).await?;

    Ok(Json(MessageResponse {
        message: format!("Agent {} deleted", id),
    }))
}

/// Manual move
///
/// POST /agents/:id/move
pub async fn move_agent(
    State(orchestrator): State<Orchestrator>,
    Path(id): Path<String>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, ApiError> {
    let id = agent_id(&id)?;
    let (Some(x), Some(y)) = (req.x, req.y) else {
        return Err(ApiError::bad_request("Missing target coordinates (x, y)"));
    };

    let agent = orchestrator.relocate_agent(&id, Position::new(x, y)).await?;

    Ok(Json(MoveResponse {
        message: "Move command processed".to_string(),
        new_x: agent.position.x,
        new_y: agent.position.y,
    }))
}

/// Send a producer to a block and start working on it
///
/// POST /agents/:id/interrogate
pub async fn interrogate(
    State(orchestrator): State<Orchestrator>,
    Path(id): Path<String>,
    Json(req): Json<InterrogateRequest>,
) -> Result<Json<InterrogateResponse>, ApiError> {
    let id = agent_id(&id)?;
    let (Some(block_id), Some(x), Some(y)) = (req.block_id.filter(|b| !b.is_empty()), req.x, req.y)
    else {
        return Err(ApiError::bad_request(
            "Missing blockId or target coordinates (x, y) in interrogate request",
        ));
    };

    let agent = orchestrator
        .assign_task(&id, &block_id, req.marker_id, Position::new(x, y))
        .await?;

    Ok(Json(InterrogateResponse {
        message: format!("Interrogation of {} started", block_id),
        agent_state: agent.state,
    }))
}

/// Collect a finished producer into an arrival zone
///
/// POST /agents/:id/complete_and_move
pub async fn complete_and_move(
    State(orchestrator): State<Orchestrator>,
    Path(id): Path<String>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let id = agent_id(&id)?;
    let relocation = orchestrator.complete_and_relocate(&id).await?;
    Ok(Json(relocation.into()))
}

/// Start reviewing a producer
///
/// POST /agents/:id/start_qa
pub async fn start_qa(
    State(orchestrator): State<Orchestrator>,
    Path(id): Path<String>,
    Json(req): Json<StartQaRequest>,
) -> Result<Json<StartQaResponse>, ApiError> {
    let reviewer_id = agent_id(&id)?;
    let Some(producer) = req.developer_agent_id.filter(|p| !p.is_empty()) else {
        return Err(ApiError::bad_request("Missing developer_agent_id"));
    };
    let producer_id = agent_id(&producer)?;

    let (reviewer, producer) = orchestrator.start_review(&reviewer_id, &producer_id).await?;

    Ok(Json(StartQaResponse {
        message: format!(
            "QA task started for agent {} on developer {}.",
            reviewer.id, producer.id
        ),
        qa_agent_state: reviewer.state,
        developer_agent_state: producer.state,
    }))
}

/// Collect a finished reviewer into a drop-off zone
///
/// POST /agents/:id/complete_qa_and_move
pub async fn complete_qa_and_move(
    State(orchestrator): State<Orchestrator>,
    Path(id): Path<String>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let id = agent_id(&id)?;
    let relocation = orchestrator.complete_review_and_relocate(&id).await?;
    Ok(Json(relocation.into()))
}
