use axum::{extract::State, Json};

use crate::agents::{BoardSnapshot, Orchestrator};
use crate::api::errors::ApiError;

/// Blocks, agents and zones in one response
///
/// GET /state
pub async fn get_state(
    State(orchestrator): State<Orchestrator>,
) -> Result<Json<BoardSnapshot>, ApiError> {
    Ok(Json(orchestrator.snapshot().await?))
}
