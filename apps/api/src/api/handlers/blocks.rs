use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::agents::Orchestrator;
use crate::api::errors::ApiError;
use crate::domain::block::Block;

/// Request body for replacing the board's blocks
#[derive(Debug, Deserialize)]
pub struct SaveBlocksRequest {
    pub blocks: Option<Vec<Block>>,
}

#[derive(Debug, Serialize)]
pub struct SaveBlocksResponse {
    pub ok: bool,
    pub count: usize,
    pub blocks: Vec<Block>,
}

/// List all blocks
///
/// GET /blocks
pub async fn list_blocks(
    State(orchestrator): State<Orchestrator>,
) -> Result<Json<Vec<Block>>, ApiError> {
    Ok(Json(orchestrator.list_blocks().await?))
}

/// Replace every block; blocks without an id get one, missing blocks are deleted
///
/// POST /blocks
pub async fn save_blocks(
    State(orchestrator): State<Orchestrator>,
    Json(req): Json<SaveBlocksRequest>,
) -> Result<Json<SaveBlocksResponse>, ApiError> {
    let Some(blocks) = req.blocks else {
        return Err(ApiError::bad_request("Missing 'blocks' data"));
    };

    let saved = orchestrator.save_blocks(blocks).await?;

    Ok(Json(SaveBlocksResponse {
        ok: true,
        count: saved.len(),
        blocks: saved,
    }))
}
