use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::agents::Orchestrator;
use crate::api::errors::ApiError;
use crate::domain::zone::Zone;

/// Request body for replacing the zone layout
#[derive(Debug, Deserialize)]
pub struct SaveZonesRequest {
    pub zones: Option<Vec<Zone>>,
}

#[derive(Debug, Serialize)]
pub struct SaveZonesResponse {
    pub message: String,
}

/// Current zone layout (defaults if none was saved)
///
/// GET /zones
pub async fn list_zones(
    State(orchestrator): State<Orchestrator>,
) -> Result<Json<Vec<Zone>>, ApiError> {
    Ok(Json(orchestrator.list_zones().await?))
}

/// POST /zones
pub async fn save_zones(
    State(orchestrator): State<Orchestrator>,
    Json(req): Json<SaveZonesRequest>,
) -> Result<Json<SaveZonesResponse>, ApiError> {
    let Some(zones) = req.zones else {
        return Err(ApiError::bad_request(
            "Invalid data format. Expected {'zones': [...]}",
        ));
    };

    let saved = orchestrator.save_zones(zones).await?;

    Ok(Json(SaveZonesResponse {
        message: format!("Saved {} zone positions.", saved.len()),
    }))
}
