// API layer module (adapters for controllers)
// Follows Hexagonal Architecture - API is an adapter

pub mod errors;
pub mod handlers;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::agents::Orchestrator;
use handlers::{agents, blocks, board, health, zones};

/// Builds the HTTP router over `orchestrator`
pub fn router(orchestrator: Orchestrator) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Agent routes
        .route("/agents", get(agents::list_agents).post(agents::spawn_agent))
        .route("/agents/:id", delete(agents::delete_agent))
        .route("/agents/:id/move", post(agents::move_agent))
        .route("/agents/:id/interrogate", post(agents::interrogate))
        .route("/agents/:id/complete_and_move", post(agents::complete_and_move))
        .route("/agents/:id/start_qa", post(agents::start_qa))
        .route(
            "/agents/:id/complete_qa_and_move",
            post(agents::complete_qa_and_move),
        )
        // Board routes
        .route("/blocks", get(blocks::list_blocks).post(blocks::save_blocks))
        .route("/zones", get(zones::list_zones).post(zones::save_zones))
        .route("/state", get(board::get_state))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Shared state
        .with_state(orchestrator)
}
