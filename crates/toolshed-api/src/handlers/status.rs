//! /api/status handler.

use axum::extract::State;
use axum::Json;

use toolshed_services::OrchestratorStatus;

use super::ApiState;

pub async fn handle_status(State(state): State<ApiState>) -> Json<OrchestratorStatus> {
    Json(state.orchestrator.status())
}
