//! /chat handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use toolshed_core::{JobError, JobRequest};
use toolshed_services::JobResult;

use super::ApiState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

pub async fn handle_chat(
    State(state): State<ApiState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload?;
    let request = JobRequest::text(req.prompt.unwrap_or_default());

    match state.orchestrator.run(request).await? {
        JobResult::Text { text } => Ok(Json(ChatResponse { response: text })),
        JobResult::Media(_) => Err(JobError::Internal("text job produced media".to_string()).into()),
    }
}
