//! JobError → HTTP response mapping.
//!
//! Bodies are `{ "error": ..., "details"?: ..., "retryAfter"?: ... }`.
//! Rate-limit responses also carry a `Retry-After` header.

use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use toolshed_core::JobError;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// Error returned by every handler.
#[derive(Debug)]
pub struct ApiError(pub JobError);

impl From<JobError> for ApiError {
    fn from(e: JobError) -> Self {
        ApiError(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(JobError::InvalidInput(rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            JobError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            JobError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            JobError::ExternalServiceUnavailable(_)
            | JobError::PermanentFailure(_)
            | JobError::ArtifactMissing(_)
            | JobError::DeadlineExceeded(_)
            | JobError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let (error, details) = match &self.0 {
            JobError::InvalidInput(msg) => (msg.clone(), None),
            JobError::RateLimited { message, .. } => (message.clone(), None),
            JobError::ExternalServiceUnavailable(d) => {
                ("External service unavailable".to_string(), Some(d.clone()))
            }
            JobError::PermanentFailure(d) => ("Server error".to_string(), Some(d.clone())),
            JobError::ArtifactMissing(d) => ("Download failed".to_string(), Some(d.clone())),
            err @ JobError::DeadlineExceeded(_) => {
                ("Request timed out".to_string(), Some(err.to_string()))
            }
            // Internal details stay in the log.
            JobError::Internal(_) => ("Something went wrong".to_string(), None),
        };
        ErrorBody {
            error,
            details,
            retry_after: self.0.retry_after_secs(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self.0, "request rejected");
        }

        let body = self.body();
        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = self.0.retry_after_secs() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
