//! /api/youtube/info and /api/youtube/download handlers.
//!
//! A download is streamed straight from its temp artifact. The artifact
//! guard moves into the body stream, so the file is removed once the body
//! finishes or the client goes away.

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use toolshed_core::{JobError, JobRequest, MediaInfo};
use toolshed_services::{JobResult, MediaDownload};

use super::ApiState;
use crate::error::ApiError;

// ── /api/youtube/info ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct InfoRequest {
    #[serde(default)]
    pub url: Option<String>,
}

pub async fn handle_media_info(
    State(state): State<ApiState>,
    payload: Result<Json<InfoRequest>, JsonRejection>,
) -> Result<Json<MediaInfo>, ApiError> {
    let Json(req) = payload?;
    let info = state
        .orchestrator
        .describe(req.url.as_deref().unwrap_or_default())
        .await?;
    tracing::debug!(title = %info.title, "media info fetched");
    Ok(Json(info))
}

// ── /api/youtube/download ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: Option<String>,
    /// `mp4|mp3|video|audio`.
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
}

pub async fn handle_media_download(
    State(state): State<ApiState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    let request = JobRequest::media(
        req.url.unwrap_or_default(),
        req.format.unwrap_or_default(),
        req.quality.unwrap_or_default(),
    );

    match state.orchestrator.run(request).await? {
        JobResult::Media(download) => stream_download(download).await,
        JobResult::Text { .. } => Err(JobError::Internal("media job produced text".to_string()).into()),
    }
}

async fn stream_download(download: MediaDownload) -> Result<Response, ApiError> {
    let MediaDownload {
        artifact,
        filename,
        content_type,
        size,
    } = download;

    let file = tokio::fs::File::open(artifact.path())
        .await
        .map_err(|e| JobError::ArtifactMissing(format!("{}: {e}", artifact.path().display())))?;

    tracing::info!(filename = %filename, size, "streaming download");
    let stream = ReaderStream::new(file).map(move |chunk| {
        // Capturing `artifact` keeps the file until the body is dropped.
        if let Err(e) = &chunk {
            tracing::error!(path = %artifact.path().display(), error = %e, "download stream failed");
        }
        chunk
    });

    let headers = [
        (
            header::CONTENT_TYPE,
            header_value(&content_type, "application/octet-stream"),
        ),
        (header::CONTENT_LENGTH, HeaderValue::from(size)),
        (
            header::CONTENT_DISPOSITION,
            header_value(&content_disposition(&filename), "attachment"),
        ),
    ];
    Ok((StatusCode::OK, headers, Body::from_stream(stream)).into_response())
}

fn header_value(s: &str, fallback: &'static str) -> HeaderValue {
    HeaderValue::from_str(s).unwrap_or_else(|_| HeaderValue::from_static(fallback))
}

/// `attachment; filename="..."`. Filenames are already reduced to word
/// characters and whitespace; non-ASCII and control characters become `_`.
pub fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '_' })
        .collect();
    format!("attachment; filename=\"{ascii}\"")
}
