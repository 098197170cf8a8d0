//! Job executors — the external calls behind each job kind.
//!
//! Executors make exactly one attempt per call and report failures as typed
//! `ExecError`s. Retrying, deadlines, and temp-file cleanup belong to the
//! orchestrator; an executor never deletes the artifact it writes.

pub mod gemini;
pub mod ytdlp;

use std::path::Path;

use async_trait::async_trait;
use toolshed_core::{ExecError, MediaInfo, MediaSpec};

pub use gemini::{GeminiGenerator, GeminiSettings};
pub use ytdlp::{YtDlpFetcher, YtDlpSettings};

/// Fetches media from a source URL through a file-based tool.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Read metadata without downloading.
    async fn probe(&self, source: &str) -> Result<MediaInfo, ExecError>;

    /// Download and convert `spec` into the file at `dest`.
    async fn download(&self, spec: &MediaSpec, dest: &Path) -> Result<(), ExecError>;
}

/// Generates a text reply for a fully built prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ExecError>;
}
