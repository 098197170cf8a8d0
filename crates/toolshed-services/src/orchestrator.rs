//! Request orchestrator — drives one job from validation to cleanup.
//!
//! Per request:
//!   validate → rate check → prepare artifact (media only)
//!   → execute under the retry policy inside an overall deadline
//!   → success, or rollback → cleanup
//!
//! Validation runs before the rate check, so malformed input never costs
//! budget. Cleanup is carried by guards: the `TempArtifact` removes its file
//! when dropped and the `PendingTurn` retracts the user turn unless the reply
//! was committed. Both run on deadline expiry, since `tokio::time::timeout`
//! drops the in-flight future.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use toolshed_core::config::ToolshedConfig;
use toolshed_core::media::download_filename;
use toolshed_core::{JobError, JobKind, JobRequest, MediaInfo, MediaSpec};

use crate::artifact::{ArtifactStore, TempArtifact};
use crate::executor::{MediaFetcher, TextGenerator};
use crate::history::{build_context, ConversationHistory};
use crate::rate_limit::{Admission, FixedWindowLimiter};
use crate::retry::{GaveUp, RetryPolicy};

/// Outcome of a successful job. The caller owns it outright.
#[derive(Debug)]
pub enum JobResult {
    Media(MediaDownload),
    Text { text: String },
}

/// A finished download. The file lives until `artifact` is dropped.
#[derive(Debug)]
pub struct MediaDownload {
    pub artifact: TempArtifact,
    /// Suggested client filename, e.g. `My Clip.mp4`.
    pub filename: String,
    pub content_type: String,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LimiterStatus {
    pub count: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    pub chat: LimiterStatus,
    pub media: LimiterStatus,
    pub history_turns: usize,
    pub history_cap: usize,
    pub live_artifacts: usize,
}

pub struct Orchestrator {
    fetcher: Arc<dyn MediaFetcher>,
    generator: Arc<dyn TextGenerator>,
    media_limiter: FixedWindowLimiter,
    chat_limiter: FixedWindowLimiter,
    retry: RetryPolicy,
    artifacts: ArtifactStore,
    history: ConversationHistory,
    knowledge: String,
    media_deadline: Duration,
    chat_deadline: Duration,
    upstream_retry_after: Duration,
}

impl Orchestrator {
    pub fn new(
        config: &ToolshedConfig,
        fetcher: Arc<dyn MediaFetcher>,
        generator: Arc<dyn TextGenerator>,
        artifacts: ArtifactStore,
        knowledge: String,
    ) -> Self {
        Self {
            fetcher,
            generator,
            media_limiter: FixedWindowLimiter::new(
                config.limits.media.limit,
                config.limits.media.window(),
            ),
            chat_limiter: FixedWindowLimiter::new(
                config.limits.chat.limit,
                config.limits.chat.window(),
            ),
            retry: RetryPolicy::from_config(&config.retry),
            artifacts,
            history: ConversationHistory::new(config.chat.history_turns),
            knowledge,
            media_deadline: config.media.deadline(),
            chat_deadline: config.chat.deadline(),
            upstream_retry_after: config.retry.upstream_retry_after(),
        }
    }

    /// Run one job to completion.
    pub async fn run(&self, request: JobRequest) -> Result<JobResult, JobError> {
        let kind = request.kind();
        let result = match kind {
            JobKind::StreamingMediaFetch => {
                let spec = MediaSpec::from_request(&request)?;
                self.admit(&self.media_limiter, kind)?;
                self.fetch_media(spec).await.map(JobResult::Media)
            }
            JobKind::TextGeneration => {
                let prompt = request.prompt()?;
                self.admit(&self.chat_limiter, kind)?;
                self.generate_text(prompt)
                    .await
                    .map(|text| JobResult::Text { text })
            }
        };

        match &result {
            Ok(_) => tracing::info!(job = kind.as_str(), "job succeeded"),
            Err(e) => tracing::warn!(job = kind.as_str(), error = %e, "job failed"),
        }
        result
    }

    /// Probe a source without downloading. Charged against the media budget.
    pub async fn describe(&self, source: &str) -> Result<MediaInfo, JobError> {
        let source = toolshed_core::job::validate_source(source)?;
        self.admit(&self.media_limiter, JobKind::StreamingMediaFetch)?;

        let work = self
            .retry
            .run("media.probe", |_| self.fetcher.probe(&source));
        match tokio::time::timeout(self.media_deadline, work).await {
            Ok(Ok(info)) => Ok(info),
            Ok(Err(gave_up)) => Err(self.classify(gave_up)),
            Err(_) => Err(JobError::DeadlineExceeded(self.media_deadline)),
        }
    }

    pub fn status(&self) -> OrchestratorStatus {
        let (chat_count, chat_limit) = self.chat_limiter.snapshot();
        let (media_count, media_limit) = self.media_limiter.snapshot();
        OrchestratorStatus {
            chat: LimiterStatus {
                count: chat_count,
                limit: chat_limit,
            },
            media: LimiterStatus {
                count: media_count,
                limit: media_limit,
            },
            history_turns: self.history.len(),
            history_cap: self.history.cap(),
            live_artifacts: self.artifacts.live(),
        }
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    fn admit(&self, limiter: &FixedWindowLimiter, kind: JobKind) -> Result<(), JobError> {
        match limiter.try_acquire() {
            Admission::Allowed => Ok(()),
            Admission::Denied { retry_after } => {
                tracing::info!(
                    job = kind.as_str(),
                    retry_after_secs = retry_after.as_secs(),
                    "rate limited"
                );
                Err(JobError::local_rate_limit(retry_after))
            }
        }
    }

    fn classify(&self, gave_up: GaveUp) -> JobError {
        tracing::debug!(attempts = gave_up.attempts, reason = ?gave_up.reason, "retry loop ended");
        JobError::from_exec(gave_up.error, gave_up.reason, self.upstream_retry_after)
    }

    async fn fetch_media(&self, spec: MediaSpec) -> Result<MediaDownload, JobError> {
        let ext = spec.output.extension();
        let artifact = self.artifacts.acquire(ext);
        let dest = artifact.path().to_path_buf();

        let work = async {
            let info = self
                .retry
                .run("media.probe", |_| self.fetcher.probe(&spec.source))
                .await
                .map_err(|g| self.classify(g))?;
            // Every attempt writes to the same path.
            self.retry
                .run("media.download", |_| self.fetcher.download(&spec, &dest))
                .await
                .map_err(|g| self.classify(g))?;
            Ok::<_, JobError>(info)
        };

        let info = match tokio::time::timeout(self.media_deadline, work).await {
            Ok(result) => result?,
            Err(_) => return Err(JobError::DeadlineExceeded(self.media_deadline)),
        };

        let size = match tokio::fs::metadata(&dest).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => {
                return Err(JobError::ArtifactMissing(format!(
                    "download reported success but {} is missing",
                    dest.display()
                )))
            }
        };

        tracing::debug!(path = %dest.display(), size, "media ready");
        Ok(MediaDownload {
            artifact,
            filename: download_filename(&info.title, ext),
            content_type: spec.output.content_type(),
            size,
        })
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, JobError> {
        let (pending, prior) = self.history.begin(prompt);
        let context = build_context(&self.knowledge, &prior, prompt);

        let work = self
            .retry
            .run("text.generate", |_| self.generator.generate(&context));
        match tokio::time::timeout(self.chat_deadline, work).await {
            Ok(Ok(reply)) => {
                pending.commit(reply.clone());
                Ok(reply)
            }
            Ok(Err(gave_up)) => {
                pending.retract();
                Err(self.classify(gave_up))
            }
            Err(_) => {
                pending.retract();
                Err(JobError::DeadlineExceeded(self.chat_deadline))
            }
        }
    }
}
