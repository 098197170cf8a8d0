//! toolshed-services — the bounded job execution core.
//!
//! Rate limiting, retries, temp artifacts, conversation history, the
//! external executors, and the orchestrator that drives them per request.

pub mod artifact;
pub mod executor;
pub mod history;
pub mod orchestrator;
pub mod rate_limit;
pub mod retry;

pub use artifact::{ArtifactStore, TempArtifact};
pub use executor::{GeminiGenerator, GeminiSettings, MediaFetcher, TextGenerator, YtDlpFetcher, YtDlpSettings};
pub use history::{ConversationHistory, PendingTurn, Role, Turn};
pub use orchestrator::{JobResult, LimiterStatus, MediaDownload, Orchestrator, OrchestratorStatus};
pub use rate_limit::{Admission, FixedWindowLimiter};
pub use retry::{Backoff, RetryDecision, RetryPolicy, RetryState};
