//! toolshed integration test harness.
//!
//! Each test starts the real HTTP API in-process on an ephemeral port, backed
//! by scripted executors instead of yt-dlp and Gemini:
//!
//!   cargo test --test integration
//!
//! Every server gets its own temp directory, so tests can run in parallel.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use toolshed_api::ApiState;
use toolshed_core::config::ToolshedConfig;
use toolshed_core::{ExecError, MediaInfo, MediaSpec};
use toolshed_services::{ArtifactStore, MediaFetcher, Orchestrator, TextGenerator};

mod chat;
mod media;
mod status;

// ── Scripted executors ────────────────────────────────────────────────────────

/// Media fetcher that writes `payload` on success and replays scripted
/// failures first.
pub struct FakeFetcher {
    pub payload: Vec<u8>,
    pub failures: Mutex<VecDeque<ExecError>>,
    pub downloads: AtomicUsize,
}

impl FakeFetcher {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            failures: Mutex::new(VecDeque::new()),
            downloads: AtomicUsize::new(0),
        }
    }

    pub fn failing_with(self, errors: Vec<ExecError>) -> Self {
        *self.failures.lock().unwrap() = errors.into();
        self
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn probe(&self, _source: &str) -> Result<MediaInfo, ExecError> {
        let raw = br#"{
            "title": "Portfolio Demo: Part 1",
            "duration": 3725,
            "uploader": "someone",
            "upload_date": "20240101",
            "thumbnail": "https://i.ytimg.com/vi/abc/hq.jpg",
            "formats": [{"format_id": "18", "ext": "mp4", "resolution": "640x360", "fps": 30}]
        }"#;
        Ok(MediaInfo::from_probe_json(raw).expect("fixture parses"))
    }

    async fn download(&self, _spec: &MediaSpec, dest: &Path) -> Result<(), ExecError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        std::fs::write(dest, b"partial").expect("write partial");
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        std::fs::write(dest, &self.payload).expect("write payload");
        Ok(())
    }
}

/// Text generator that echoes the last line of the context after replaying
/// scripted failures.
#[derive(Default)]
pub struct FakeGenerator {
    pub failures: Mutex<VecDeque<ExecError>>,
    pub calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn failing_with(errors: Vec<ExecError>) -> Self {
        Self {
            failures: Mutex::new(errors.into()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ExecError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let question = prompt.lines().last().unwrap_or_default();
        Ok(format!("echo: {question}"))
    }
}

// ── Harness ───────────────────────────────────────────────────────────────────

static SERVER_ID: AtomicU64 = AtomicU64::new(0);

/// Config with short retry delays so failure paths stay fast.
pub fn test_config() -> ToolshedConfig {
    let mut config = ToolshedConfig::default();
    config.retry.delay_ms = 10;
    config
}

pub struct TestServer {
    pub base: String,
    pub temp_dir: PathBuf,
    pub state: ApiState,
    pub client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start(
        config: ToolshedConfig,
        fetcher: Arc<FakeFetcher>,
        generator: Arc<FakeGenerator>,
    ) -> Result<Self> {
        let id = SERVER_ID.fetch_add(1, Ordering::Relaxed);
        let temp_dir = std::env::temp_dir().join(format!(
            "toolshed-integration-{}-{}",
            std::process::id(),
            id
        ));
        let _ = std::fs::remove_dir_all(&temp_dir);
        let artifacts = ArtifactStore::new(&temp_dir)?;

        let orchestrator = Orchestrator::new(
            &config,
            fetcher,
            generator,
            artifacts,
            "Ada builds backends in Rust.".to_string(),
        );
        let state = ApiState::new(orchestrator);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();
        let server_state = state.clone();
        tokio::spawn(async move {
            let shutdown = async {
                let _ = rx.await;
            };
            if let Err(e) = toolshed_api::serve_on(listener, server_state, shutdown).await {
                eprintln!("test server failed: {e:#}");
            }
        });

        Ok(Self {
            base: format!("http://{addr}"),
            temp_dir,
            state,
            client: reqwest::Client::new(),
            shutdown: Some(tx),
        })
    }

    pub async fn with_defaults() -> Result<Self> {
        Self::start(
            test_config(),
            Arc::new(FakeFetcher::new(b"media bytes".to_vec())),
            Arc::new(FakeGenerator::default()),
        )
        .await
    }

    pub async fn post(&self, path: &str, body: serde_json::Value) -> Result<reqwest::Response> {
        self.client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {path}"))
    }

    pub async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        self.client
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .with_context(|| format!("GET {path}"))?
            .json()
            .await
            .context("response was not JSON")
    }

    /// Files currently in the temp artifact directory.
    pub fn temp_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(&self.temp_dir)
            .map(|entries| entries.flatten().map(|e| e.path()).collect())
            .unwrap_or_default()
    }

    /// Wait until every artifact is released. The body stream is dropped
    /// just after the last byte reaches the client.
    pub async fn wait_for_cleanup(&self) -> Result<()> {
        for _ in 0..100 {
            if self.state.orchestrator.status().live_artifacts == 0 && self.temp_files().is_empty() {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        anyhow::bail!(
            "artifacts still live: {} (files: {:?})",
            self.state.orchestrator.status().live_artifacts,
            self.temp_files()
        )
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = std::fs::remove_dir_all(&self.temp_dir);
    }
}
