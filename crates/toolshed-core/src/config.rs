//! Configuration system for toolshed.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $TOOLSHED_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/toolshed/config.toml
//!   3. ~/.config/toolshed/config.toml
//!
//! Secrets never live in the file: the text-generation API key is read from
//! `GEMINI_API_KEY` only.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolshedConfig {
    pub server: ServerConfig,
    pub limits: LimitsConfig,
    pub retry: RetryConfig,
    pub media: MediaSettings,
    pub chat: ChatSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP API on.
    pub bind: String,
    pub port: u16,
}

/// Fixed-window admission per job kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub chat: WindowConfig,
    pub media: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Jobs allowed to start per window.
    pub limit: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first.
    pub max_attempts: u32,
    pub delay_ms: u64,
    /// Cap for exponential backoff. Ignored for fixed.
    pub max_delay_ms: u64,
    pub backoff: BackoffKind,
    /// 0.0-1.0, fraction of the delay added as random jitter.
    pub jitter: f64,
    /// Retry-after hint given to clients when upstream overload persists.
    pub upstream_retry_after_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    /// Path or name of the yt-dlp binary.
    pub ytdlp_path: PathBuf,
    /// Passed as --ffmpeg-location when set.
    pub ffmpeg_path: Option<PathBuf>,
    /// Shared directory for temp artifacts.
    pub temp_dir: PathBuf,
    pub attempt_timeout_secs: u64,
    /// Overall budget covering every attempt of one job.
    pub deadline_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub model: String,
    pub endpoint: String,
    /// Knowledge base prepended to every prompt. Missing file = empty.
    pub knowledge_path: PathBuf,
    /// Conversation turns retained (user and assistant each count as one).
    pub history_turns: usize,
    pub attempt_timeout_secs: u64,
    pub deadline_secs: u64,
    /// Populated from GEMINI_API_KEY; never serialized.
    #[serde(skip)]
    pub api_key: Option<String>,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        // Below the upstream free tier of 15/minute.
        Self {
            limit: 12,
            window_secs: 60,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 5_000,
            max_delay_ms: 30_000,
            backoff: BackoffKind::Fixed,
            jitter: 0.0,
            upstream_retry_after_secs: 60,
        }
    }
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            ytdlp_path: PathBuf::from("yt-dlp"),
            ffmpeg_path: None,
            temp_dir: std::env::temp_dir().join("toolshed-downloads"),
            attempt_timeout_secs: 300,
            deadline_secs: 900,
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            knowledge_path: config_dir().join("knowledge.txt"),
            history_turns: 10,
            attempt_timeout_secs: 30,
            deadline_secs: 60,
            api_key: None,
        }
    }
}

impl WindowConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn upstream_retry_after(&self) -> Duration {
        Duration::from_secs(self.upstream_retry_after_secs)
    }
}

impl MediaSettings {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

impl ChatSettings {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

pub fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("toolshed")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl ToolshedConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path(), |key| std::env::var(key).ok())
    }

    /// Load from `path` (defaults if absent), then apply overrides from `lookup`.
    pub fn load_from(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            ToolshedConfig::default()
        };
        config.apply_env(lookup);
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("TOOLSHED_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        Self::write_default_at(&path)?;
        Ok(path)
    }

    /// Write default config to `path` unless a file is already there.
    pub fn write_default_at(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        }
        let text = toml::to_string_pretty(&ToolshedConfig::default())
            .map_err(ConfigError::SerializeFailed)?;
        std::fs::write(path, text).map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))
    }

    /// Apply overrides and secrets from a variable lookup.
    ///
    /// Every setting can be overridden as `TOOLSHED_<SECTION>__<KEY>`, with
    /// window settings under `TOOLSHED_LIMITS__{CHAT,MEDIA}_<KEY>`. Values
    /// that fail to parse are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let env = &lookup;
        override_from(env, "TOOLSHED_SERVER__BIND", &mut self.server.bind);
        override_from(env, "TOOLSHED_SERVER__PORT", &mut self.server.port);

        override_from(env, "TOOLSHED_LIMITS__CHAT_LIMIT", &mut self.limits.chat.limit);
        override_from(env, "TOOLSHED_LIMITS__CHAT_WINDOW_SECS", &mut self.limits.chat.window_secs);
        override_from(env, "TOOLSHED_LIMITS__MEDIA_LIMIT", &mut self.limits.media.limit);
        override_from(env, "TOOLSHED_LIMITS__MEDIA_WINDOW_SECS", &mut self.limits.media.window_secs);

        override_from(env, "TOOLSHED_RETRY__MAX_ATTEMPTS", &mut self.retry.max_attempts);
        override_from(env, "TOOLSHED_RETRY__DELAY_MS", &mut self.retry.delay_ms);
        override_from(env, "TOOLSHED_RETRY__MAX_DELAY_MS", &mut self.retry.max_delay_ms);
        override_from(env, "TOOLSHED_RETRY__BACKOFF", &mut self.retry.backoff);
        override_from(env, "TOOLSHED_RETRY__JITTER", &mut self.retry.jitter);
        override_from(
            env,
            "TOOLSHED_RETRY__UPSTREAM_RETRY_AFTER_SECS",
            &mut self.retry.upstream_retry_after_secs,
        );

        override_from(env, "TOOLSHED_MEDIA__YTDLP_PATH", &mut self.media.ytdlp_path);
        if let Some(v) = lookup("TOOLSHED_MEDIA__FFMPEG_PATH") {
            self.media.ffmpeg_path = Some(PathBuf::from(v));
        }
        override_from(env, "TOOLSHED_MEDIA__TEMP_DIR", &mut self.media.temp_dir);
        override_from(env, "TOOLSHED_MEDIA__ATTEMPT_TIMEOUT_SECS", &mut self.media.attempt_timeout_secs);
        override_from(env, "TOOLSHED_MEDIA__DEADLINE_SECS", &mut self.media.deadline_secs);

        override_from(env, "TOOLSHED_CHAT__MODEL", &mut self.chat.model);
        override_from(env, "TOOLSHED_CHAT__ENDPOINT", &mut self.chat.endpoint);
        override_from(env, "TOOLSHED_CHAT__KNOWLEDGE_PATH", &mut self.chat.knowledge_path);
        override_from(env, "TOOLSHED_CHAT__HISTORY_TURNS", &mut self.chat.history_turns);
        override_from(env, "TOOLSHED_CHAT__ATTEMPT_TIMEOUT_SECS", &mut self.chat.attempt_timeout_secs);
        override_from(env, "TOOLSHED_CHAT__DEADLINE_SECS", &mut self.chat.deadline_secs);

        if let Some(v) = lookup("GEMINI_API_KEY") {
            if !v.is_empty() {
                self.chat.api_key = Some(v);
            }
        }
    }
}

/// Replace `slot` with the parsed value of `key`, if set and valid.
fn override_from<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) {
    if let Some(parsed) = lookup(key).and_then(|v| v.trim().parse().ok()) {
        *slot = parsed;
    }
}

impl FromStr for BackoffKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(BackoffKind::Fixed),
            "exponential" => Ok(BackoffKind::Exponential),
            other => Err(format!("unknown backoff '{other}'")),
        }
    }
}
