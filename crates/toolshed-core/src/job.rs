//! Job requests and their validated forms.
//!
//! A `JobRequest` is the untyped value built per inbound call. The
//! orchestrator validates it into a `MediaSpec` or a prompt before any
//! rate-limit budget is consumed.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::JobError;

/// Well-known parameter keys.
pub mod params {
    pub const SOURCE: &str = "source";
    pub const OUTPUT: &str = "output";
    pub const QUALITY: &str = "quality";
    pub const PROMPT: &str = "prompt";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    StreamingMediaFetch,
    TextGeneration,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::StreamingMediaFetch => "media",
            JobKind::TextGeneration => "text",
        }
    }
}

/// One unit of work, created per inbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    kind: JobKind,
    parameters: BTreeMap<String, String>,
}

impl JobRequest {
    pub fn new(kind: JobKind, parameters: BTreeMap<String, String>) -> Self {
        Self { kind, parameters }
    }

    /// Media download request. `output` is `video|mp4` or `audio|mp3`.
    pub fn media(source: impl Into<String>, output: impl Into<String>, quality: impl Into<String>) -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert(params::SOURCE.to_string(), source.into());
        parameters.insert(params::OUTPUT.to_string(), output.into());
        parameters.insert(params::QUALITY.to_string(), quality.into());
        Self::new(JobKind::StreamingMediaFetch, parameters)
    }

    pub fn text(prompt: impl Into<String>) -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert(params::PROMPT.to_string(), prompt.into());
        Self::new(JobKind::TextGeneration, parameters)
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// Required, non-blank parameter.
    fn required(&self, key: &str, what: &str) -> Result<&str, JobError> {
        match self.param(key) {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(JobError::InvalidInput(format!("{what} is required"))),
        }
    }

    /// Validated prompt of a text-generation request.
    pub fn prompt(&self) -> Result<&str, JobError> {
        self.required(params::PROMPT, "Prompt")
    }
}

// ── Media ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Video,
    Audio,
}

impl OutputKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" | "mp4" => Some(OutputKind::Video),
            "audio" | "mp3" => Some(OutputKind::Audio),
            _ => None,
        }
    }

    /// Container extension of the produced file.
    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::Video => "mp4",
            OutputKind::Audio => "mp3",
        }
    }

    pub fn content_type(self) -> String {
        mime_guess::from_ext(self.extension())
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string()
    }
}

/// Translated quality selection for the download tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Quality {
    /// yt-dlp `-f` format selector.
    VideoFormat(String),
    /// Audio bitrate in kbps.
    AudioBitrate(u32),
}

impl Quality {
    /// Map a client quality label to tool parameters. Unknown labels fall
    /// back to best video / 192 kbps.
    pub fn for_output(output: OutputKind, label: &str) -> Self {
        match output {
            OutputKind::Video => {
                let height = match label.trim() {
                    "4k" | "2160p" => Some(2160),
                    "1080p" => Some(1080),
                    "720p" => Some(720),
                    "480p" => Some(480),
                    _ => None,
                };
                Quality::VideoFormat(match height {
                    Some(h) => format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]"),
                    None => "bestvideo+bestaudio/best".to_string(),
                })
            }
            OutputKind::Audio => {
                let kbps = match label.trim() {
                    "320" => 320,
                    "256" => 256,
                    "128" => 128,
                    "64" => 64,
                    _ => 192,
                };
                Quality::AudioBitrate(kbps)
            }
        }
    }
}

/// Validated media download parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSpec {
    /// Cleaned source URL (query string trimmed at the first `&`).
    pub source: String,
    pub output: OutputKind,
    pub quality: Quality,
}

impl MediaSpec {
    pub fn from_request(request: &JobRequest) -> Result<Self, JobError> {
        let source = request.required(params::SOURCE, "URL")?;
        let output_raw = request.required(params::OUTPUT, "Format")?;
        let output = OutputKind::parse(output_raw).ok_or_else(|| {
            JobError::InvalidInput(format!("Invalid format '{output_raw}'. Use mp3 or mp4."))
        })?;
        let source = validate_source(source)?;
        let quality = Quality::for_output(output, request.param(params::QUALITY).unwrap_or(""));
        Ok(Self {
            source,
            output,
            quality,
        })
    }
}

fn source_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(https?://)?(www\.)?(youtube\.com|youtu\.be)/.+").expect("static regex")
    })
}

/// Check a source URL and strip playlist/query tails after the first `&`.
pub fn validate_source(url: &str) -> Result<String, JobError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(JobError::InvalidInput("URL is required".to_string()));
    }
    if !source_pattern().is_match(url) {
        return Err(JobError::InvalidInput("Invalid YouTube link".to_string()));
    }
    Ok(url.split('&').next().unwrap_or(url).to_string())
}
