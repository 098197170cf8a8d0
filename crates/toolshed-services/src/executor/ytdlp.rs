//! yt-dlp executor — probes and downloads media by spawning the tool.
//!
//! One subprocess per call, bounded by a per-attempt timeout. The child is
//! spawned with `kill_on_drop`, so a timed-out or cancelled call does not
//! leave the tool running.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use toolshed_core::config::MediaSettings;
use toolshed_core::{ExecError, MediaInfo, MediaSpec, Quality};

use super::MediaFetcher;

#[derive(Debug, Clone)]
pub struct YtDlpSettings {
    pub binary: PathBuf,
    pub ffmpeg: Option<PathBuf>,
    pub attempt_timeout: Duration,
}

impl From<&MediaSettings> for YtDlpSettings {
    fn from(s: &MediaSettings) -> Self {
        Self {
            binary: s.ytdlp_path.clone(),
            ffmpeg: s.ffmpeg_path.clone(),
            attempt_timeout: s.attempt_timeout(),
        }
    }
}

pub struct YtDlpFetcher {
    settings: YtDlpSettings,
}

impl YtDlpFetcher {
    pub fn new(settings: YtDlpSettings) -> Self {
        Self { settings }
    }

    fn probe_args(source: &str) -> Vec<OsString> {
        ["--dump-single-json", "--skip-download", "--no-warnings", "--no-playlist"]
            .into_iter()
            .map(OsString::from)
            .chain(std::iter::once(OsString::from(source)))
            .collect()
    }

    fn download_args(&self, spec: &MediaSpec, dest: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--no-warnings".into(), "--no-playlist".into()];
        match &spec.quality {
            Quality::VideoFormat(format) => {
                args.push("-f".into());
                args.push(format.into());
                args.push("--merge-output-format".into());
                args.push("mp4".into());
            }
            Quality::AudioBitrate(kbps) => {
                args.push("-x".into());
                args.push("--audio-format".into());
                args.push("mp3".into());
                args.push("--audio-quality".into());
                args.push(format!("{kbps}K").into());
            }
        }
        if let Some(ffmpeg) = &self.settings.ffmpeg {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.into());
        }
        args.push("-o".into());
        args.push(output_template(dest));
        args.push(spec.source.as_str().into());
        args
    }

    /// Run the tool once and return its stdout.
    async fn run_tool(&self, args: Vec<OsString>) -> Result<Vec<u8>, ExecError> {
        let start = Instant::now();
        let child = tokio::process::Command::new(&self.settings.binary)
            .args(&args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.settings.attempt_timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ExecError::Failed(format!(
                    "failed to spawn '{}': {}",
                    self.settings.binary.display(),
                    e
                )))
            }
            Err(_) => return Err(ExecError::Timeout(self.settings.attempt_timeout)),
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        if output.status.success() {
            tracing::debug!(elapsed_ms, "yt-dlp finished");
            Ok(output.stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output.status.code().unwrap_or(-1);
            tracing::debug!(elapsed_ms, code, stderr = %stderr.trim(), "yt-dlp failed");
            Err(classify_failure(&stderr, code, self.settings.attempt_timeout))
        }
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn probe(&self, source: &str) -> Result<MediaInfo, ExecError> {
        let stdout = self.run_tool(Self::probe_args(source)).await?;
        MediaInfo::from_probe_json(&stdout)
            .map_err(|e| ExecError::Failed(format!("unreadable probe output: {e}")))
    }

    async fn download(&self, spec: &MediaSpec, dest: &Path) -> Result<(), ExecError> {
        self.run_tool(self.download_args(spec, dest)).await.map(|_| ())
    }
}

/// `{dir}/{stem}.%(ext)s`. The tool picks the extension after conversion,
/// which lands on `dest` when the container matches.
fn output_template(dest: &Path) -> OsString {
    dest.with_extension("%(ext)s").into_os_string()
}

/// Map the tool's stderr to an error kind.
pub fn classify_failure(stderr: &str, code: i32, timeout: Duration) -> ExecError {
    let lower = stderr.to_ascii_lowercase();
    let detail = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(|l| l.trim().to_string())
        .unwrap_or_else(|| format!("exit code {code}"));

    const OVERLOADED: &[&str] = &["http error 429", "too many requests", "rate-limit", "rate limit"];
    const TIMEOUT: &[&str] = &["timed out", "read timeout"];
    const UNREACHABLE: &[&str] = &[
        "name or service not known",
        "temporary failure in name resolution",
        "getaddrinfo failed",
        "nodename nor servname",
        "connection refused",
        "network is unreachable",
        "failed to resolve",
    ];
    const INVALID: &[&str] = &[
        "unsupported url",
        "is not a valid url",
        "incomplete youtube id",
        "video unavailable",
        "private video",
        "requested format is not available",
    ];

    let hit = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));
    if hit(OVERLOADED) {
        ExecError::Overloaded(detail)
    } else if hit(TIMEOUT) {
        ExecError::Timeout(timeout)
    } else if hit(UNREACHABLE) {
        ExecError::Unreachable(detail)
    } else if hit(INVALID) {
        ExecError::InvalidInput(detail)
    } else {
        ExecError::Failed(detail)
    }
}
