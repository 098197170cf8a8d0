//! Media metadata returned by a probe, and helpers for naming downloads.

use serde::{Deserialize, Serialize};

/// Trimmed-down video description, kept light for the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    pub title: String,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    /// Rendered `M:SS` or `H:MM:SS`.
    pub duration: String,
    pub channel: Option<String>,
    pub upload_date: Option<String>,
    pub formats: Vec<FormatInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatInfo {
    pub format_id: String,
    pub ext: Option<String>,
    pub resolution: Option<String>,
    pub fps: Option<f64>,
}

/// Subset of yt-dlp's `--dump-single-json` output.
#[derive(Debug, Deserialize)]
struct ProbeJson {
    #[serde(default)]
    title: Option<String>,
    thumbnail: Option<String>,
    description: Option<String>,
    duration: Option<f64>,
    channel: Option<String>,
    uploader: Option<String>,
    upload_date: Option<String>,
    #[serde(default)]
    formats: Vec<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_id: String,
    ext: Option<String>,
    resolution: Option<String>,
    fps: Option<f64>,
}

impl MediaInfo {
    /// Parse a probe dump. Fails only on malformed JSON.
    pub fn from_probe_json(raw: &[u8]) -> Result<Self, serde_json::Error> {
        let probe: ProbeJson = serde_json::from_slice(raw)?;
        Ok(Self {
            title: probe.title.unwrap_or_default(),
            thumbnail: probe.thumbnail,
            description: probe.description,
            duration: format_duration(probe.duration),
            channel: probe.channel.or(probe.uploader),
            upload_date: probe.upload_date,
            formats: probe
                .formats
                .into_iter()
                .map(|f| FormatInfo {
                    format_id: f.format_id,
                    ext: f.ext,
                    resolution: f.resolution,
                    fps: f.fps,
                })
                .collect(),
        })
    }
}

/// Seconds → `M:SS` or `H:MM:SS`. Missing or zero → "Unknown duration".
pub fn format_duration(seconds: Option<f64>) -> String {
    let total = match seconds {
        Some(s) if s > 0.0 => s as u64,
        _ => return "Unknown duration".to_string(),
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Download filename from a video title: keeps word characters and
/// whitespace, falls back to `youtube_video`.
pub fn download_filename(title: &str, extension: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    let cleaned = cleaned.trim();
    let stem = if cleaned.is_empty() {
        "youtube_video"
    } else {
        cleaned
    };
    format!("{stem}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_formats() {
        assert_eq!(format_duration(None), "Unknown duration");
        assert_eq!(format_duration(Some(0.0)), "Unknown duration");
        assert_eq!(format_duration(Some(65.0)), "1:05");
        assert_eq!(format_duration(Some(3725.9)), "1:02:05");
    }

    #[test]
    fn filename_strips_punctuation() {
        assert_eq!(download_filename("Rick: Never \"Gonna\"!", "mp3"), "Rick Never Gonna.mp3");
        assert_eq!(download_filename("?!", "mp4"), "youtube_video.mp4");
    }

    #[test]
    fn probe_json_falls_back_to_uploader() {
        let raw = br#"{
            "title": "Demo",
            "duration": 61,
            "uploader": "someone",
            "upload_date": "20240101",
            "formats": [{"format_id": "18", "ext": "mp4", "resolution": "640x360", "fps": 30}]
        }"#;
        let info = MediaInfo::from_probe_json(raw).unwrap();
        assert_eq!(info.title, "Demo");
        assert_eq!(info.duration, "1:01");
        assert_eq!(info.channel.as_deref(), Some("someone"));
        assert_eq!(info.formats.len(), 1);
        assert_eq!(info.formats[0].format_id, "18");
    }

    #[test]
    fn info_serializes_camel_case() {
        let info = MediaInfo::from_probe_json(br#"{"title":"x","upload_date":"20200202"}"#).unwrap();
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["uploadDate"], "20200202");
        assert_eq!(json["duration"], "Unknown duration");
    }
}
