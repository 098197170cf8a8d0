//! Media info and download commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use super::http::{base_url, post, post_json_body};

#[derive(Serialize)]
struct InfoRequest<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InfoResponse {
    title: String,
    duration: String,
    channel: Option<String>,
    upload_date: Option<String>,
    #[serde(default)]
    formats: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct DownloadRequest<'a> {
    url: &'a str,
    format: &'a str,
    quality: &'a str,
}

pub async fn cmd_info(port: u16, url: &str) -> Result<()> {
    let resp: InfoResponse =
        post_json_body(&format!("{}/api/youtube/info", base_url(port)), &InfoRequest { url }).await?;

    println!("═══════════════════════════════════════");
    println!("  {}", resp.title);
    println!("═══════════════════════════════════════");
    println!("  Duration : {}", resp.duration);
    println!("  Channel  : {}", resp.channel.as_deref().unwrap_or("-"));
    println!("  Uploaded : {}", resp.upload_date.as_deref().unwrap_or("-"));
    println!("  Formats  : {}", resp.formats.len());

    Ok(())
}

pub async fn cmd_download(
    port: u16,
    url: &str,
    format: &str,
    quality: &str,
    out_dir: &Path,
) -> Result<()> {
    let mut resp = post(
        &format!("{}/api/youtube/download", base_url(port)),
        &DownloadRequest { url, format, quality },
    )
    .await?;

    let filename = resp
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(filename_from_disposition)
        .unwrap_or_else(|| format!("download.{format}"));
    let path: PathBuf = out_dir.join(&filename);

    let mut file = tokio::fs::File::create(&path)
        .await
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut written: u64 = 0;
    while let Some(chunk) = resp.chunk().await.context("download interrupted")? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    println!("Saved {} ({:.1} MB)", path.display(), written as f64 / (1024.0 * 1024.0));
    Ok(())
}

/// `attachment; filename="x.mp4"` → `x.mp4`.
fn filename_from_disposition(value: &str) -> Option<String> {
    let start = value.find("filename=")? + "filename=".len();
    let name = value[start..].trim().trim_matches('"');
    // Never write outside the chosen directory.
    let name = Path::new(name).file_name()?.to_str()?;
    (!name.is_empty()).then(|| name.to_string())
}
