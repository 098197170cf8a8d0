//! Shared HTTP request helpers for CLI commands.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}", port)
}

/// Error body returned by toolshedd.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    details: Option<String>,
    retry_after: Option<u64>,
}

pub async fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    let resp = reqwest::get(url)
        .await
        .with_context(|| format!("failed to connect to toolshedd at {} — is it running?", url))?;
    check(resp)
        .await?
        .json::<T>()
        .await
        .context("failed to parse response")
}

pub async fn post_json_body<T, R>(url: &str, body: &T) -> Result<R>
where
    T: Serialize,
    R: for<'de> Deserialize<'de>,
{
    post(url, body)
        .await?
        .json::<R>()
        .await
        .context("failed to parse response")
}

/// POST a JSON body and return the successful response for streaming.
pub async fn post<T: Serialize>(url: &str, body: &T) -> Result<reqwest::Response> {
    let resp = reqwest::Client::new()
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| format!("failed to connect to toolshedd at {} — is it running?", url))?;
    check(resp).await
}

/// Turn a non-success response into an error carrying the server's message.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => {
            let mut msg = format!("{} ({})", body.error, status.as_u16());
            if let Some(details) = body.details {
                msg.push_str(&format!(": {details}"));
            }
            if let Some(secs) = body.retry_after {
                msg.push_str(&format!(" — retry after {secs}s"));
            }
            bail!(msg)
        }
        Err(_) => bail!("request failed with {}: {}", status, text.trim()),
    }
}
