//! Daemon status command.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};

#[derive(Deserialize)]
struct LimiterStatus {
    count: u32,
    limit: u32,
}

#[derive(Deserialize)]
struct StatusResponse {
    chat: LimiterStatus,
    media: LimiterStatus,
    history_turns: usize,
    history_cap: usize,
    live_artifacts: usize,
}

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/api/status", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  Toolshed Daemon Status");
    println!("═══════════════════════════════════════");
    println!("  Chat window      : {}/{}", resp.chat.count, resp.chat.limit);
    println!("  Media window     : {}/{}", resp.media.count, resp.media.limit);
    println!("  History turns    : {}/{}", resp.history_turns, resp.history_cap);
    println!("  Live artifacts   : {}", resp.live_artifacts);

    Ok(())
}
