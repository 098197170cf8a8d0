//! Chat command.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::http::{base_url, post_json_body};

#[derive(Serialize)]
struct ChatRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

pub async fn cmd_chat(port: u16, prompt: &str) -> Result<()> {
    let resp: ChatResponse =
        post_json_body(&format!("{}/chat", base_url(port)), &ChatRequest { prompt }).await?;
    println!("{}", resp.response);
    Ok(())
}
