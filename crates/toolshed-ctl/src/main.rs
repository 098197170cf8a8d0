//! toolshed-ctl — command-line interface for the toolshed daemon.

mod cmd;

use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 3001;

fn print_usage() {
    println!("Usage: toolshed-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  status                                Show limiter windows, history, and live artifacts");
    println!("  chat <prompt...>                      Ask the portfolio assistant");
    println!("  info <url>                            Show video metadata");
    println!("  download <url> <mp4|mp3> [quality]    Download into the current directory");
    println!();
    println!("Options:");
    println!("  --port <port>   API port (default: {})", DEFAULT_PORT);
    println!("  --out <dir>     Download directory (default: .)");
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut port = DEFAULT_PORT;
    let mut out_dir = PathBuf::from(".");
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                i += 1;
                port = args
                    .get(i)
                    .context("--port requires a value")?
                    .parse()
                    .context("--port must be a number")?;
            }
            "--out" => {
                i += 1;
                out_dir = PathBuf::from(args.get(i).context("--out requires a value")?);
            }
            other => remaining.push(other),
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | [] => cmd::status::cmd_status(port).await,
        ["chat", prompt @ ..] if !prompt.is_empty() => cmd::chat::cmd_chat(port, &prompt.join(" ")).await,
        ["info", url] => cmd::media::cmd_info(port, url).await,
        ["download", url, format] => {
            cmd::media::cmd_download(port, url, format, "", &out_dir).await
        }
        ["download", url, format, quality] => {
            cmd::media::cmd_download(port, url, format, quality, &out_dir).await
        }
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
