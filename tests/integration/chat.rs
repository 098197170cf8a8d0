use crate::*;

use serde_json::json;

#[tokio::test]
async fn test_chat_replies_and_records_history() -> Result<()> {
    let server = TestServer::with_defaults().await?;

    let resp = server.post("/chat", json!({ "prompt": "What does Ada do?" })).await?;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["response"], "echo: Current question: What does Ada do?");

    let status = server.get_json("/api/status").await?;
    assert_eq!(status["history_turns"], 2);
    assert_eq!(status["chat"]["count"], 1);
    Ok(())
}

#[tokio::test]
async fn test_chat_missing_or_blank_prompt_is_400() -> Result<()> {
    let server = TestServer::with_defaults().await?;

    for body in [json!({}), json!({ "prompt": "" }), json!({ "prompt": "   " })] {
        let resp = server.post("/chat", body).await?;
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = resp.json().await?;
        assert_eq!(body["error"], "Prompt is required");
    }

    // Rejected before the rate check.
    let status = server.get_json("/api/status").await?;
    assert_eq!(status["chat"]["count"], 0);
    Ok(())
}

#[tokio::test]
async fn test_chat_malformed_json_is_400() -> Result<()> {
    let server = TestServer::with_defaults().await?;
    let resp = server
        .client
        .post(format!("{}/chat", server.base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await?;
    assert!(body["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_chat_local_rate_limit_sets_retry_after() -> Result<()> {
    let mut config = test_config();
    config.limits.chat.limit = 2;
    let generator = Arc::new(FakeGenerator::default());
    let server = TestServer::start(
        config,
        Arc::new(FakeFetcher::new(b"x".to_vec())),
        generator.clone(),
    )
    .await?;

    for _ in 0..2 {
        let resp = server.post("/chat", json!({ "prompt": "hi" })).await?;
        assert_eq!(resp.status(), 200);
    }

    let resp = server.post("/chat", json!({ "prompt": "hi" })).await?;
    assert_eq!(resp.status(), 429);
    let header: u64 = resp.headers()["retry-after"].to_str()?.parse()?;
    let body: serde_json::Value = resp.json().await?;
    let retry_after = body["retryAfter"].as_u64().context("retryAfter missing")?;
    assert_eq!(header, retry_after);
    assert!((1..=60).contains(&retry_after));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_chat_upstream_overload_rolls_back_history() -> Result<()> {
    let generator = Arc::new(FakeGenerator::failing_with(vec![
        ExecError::Overloaded("HTTP 429".into()),
        ExecError::Overloaded("HTTP 429".into()),
        ExecError::Overloaded("HTTP 429".into()),
    ]));
    let server = TestServer::start(
        test_config(),
        Arc::new(FakeFetcher::new(b"x".to_vec())),
        generator.clone(),
    )
    .await?;

    let resp = server.post("/chat", json!({ "prompt": "hello?" })).await?;
    assert_eq!(resp.status(), 429);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["retryAfter"], 60);
    assert_eq!(
        body["error"],
        "API rate limit exceeded. Please try again in a minute."
    );
    assert_eq!(generator.calls.load(Ordering::SeqCst), 3);

    let status = server.get_json("/api/status").await?;
    assert_eq!(status["history_turns"], 0);

    // The next request goes through and sees no orphaned user turn.
    let resp = server.post("/chat", json!({ "prompt": "again" })).await?;
    assert_eq!(resp.status(), 200);
    let status = server.get_json("/api/status").await?;
    assert_eq!(status["history_turns"], 2);
    Ok(())
}

#[tokio::test]
async fn test_chat_permanent_failure_is_500() -> Result<()> {
    let generator = Arc::new(FakeGenerator::failing_with(vec![ExecError::Failed(
        "HTTP 403: key revoked".into(),
    )]));
    let server = TestServer::start(
        test_config(),
        Arc::new(FakeFetcher::new(b"x".to_vec())),
        generator.clone(),
    )
    .await?;

    let resp = server.post("/chat", json!({ "prompt": "hello?" })).await?;
    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["error"], "Server error");
    assert!(body.get("retryAfter").is_none());
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    Ok(())
}
