use crate::*;

#[tokio::test]
async fn test_status_shape() -> Result<()> {
    let server = TestServer::with_defaults().await?;
    let status = server.get_json("/api/status").await?;

    assert_eq!(status["chat"]["limit"], 12);
    assert_eq!(status["media"]["limit"], 12);
    assert_eq!(status["chat"]["count"], 0);
    assert_eq!(status["history_cap"], 10);
    assert_eq!(status["history_turns"], 0);
    assert_eq!(status["live_artifacts"], 0);
    Ok(())
}

#[tokio::test]
async fn test_cors_allows_any_origin() -> Result<()> {
    let server = TestServer::with_defaults().await?;
    let resp = server
        .client
        .get(format!("{}/api/status", server.base))
        .header("origin", "https://portfolio.example")
        .send()
        .await?;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_404() -> Result<()> {
    let server = TestServer::with_defaults().await?;
    let resp = server
        .client
        .get(format!("{}/api/nope", server.base))
        .send()
        .await?;
    assert_eq!(resp.status(), 404);
    Ok(())
}
