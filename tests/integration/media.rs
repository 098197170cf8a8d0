use crate::*;

use serde_json::json;

#[tokio::test]
async fn test_info_returns_formatted_metadata() -> Result<()> {
    let server = TestServer::with_defaults().await?;

    let resp = server
        .post("/api/youtube/info", json!({ "url": "https://youtu.be/abc" }))
        .await?;
    assert_eq!(resp.status(), 200);
    let info: serde_json::Value = resp.json().await?;
    assert_eq!(info["title"], "Portfolio Demo: Part 1");
    assert_eq!(info["duration"], "1:02:05");
    assert_eq!(info["channel"], "someone");
    assert_eq!(info["uploadDate"], "20240101");
    assert_eq!(info["formats"][0]["format_id"], "18");
    Ok(())
}

#[tokio::test]
async fn test_info_rejects_foreign_links() -> Result<()> {
    let server = TestServer::with_defaults().await?;

    let resp = server
        .post("/api/youtube/info", json!({ "url": "https://vimeo.com/123" }))
        .await?;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["error"], "Invalid YouTube link");

    let resp = server.post("/api/youtube/info", json!({})).await?;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["error"], "URL is required");
    Ok(())
}

#[tokio::test]
async fn test_download_streams_file_and_cleans_up() -> Result<()> {
    let fetcher = Arc::new(FakeFetcher::new(b"fake mp3 data".to_vec()).failing_with(vec![
        ExecError::Overloaded("HTTP Error 429".into()),
    ]));
    let server = TestServer::start(test_config(), fetcher.clone(), Arc::default()).await?;

    let resp = server
        .post(
            "/api/youtube/download",
            json!({ "url": "https://www.youtube.com/watch?v=abc&list=PL1", "format": "mp3", "quality": "128" }),
        )
        .await?;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "audio/mpeg");
    assert_eq!(
        resp.headers()["content-disposition"],
        "attachment; filename=\"Portfolio Demo Part 1.mp3\""
    );
    let bytes = resp.bytes().await?;
    assert_eq!(&bytes[..], b"fake mp3 data");
    assert_eq!(fetcher.downloads.load(Ordering::SeqCst), 2);

    server.wait_for_cleanup().await
}

#[tokio::test]
async fn test_download_abandoned_by_client_still_cleans_up() -> Result<()> {
    let payload = vec![7u8; 4 * 1024 * 1024];
    let fetcher = Arc::new(FakeFetcher::new(payload));
    let server = TestServer::start(test_config(), fetcher, Arc::default()).await?;

    let resp = server
        .post(
            "/api/youtube/download",
            json!({ "url": "https://youtu.be/abc", "format": "mp4" }),
        )
        .await?;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "video/mp4");
    drop(resp);

    server.wait_for_cleanup().await
}

#[tokio::test]
async fn test_download_validation_errors() -> Result<()> {
    let fetcher = Arc::new(FakeFetcher::new(b"x".to_vec()));
    let server = TestServer::start(test_config(), fetcher.clone(), Arc::default()).await?;

    let cases = [
        (json!({ "format": "mp4" }), "URL is required"),
        (json!({ "url": "https://youtu.be/abc" }), "Format is required"),
        (
            json!({ "url": "https://youtu.be/abc", "format": "flac" }),
            "Invalid format 'flac'. Use mp3 or mp4.",
        ),
        (
            json!({ "url": "ftp://example.com/x", "format": "mp3" }),
            "Invalid YouTube link",
        ),
    ];
    for (body, error) in cases {
        let resp = server.post("/api/youtube/download", body).await?;
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = resp.json().await?;
        assert_eq!(body["error"], error);
    }

    assert_eq!(fetcher.downloads.load(Ordering::SeqCst), 0);
    let status = server.get_json("/api/status").await?;
    assert_eq!(status["media"]["count"], 0);
    Ok(())
}

#[tokio::test]
async fn test_download_tool_rejection_is_400_and_removes_partial_file() -> Result<()> {
    let fetcher = Arc::new(
        FakeFetcher::new(b"x".to_vec())
            .failing_with(vec![ExecError::InvalidInput("Video unavailable".into())]),
    );
    let server = TestServer::start(test_config(), fetcher.clone(), Arc::default()).await?;

    let resp = server
        .post(
            "/api/youtube/download",
            json!({ "url": "https://youtu.be/gone", "format": "mp4" }),
        )
        .await?;
    assert_eq!(resp.status(), 400);
    assert_eq!(fetcher.downloads.load(Ordering::SeqCst), 1);

    // Budget was spent even though the tool rejected the input.
    let status = server.get_json("/api/status").await?;
    assert_eq!(status["media"]["count"], 1);
    server.wait_for_cleanup().await
}

#[tokio::test]
async fn test_download_exhausted_timeouts_are_500() -> Result<()> {
    let timeout = ExecError::Timeout(Duration::from_secs(1));
    let fetcher = Arc::new(
        FakeFetcher::new(b"x".to_vec())
            .failing_with(vec![timeout.clone(), timeout.clone(), timeout]),
    );
    let server = TestServer::start(test_config(), fetcher.clone(), Arc::default()).await?;

    let resp = server
        .post(
            "/api/youtube/download",
            json!({ "url": "https://youtu.be/slow", "format": "mp4" }),
        )
        .await?;
    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["error"], "External service unavailable");
    assert_eq!(fetcher.downloads.load(Ordering::SeqCst), 3);
    server.wait_for_cleanup().await
}
