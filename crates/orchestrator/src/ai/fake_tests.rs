use super::*;

#[tokio::test]
async fn streams_configured_chunks_in_order() {
    let driver = FakeDriver::new(vec!["alpha ", "beta"]);
    let mut rx = driver.stream_report("ctx".into()).await.unwrap();

    let mut collected = String::new();
    while let Some(chunk) = rx.recv().await {
        collected.push_str(&chunk.unwrap().text);
    }
    assert_eq!(collected, "alpha beta");
}

#[tokio::test]
async fn fails_before_first_chunk_when_configured() {
    let driver = FakeDriver::new(vec!["never seen"]).failing_before_first_chunk();
    assert!(driver.stream_report("ctx".into()).await.is_err());
}

#[test]
fn extract_findings_returns_configured_drafts() {
    let driver = FakeDriver::new(vec![]).with_finding("asset-1", "Suspicious listener on 0.0.0.0:4444");
    let findings = driver.extract_findings("report", &[]);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].title, "Suspicious listener on 0.0.0.0:4444");
}
