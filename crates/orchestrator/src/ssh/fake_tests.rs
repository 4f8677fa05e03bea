use super::*;
use std::time::Duration;

#[tokio::test]
async fn default_response_is_success_with_empty_output() {
    let backend = FakeBackend::new();
    let outcome = backend.exec("uname -a", Duration::from_secs(5), 1024).await.unwrap();
    assert_eq!(outcome.exit_code, Some(0));
    assert!(outcome.stdout.is_empty());
}

#[tokio::test]
async fn scripted_response_is_returned_for_exact_command() {
    let backend = FakeBackend::new().with_response("id", FakeResponse::ok("uid=0(root) gid=0(root)\n"));
    let outcome = backend.exec("id", Duration::from_secs(5), 1024).await.unwrap();
    assert_eq!(outcome.exit_code, Some(0));
    assert_eq!(outcome.stdout, b"uid=0(root) gid=0(root)\n");
}

#[tokio::test]
async fn output_past_cap_is_truncated() {
    let backend = FakeBackend::new().with_response("big", FakeResponse::ok("x".repeat(100)));
    let outcome = backend.exec("big", Duration::from_secs(5), 10).await.unwrap();
    assert!(outcome.stdout_truncated);
    assert_eq!(outcome.stdout.len(), 10);
}

#[tokio::test]
async fn failing_command_reports_nonzero_exit() {
    let backend = FakeBackend::new().with_response("false", FakeResponse::failing(1, "boom"));
    let outcome = backend.exec("false", Duration::from_secs(5), 1024).await.unwrap();
    assert_eq!(outcome.exit_code, Some(1));
    assert_eq!(outcome.stderr, b"boom");
}
