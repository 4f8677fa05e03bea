use super::*;

#[test]
fn ai_errors_are_retryable() {
    assert!(ErrorCode::AiUnavailable.retryable());
    assert!(ErrorCode::AiRateLimited.retryable());
    assert!(!ErrorCode::BadRequest.retryable());
}

#[test]
fn locked_and_busy_map_to_409() {
    assert_eq!(ErrorCode::Locked.http_status(), 409);
    assert_eq!(ErrorCode::Busy.http_status(), 409);
    assert_eq!(ErrorCode::IncompatibleOS.http_status(), 409);
}

#[test]
fn display_matches_as_str() {
    assert_eq!(ErrorCode::ExecTimeout.to_string(), "EXEC_TIMEOUT");
}
