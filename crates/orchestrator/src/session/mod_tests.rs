use super::*;

#[test]
fn unlocked_session_allows_any_writer() {
    assert!(check_writer_allowed(&None, "analyst-a").is_ok());
}

#[test]
fn locker_may_write_others_may_not() {
    let holder = Some("analyst-a".to_string());
    assert!(check_writer_allowed(&holder, "analyst-a").is_ok());
    assert!(matches!(check_writer_allowed(&holder, "analyst-b"), Err(ErrorCode::Locked)));
}
