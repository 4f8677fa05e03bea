use super::*;
use crate::domain::SessionState::*;

#[test]
fn happy_path_walk() {
    let mut s = Initializing;
    s = apply(s, None, &Trigger::Open).unwrap();
    assert_eq!(s, Connecting);
    s = apply(s, None, &Trigger::SshConnected).unwrap();
    assert_eq!(s, Connected);
    s = apply(s, None, &Trigger::EnterMode(crate::domain::SessionMode::Interactive)).unwrap();
    assert_eq!(s, Running);
}

#[test]
fn connecting_error_goes_to_failed_not_disconnected() {
    let s = apply(Connecting, None, &Trigger::SshError).unwrap();
    assert_eq!(s, Failed);
}

#[test]
fn only_the_locker_can_unlock() {
    let locked_by = Some("analyst-a");
    assert!(apply(Locked, locked_by, &Trigger::Unlock { by: "analyst-b".into() }).is_err());
    assert_eq!(apply(Locked, locked_by, &Trigger::Unlock { by: "analyst-a".into() }).unwrap(), Running);
}

#[test]
fn disconnected_retries_then_fails() {
    assert_eq!(apply(Disconnected, None, &Trigger::RetryConnect).unwrap(), Connecting);
    assert_eq!(apply(Disconnected, None, &Trigger::RetriesExhausted).unwrap(), Failed);
}

#[test]
fn close_reaches_terminated_from_any_nonterminal_state() {
    for s in [Initializing, Connecting, Connected, Running, Paused, Locked, Disconnected] {
        assert_eq!(apply(s, None, &Trigger::Close).unwrap(), Terminated);
    }
}

#[test]
fn close_is_rejected_once_terminal() {
    for s in [Failed, Terminated] {
        assert!(apply(s, None, &Trigger::Close).is_err());
    }
}

#[test]
fn no_jumps_skipping_connecting() {
    assert!(apply(Initializing, None, &Trigger::SshConnected).is_err());
}

#[test]
fn mode_can_be_toggled_again_while_running() {
    let s = apply(Running, None, &Trigger::EnterMode(crate::domain::SessionMode::Ai)).unwrap();
    assert_eq!(s, Running);
}
