use super::*;
use crate::event::Room;

#[tokio::test]
async fn subscriber_receives_published_event() {
    let bus = EventBus::new(8);
    let sub = bus.subscribe(Room::session("s1"));
    bus.publish(Room::session("s1"), Some("s1".into()), EventKind::TerminalStarted { cols: 80, rows: 24 });

    let event = sub.recv().await;
    assert_eq!(event.session_id.as_deref(), Some("s1"));
    matches!(event.kind, EventKind::TerminalStarted { .. });
}

#[tokio::test]
async fn unrelated_room_does_not_receive_event() {
    let bus = EventBus::new(8);
    let sub = bus.subscribe(Room::session("other"));
    bus.publish(Room::session("s1"), Some("s1".into()), EventKind::TerminalClosed);

    let result = tokio::time::timeout(std::time::Duration::from_millis(50), sub.recv()).await;
    assert!(result.is_err(), "subscriber to a different room should not receive the event");
}

#[tokio::test]
async fn slow_subscriber_drops_oldest_and_gets_backpressure_notice() {
    let bus = EventBus::new(2);
    let sub = bus.subscribe(Room::Global);

    for _ in 0..5 {
        bus.publish(Room::Global, None, EventKind::TerminalClosed);
    }

    // capacity 2 + the backpressure notice itself pushed in: queue should
    // not have grown past capacity, and the notice type should show up.
    let mut saw_backpressure = false;
    for _ in 0..2 {
        let event = sub.recv().await;
        if matches!(event.kind, EventKind::SystemBackpressure { .. }) {
            saw_backpressure = true;
        }
    }
    assert!(saw_backpressure, "expected a system.backpressure notice after overflowing capacity");
}

#[tokio::test]
async fn dropped_subscription_is_pruned_on_next_publish() {
    let bus = EventBus::new(4);
    {
        let _sub = bus.subscribe(Room::Global);
    }
    // Should not panic even though the prior subscription was dropped, and
    // the dead entry should be pruned on this publish.
    bus.publish(Room::Global, None, EventKind::TerminalClosed);
    assert_eq!(bus.rooms.lock().unwrap().get(&Room::Global).map(|v| v.len()), Some(0));
}
