// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::kind::{Event, EventKind};
use super::Room;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;

fn wall_time_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

static MONOTONIC_EPOCH: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();

fn monotonic_ms() -> u64 {
    let epoch = MONOTONIC_EPOCH.get_or_init(std::time::Instant::now);
    epoch.elapsed().as_millis() as u64
}

struct SubscriberQueue {
    capacity: usize,
    items: Mutex<VecDeque<Event>>,
    notify: Notify,
    dropped: AtomicU64,
}

impl SubscriberQueue {
    fn new(capacity: usize) -> Self {
        Self { capacity, items: Mutex::new(VecDeque::with_capacity(capacity)), notify: Notify::new(), dropped: AtomicU64::new(0) }
    }

    /// Push an event, dropping the oldest queued one if at capacity.
    /// Returns `Some(total_dropped)` the first time this subscriber starts
    /// lagging (slow subscribers drop oldest, never block
    /// publishers).
    fn push(&self, event: Event) -> Option<u64> {
        let mut items = self.items.lock().unwrap_or_else(|p| p.into_inner());
        let mut just_dropped = false;
        if items.len() >= self.capacity {
            items.pop_front();
            just_dropped = true;
        }
        items.push_back(event);
        drop(items);
        self.notify.notify_waiters();
        if just_dropped {
            Some(self.dropped.fetch_add(1, Ordering::Relaxed) + 1)
        } else {
            None
        }
    }

    async fn recv(&self) -> Event {
        loop {
            {
                let mut items = self.items.lock().unwrap_or_else(|p| p.into_inner());
                if let Some(event) = items.pop_front() {
                    return event;
                }
            }
            self.notify.notified().await;
        }
    }
}

/// A live subscription to a [`Room`]. Dropping it unregisters the
/// subscriber on the bus's next publish to that room.
pub struct Subscription {
    queue: Arc<SubscriberQueue>,
}

impl Subscription {
    pub async fn recv(&self) -> Event {
        self.queue.recv().await
    }
}

/// Per-room publish/subscribe bus. Each subscriber owns a bounded
/// queue; a publisher that outruns a subscriber drops that subscriber's
/// oldest queued event rather than blocking — a bounded fan-out, but
/// per-subscriber
/// instead of per-pod-with-retries since there is no cross-process
/// delivery guarantee to uphold here.
pub struct EventBus {
    capacity: usize,
    rooms: Mutex<HashMap<Room, Vec<Weak<SubscriberQueue>>>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, rooms: Mutex::new(HashMap::new()) }
    }

    pub fn subscribe(&self, room: Room) -> Subscription {
        let queue = Arc::new(SubscriberQueue::new(self.capacity));
        let mut rooms = self.rooms.lock().unwrap_or_else(|p| p.into_inner());
        rooms.entry(room).or_default().push(Arc::downgrade(&queue));
        Subscription { queue }
    }

    /// Publish a kind-specific payload to `room`, stamping the envelope
    /// clock fields. `session_id` is attached when the event is
    /// session-scoped.
    pub fn publish(&self, room: Room, session_id: Option<String>, kind: EventKind) {
        let event = Event::new(session_id, wall_time_ms(), monotonic_ms(), kind);
        self.publish_event(room, event);
    }

    fn publish_event(&self, room: Room, event: Event) {
        let mut rooms = self.rooms.lock().unwrap_or_else(|p| p.into_inner());
        let Some(subs) = rooms.get_mut(&room) else { return };

        let mut total_dropped = None;
        subs.retain(|weak| {
            let Some(queue) = weak.upgrade() else { return false };
            if let Some(n) = queue.push(event.clone()) {
                total_dropped = Some(total_dropped.map_or(n, |m: u64| m.max(n)));
            }
            true
        });
        let subs_snapshot = subs.clone();
        drop(rooms);

        if let Some(dropped) = total_dropped {
            let notice = Event::new(
                None,
                wall_time_ms(),
                monotonic_ms(),
                EventKind::SystemBackpressure { room: room.to_string(), dropped },
            );
            for weak in &subs_snapshot {
                if let Some(queue) = weak.upgrade() {
                    queue.push(notice.clone());
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
