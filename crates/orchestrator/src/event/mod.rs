// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Closed event taxonomy and pub/sub bus, generalized from a single
//! process-wide broadcast pattern to per-room routing.

mod bus;
mod kind;

pub use bus::{EventBus, Subscription};
pub use kind::{Event, EventKind};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A routing target for events. Every event is published to exactly
/// one `Room`; `Global` additionally receives `system.*` events and hunt
/// lifecycle summaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Room {
    Session(String),
    Asset(String),
    Global,
}

impl Room {
    pub fn session(id: impl Into<String>) -> Self {
        Room::Session(id.into())
    }

    pub fn asset(id: impl Into<String>) -> Self {
        Room::Asset(id.into())
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Session(id) => write!(f, "session:{id}"),
            Room::Asset(id) => write!(f, "asset:{id}"),
            Room::Global => write!(f, "global"),
        }
    }
}

impl From<Room> for String {
    fn from(room: Room) -> Self {
        room.to_string()
    }
}

impl TryFrom<String> for Room {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "global" {
            return Ok(Room::Global);
        }
        if let Some(id) = value.strip_prefix("session:") {
            return Ok(Room::Session(id.to_string()));
        }
        if let Some(id) = value.strip_prefix("asset:") {
            return Ok(Room::Asset(id.to_string()));
        }
        Err(format!("not a valid room: {value}"))
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
