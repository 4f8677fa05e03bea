// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission & Locking: at most one live session per (analyst, asset)
//! pair. A register/dedup/list pattern, generalized
//! from pod-by-key dedup to session-by-(analyst,asset) dedup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::owner;
use super::{SessionHandle, SessionMeta};
use crate::ai::Driver;
use crate::domain::SudoPolicy;
use crate::event::EventBus;
use crate::ssh::ConnectTarget;
use huntd_store::AsyncStore;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct AdmissionKey {
    analyst_id: String,
    asset_id: String,
}

/// Tracks every live session and admits at most one non-terminal session
/// per (analyst, asset) pair — re-requesting a session for a pair that
/// already has a live one returns the existing handle instead of opening
/// a second SSH connection to the same asset for the same analyst.
pub struct SessionRegistry {
    by_id: Mutex<HashMap<String, SessionHandle>>,
    by_key: Mutex<HashMap<AdmissionKey, String>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self { by_id: Mutex::new(HashMap::new()), by_key: Mutex::new(HashMap::new()) }
    }

    /// Admit a session for `(analyst_id, asset_id)`. If a non-terminal
    /// session already exists for that pair it is returned unchanged;
    /// otherwise a fresh session is created and its owner task spawned.
    #[allow(clippy::too_many_arguments)]
    pub async fn get_or_create(
        &self,
        analyst_id: &str,
        asset_id: &str,
        target: ConnectTarget,
        sudo_policy: Option<SudoPolicy>,
        bus: Arc<EventBus>,
        store: AsyncStore,
        driver: Option<Arc<dyn Driver>>,
        shutdown: CancellationToken,
    ) -> SessionHandle {
        let key = AdmissionKey { analyst_id: analyst_id.to_string(), asset_id: asset_id.to_string() };

        if let Some(existing) = self.existing_live_session(&key).await {
            return existing;
        }

        let meta = SessionMeta {
            id: Uuid::new_v4().to_string(),
            asset_id: asset_id.to_string(),
            analyst_id: analyst_id.to_string(),
            created_at_ms: now_ms(),
        };
        let session_id = meta.id.clone();
        let handle = owner::spawn(meta, target, sudo_policy, bus, store, driver, shutdown);

        self.by_id.lock().unwrap_or_else(|p| p.into_inner()).insert(session_id.clone(), handle.clone());
        self.by_key.lock().unwrap_or_else(|p| p.into_inner()).insert(key, session_id);
        handle
    }

    async fn existing_live_session(&self, key: &AdmissionKey) -> Option<SessionHandle> {
        let session_id = self.by_key.lock().unwrap_or_else(|p| p.into_inner()).get(key).cloned()?;
        let handle = self.by_id.lock().unwrap_or_else(|p| p.into_inner()).get(&session_id).cloned()?;
        if handle.snapshot().await.state.is_terminal() {
            self.by_key.lock().unwrap_or_else(|p| p.into_inner()).remove(key);
            self.by_id.lock().unwrap_or_else(|p| p.into_inner()).remove(&session_id);
            return None;
        }
        Some(handle)
    }

    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.by_id.lock().unwrap_or_else(|p| p.into_inner()).get(session_id).cloned()
    }

    pub fn list(&self) -> Vec<SessionHandle> {
        self.by_id.lock().unwrap_or_else(|p| p.into_inner()).values().cloned().collect()
    }

    /// Drop bookkeeping for sessions whose owner has reached a terminal
    /// state, so a later `get_or_create` for the same pair admits a fresh
    /// session instead of reusing a dead handle.
    pub async fn reap_terminated(&self) {
        let ids: Vec<String> = self.by_id.lock().unwrap_or_else(|p| p.into_inner()).keys().cloned().collect();
        for id in ids {
            let Some(handle) = self.get(&id) else { continue };
            if handle.snapshot().await.state.is_terminal() {
                self.by_id.lock().unwrap_or_else(|p| p.into_inner()).remove(&id);
                self.by_key.lock().unwrap_or_else(|p| p.into_inner()).retain(|_, v| v != &id);
            }
        }
    }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
