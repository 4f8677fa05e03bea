// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hunt-module registry. Modules loaded at start-up from
//! `--modules-dir` seed this registry; the REST surface additionally
//! allows registering/editing modules as plain JSON at runtime, which is
//! simpler than round-tripping the on-disk front-matter format used by
//! `hunt::parser` — see `DESIGN.md`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use super::rest::error_response;
use super::AppState;
use crate::error::ErrorCode;
use crate::hunt::HuntModule;

/// In-memory hunt-module catalog, keyed by module id.
#[derive(Clone)]
pub struct ModuleRegistry {
    inner: Arc<RwLock<HashMap<String, Arc<HuntModule>>>>,
}

impl ModuleRegistry {
    pub fn new(modules: Vec<Arc<HuntModule>>) -> Self {
        let map = modules.into_iter().map(|m| (m.id.clone(), m)).collect();
        Self { inner: Arc::new(RwLock::new(map)) }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<HuntModule>>> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<HuntModule>>> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn list(&self) -> Vec<Arc<HuntModule>> {
        self.read().values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<Arc<HuntModule>> {
        self.read().get(id).cloned()
    }

    pub fn upsert(&self, module: HuntModule) -> Arc<HuntModule> {
        let module = Arc::new(module);
        self.write().insert(module.id.clone(), module.clone());
        module
    }

    pub fn remove(&self, id: &str) -> Option<Arc<HuntModule>> {
        self.write().remove(id)
    }
}

pub async fn list_modules(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.modules.list()).into_response()
}

pub async fn get_module(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> impl IntoResponse {
    match state.modules.get(&id) {
        Some(module) => Json(module).into_response(),
        None => error_response(ErrorCode::NotFound, "hunt module not found").into_response(),
    }
}

pub async fn create_module(State(state): State<Arc<AppState>>, Json(module): Json<HuntModule>) -> impl IntoResponse {
    if state.modules.get(&module.id).is_some() {
        return error_response(ErrorCode::Conflict, "a module with this id already exists").into_response();
    }
    let module = state.modules.upsert(module);
    (axum::http::StatusCode::CREATED, Json(module)).into_response()
}

pub async fn update_module(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut module): Json<HuntModule>,
) -> impl IntoResponse {
    if state.modules.get(&id).is_none() {
        return error_response(ErrorCode::NotFound, "hunt module not found").into_response();
    }
    module.id = id;
    Json(state.modules.upsert(module)).into_response()
}

pub async fn delete_module(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> impl IntoResponse {
    match state.modules.remove(&id) {
        Some(_) => axum::http::StatusCode::NO_CONTENT.into_response(),
        None => error_response(ErrorCode::NotFound, "hunt module not found").into_response(),
    }
}
