// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session resource handlers: admission, lock/unlock, mode
//! toggle, and hunt start/cancel against a [`SessionHandle`].

use std::sync::Arc;

use axum::extract::{Extension, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::auth::AuthenticatedUser;
use super::rest::error_response;
use super::AppState;
use crate::domain::{SessionMode, SessionState};
use crate::error::ErrorCode;
use crate::ssh::{ConnectTarget, SshAuth};

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: String,
    pub asset_id: String,
    pub analyst_id: String,
    pub mode: SessionMode,
    pub state: SessionState,
    pub locked_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub asset_id: String,
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    let Some(asset) = state.assets.get(&req.asset_id) else {
        return error_response(ErrorCode::NotFound, "asset not found").into_response();
    };

    let target = ConnectTarget {
        host: asset.host,
        port: asset.port,
        username: asset.username,
        auth: match asset.auth {
            SshAuth::Password(p) => SshAuth::Password(p),
            SshAuth::PrivateKey { pem, passphrase } => SshAuth::PrivateKey { pem, passphrase },
        },
        host_key_policy: state.host_key_policy.clone(),
    };

    let handle = state
        .registry
        .get_or_create(
            &user.0,
            &req.asset_id,
            target,
            asset.sudo_policy,
            state.bus.clone(),
            state.store.clone(),
            state.driver.clone(),
            state.shutdown.clone(),
        )
        .await;

    let snapshot = handle.snapshot().await;
    let view = SessionView {
        id: handle.meta.id.clone(),
        asset_id: handle.meta.asset_id.clone(),
        analyst_id: handle.meta.analyst_id.clone(),
        mode: snapshot.mode,
        state: snapshot.state,
        locked_by: snapshot.locked_by,
    };
    (axum::http::StatusCode::CREATED, Json(view)).into_response()
}

pub async fn list_sessions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut views = Vec::new();
    for handle in state.registry.list() {
        let snapshot = handle.snapshot().await;
        views.push(SessionView {
            id: handle.meta.id.clone(),
            asset_id: handle.meta.asset_id.clone(),
            analyst_id: handle.meta.analyst_id.clone(),
            mode: snapshot.mode,
            state: snapshot.state,
            locked_by: snapshot.locked_by,
        });
    }
    Json(views).into_response()
}

pub async fn get_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> impl IntoResponse {
    let Some(handle) = state.registry.get(&id) else {
        return error_response(ErrorCode::NotFound, "session not found").into_response();
    };
    let snapshot = handle.snapshot().await;
    Json(SessionView {
        id: handle.meta.id.clone(),
        asset_id: handle.meta.asset_id.clone(),
        analyst_id: handle.meta.analyst_id.clone(),
        mode: snapshot.mode,
        state: snapshot.state,
        locked_by: snapshot.locked_by,
    })
    .into_response()
}

pub async fn close_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> impl IntoResponse {
    let Some(handle) = state.registry.get(&id) else {
        return error_response(ErrorCode::NotFound, "session not found").into_response();
    };
    handle.close().await;
    axum::http::StatusCode::NO_CONTENT.into_response()
}

pub async fn lock_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    with_session(&state, &id, |handle| async move { handle.lock(user.0).await }).await
}

pub async fn unlock_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    with_session(&state, &id, |handle| async move { handle.unlock(user.0).await }).await
}

#[derive(Debug, Deserialize)]
pub struct SetModeRequest {
    pub mode: SessionMode,
}

pub async fn set_mode(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(req): Json<SetModeRequest>,
) -> impl IntoResponse {
    with_session(&state, &id, |handle| async move { handle.enter_mode(user.0, req.mode).await }).await
}

#[derive(Debug, Deserialize)]
pub struct StartHuntRequest {
    pub module_id: String,
    #[serde(default)]
    pub run_ai: bool,
}

#[derive(Debug, Serialize)]
pub struct StartHuntResponse {
    pub hunt_id: String,
}

pub async fn start_hunt(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(req): Json<StartHuntRequest>,
) -> impl IntoResponse {
    let Some(handle) = state.registry.get(&id) else {
        return error_response(ErrorCode::NotFound, "session not found").into_response();
    };
    let Some(module) = state.modules.get(&req.module_id) else {
        return error_response(ErrorCode::NotFound, "hunt module not found").into_response();
    };
    match handle.start_hunt(user.0, module, req.run_ai).await {
        Ok(hunt_id) => Json(StartHuntResponse { hunt_id }).into_response(),
        Err(code) => error_response(code, "unable to start hunt").into_response(),
    }
}

pub async fn cancel_hunt(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((id, hunt_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let Some(handle) = state.registry.get(&id) else {
        return error_response(ErrorCode::NotFound, "session not found").into_response();
    };
    match handle.cancel_hunt(user.0, hunt_id).await {
        Ok(()) => axum::http::StatusCode::NO_CONTENT.into_response(),
        Err(code) => error_response(code, "unable to cancel hunt").into_response(),
    }
}

async fn with_session<F, Fut>(state: &Arc<AppState>, id: &str, op: F) -> axum::response::Response
where
    F: FnOnce(crate::session::SessionHandle) -> Fut,
    Fut: std::future::Future<Output = Result<(), ErrorCode>>,
{
    let Some(handle) = state.registry.get(id) else {
        return error_response(ErrorCode::NotFound, "session not found").into_response();
    };
    match op(handle).await {
        Ok(()) => axum::http::StatusCode::NO_CONTENT.into_response(),
        Err(code) => error_response(code, "operation rejected").into_response(),
    }
}
