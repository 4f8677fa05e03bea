// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Asset CRUD. The orchestrator's own scope stops at hunting an
//! already-known asset; persistent asset/credential management is an
//! external collaborator's job. This in-memory store stands in for that
//! collaborator so the REST surface is exercisable end to end — see
//! `DESIGN.md`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::rest::error_response;
use super::AppState;
use crate::domain::{AssetOs, SudoPolicy};
use crate::error::ErrorCode;
use crate::ssh::SshAuth;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthRequest {
    Password { password: String },
    PrivateKey { pem: String, passphrase: Option<String> },
}

impl From<AuthRequest> for SshAuth {
    fn from(req: AuthRequest) -> Self {
        match req {
            AuthRequest::Password { password } => SshAuth::Password(password),
            AuthRequest::PrivateKey { pem, passphrase } => SshAuth::PrivateKey { pem, passphrase },
        }
    }
}

/// A registered Asset. Credentials live here but are never serialized back
/// out — [`AssetView`] is the only externally-visible shape.
#[derive(Debug, Clone)]
pub struct AssetRecord {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub os: AssetOs,
    pub sudo_policy: Option<SudoPolicy>,
    pub auth: SshAuth,
    pub created_at: i64,
}

#[derive(Debug, Serialize)]
pub struct AssetView {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub os: AssetOs,
    pub sudo_policy: Option<SudoPolicy>,
    pub created_at: i64,
}

impl From<&AssetRecord> for AssetView {
    fn from(a: &AssetRecord) -> Self {
        Self {
            id: a.id.clone(),
            name: a.name.clone(),
            host: a.host.clone(),
            port: a.port,
            username: a.username.clone(),
            os: a.os,
            sudo_policy: a.sudo_policy,
            created_at: a.created_at,
        }
    }
}

/// In-memory asset inventory, keyed by id.
#[derive(Clone)]
pub struct AssetStore {
    inner: Arc<Mutex<HashMap<String, AssetRecord>>>,
}

impl Default for AssetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetStore {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, AssetRecord>> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn list(&self) -> Vec<AssetRecord> {
        self.lock().values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<AssetRecord> {
        self.lock().get(id).cloned()
    }

    pub fn create(&self, record: AssetRecord) {
        self.lock().insert(record.id.clone(), record);
    }

    pub fn remove(&self, id: &str) -> Option<AssetRecord> {
        self.lock().remove(id)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAssetRequest {
    pub name: String,
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub username: String,
    pub os: AssetOs,
    #[serde(default)]
    pub sudo_policy: Option<SudoPolicy>,
    pub auth: AuthRequest,
}

fn default_ssh_port() -> u16 {
    22
}

#[derive(Debug, Deserialize)]
pub struct UpdateAssetRequest {
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub os: Option<AssetOs>,
    pub sudo_policy: Option<SudoPolicy>,
    pub auth: Option<AuthRequest>,
}

pub async fn list_assets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let views: Vec<AssetView> = state.assets.list().iter().map(AssetView::from).collect();
    Json(views).into_response()
}

pub async fn get_asset(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> impl IntoResponse {
    match state.assets.get(&id) {
        Some(asset) => Json(AssetView::from(&asset)).into_response(),
        None => error_response(ErrorCode::NotFound, "asset not found").into_response(),
    }
}

pub async fn create_asset(State(state): State<Arc<AppState>>, Json(req): Json<CreateAssetRequest>) -> impl IntoResponse {
    let record = AssetRecord {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        host: req.host,
        port: req.port,
        username: req.username,
        os: req.os,
        sudo_policy: req.sudo_policy,
        auth: req.auth.into(),
        created_at: now_ms(),
    };
    let view = AssetView::from(&record);
    state.assets.create(record);
    (axum::http::StatusCode::CREATED, Json(view)).into_response()
}

pub async fn update_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateAssetRequest>,
) -> impl IntoResponse {
    let Some(mut record) = state.assets.get(&id) else {
        return error_response(ErrorCode::NotFound, "asset not found").into_response();
    };
    if let Some(name) = req.name {
        record.name = name;
    }
    if let Some(host) = req.host {
        record.host = host;
    }
    if let Some(port) = req.port {
        record.port = port;
    }
    if let Some(username) = req.username {
        record.username = username;
    }
    if let Some(os) = req.os {
        record.os = os;
    }
    if req.sudo_policy.is_some() {
        record.sudo_policy = req.sudo_policy;
    }
    if let Some(auth) = req.auth {
        record.auth = auth.into();
    }
    let view = AssetView::from(&record);
    state.assets.create(record);
    Json(view).into_response()
}

pub async fn delete_asset(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> impl IntoResponse {
    match state.assets.remove(&id) {
        Some(_) => axum::http::StatusCode::NO_CONTENT.into_response(),
        None => error_response(ErrorCode::NotFound, "asset not found").into_response(),
    }
}

fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}
