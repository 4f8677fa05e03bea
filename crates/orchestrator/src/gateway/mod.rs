// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + WebSocket surface. A single `Arc<AppState>`
//! passed through `with_state`, bearer auth enforced by a
//! `middleware::from_fn_with_state` layer, CORS left permissive.

pub mod assets;
pub mod auth;
pub mod intelligence;
pub mod modules;
pub mod rest;
pub mod sessions;
pub mod ws;

use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::ai::Driver;
use crate::config::Config;
use crate::event::EventBus;
use crate::hunt::HuntModule;
use crate::session::registry::SessionRegistry;
use crate::ssh::HostKeyPolicy;
use assets::AssetStore;
use auth::TokenVerifier;
use huntd_store::AsyncStore;
use modules::ModuleRegistry;

/// Everything a Gateway handler needs, shared behind one `Arc`.
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub bus: Arc<EventBus>,
    pub store: AsyncStore,
    pub driver: Option<Arc<dyn Driver>>,
    pub assets: AssetStore,
    pub modules: ModuleRegistry,
    pub tokens: TokenVerifier,
    pub auth_username: String,
    pub auth_password: String,
    /// Host-key policy applied to every new SSH connection. Pinning is
    /// configured fleet-wide via `--ssh-known-hosts`, not per asset — the
    /// asset inventory has no per-host pinned-key field of its own.
    pub host_key_policy: HostKeyPolicy,
    pub shutdown: CancellationToken,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &Config,
        registry: Arc<SessionRegistry>,
        bus: Arc<EventBus>,
        store: AsyncStore,
        driver: Option<Arc<dyn Driver>>,
        modules: Vec<Arc<HuntModule>>,
        shutdown: CancellationToken,
    ) -> anyhow::Result<Arc<Self>> {
        let tokens = TokenVerifier::new(
            config.jwt_secret.clone(),
            Duration::from_secs(config.access_token_ttl_secs),
            Duration::from_secs(config.refresh_token_ttl_secs),
        );
        let host_key_policy = match config.host_key_policy()? {
            crate::config::HostKeyPolicy::TrustOnFirstUse => HostKeyPolicy::TrustOnFirstUse,
            crate::config::HostKeyPolicy::Pinned => {
                let path = config
                    .ssh_known_hosts
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("--ssh-host-key-policy pinned requires --ssh-known-hosts"))?;
                let bytes = std::fs::read(path)?;
                HostKeyPolicy::Pinned(bytes)
            }
        };
        Ok(Arc::new(Self {
            registry,
            bus,
            store,
            driver,
            assets: AssetStore::new(),
            modules: ModuleRegistry::new(modules),
            tokens,
            auth_username: config.auth_username.clone(),
            auth_password: config.auth_password.clone(),
            host_key_policy,
            shutdown,
        }))
    }
}

/// Build the full axum `Router`: REST resources, the WebSocket room
/// protocol, bearer auth, and permissive CORS.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(rest::healthz))
        .route("/api/v1/auth/login", post(rest::login))
        .route("/api/v1/auth/refresh", post(rest::refresh))
        .route("/api/v1/assets", get(assets::list_assets).post(assets::create_asset))
        .route(
            "/api/v1/assets/{id}",
            get(assets::get_asset).patch(assets::update_asset).delete(assets::delete_asset),
        )
        .route("/api/v1/assets/{id}/findings", get(intelligence::list_asset_findings))
        .route("/api/v1/assets/{id}/reports", get(intelligence::list_asset_reports))
        .route(
            "/api/v1/assets/{id}/timeline",
            get(intelligence::get_timeline).delete(intelligence::clear_timeline),
        )
        .route("/api/v1/findings/{id}", get(intelligence::get_finding).delete(intelligence::delete_finding))
        .route("/api/v1/findings/{id}/status", patch(intelligence::update_finding_status))
        .route("/api/v1/reports/{id}", delete(intelligence::delete_report))
        .route("/api/v1/modules", get(modules::list_modules).post(modules::create_module))
        .route(
            "/api/v1/modules/{id}",
            get(modules::get_module).put(modules::update_module).delete(modules::delete_module),
        )
        .route("/api/v1/sessions", get(sessions::list_sessions).post(sessions::create_session))
        .route("/api/v1/sessions/{id}", get(sessions::get_session).delete(sessions::close_session))
        .route("/api/v1/sessions/{id}/lock", post(sessions::lock_session))
        .route("/api/v1/sessions/{id}/unlock", post(sessions::unlock_session))
        .route("/api/v1/sessions/{id}/mode", post(sessions::set_mode))
        .route("/api/v1/sessions/{id}/hunts", post(sessions::start_hunt))
        .route("/api/v1/sessions/{id}/hunts/{hunt_id}", delete(sessions::cancel_hunt))
        .route("/ws", get(ws::ws_handler))
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_layer))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
