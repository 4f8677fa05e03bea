// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-cutting REST bits: the error envelope and the `/auth/*` /
//! `/healthz` handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::auth::TokenPair;
use super::AppState;
use crate::error::ErrorCode;

/// Build the `(status, Json(body))` pair every handler returns on failure.
pub fn error_response(code: ErrorCode, message: impl Into<String>) -> (StatusCode, Json<crate::error::ErrorBody>) {
    let status = StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(code.to_error_body(message)))
}

pub async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self { access_token: pair.access_token, refresh_token: pair.refresh_token }
    }
}

/// `POST /api/v1/auth/login` — issues a token pair for the single
/// bootstrap credential configured via `--auth-username`/`--auth-password`.
pub async fn login(State(state): State<Arc<AppState>>, Json(req): Json<LoginRequest>) -> impl IntoResponse {
    let matches = constant_time_eq(&req.username, &state.auth_username) && constant_time_eq(&req.password, &state.auth_password);
    if !matches {
        return error_response(ErrorCode::AuthRequired, "invalid username or password").into_response();
    }
    match state.tokens.issue_pair(&req.username) {
        Ok(pair) => Json(TokenResponse::from(pair)).into_response(),
        Err(code) => error_response(code, "token issuance is disabled (no --jwt-secret configured)").into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// `POST /api/v1/auth/refresh` — rotates a refresh token.
pub async fn refresh(State(state): State<Arc<AppState>>, Json(req): Json<RefreshRequest>) -> impl IntoResponse {
    match state.tokens.refresh(&req.refresh_token) {
        Ok(pair) => Json(TokenResponse::from(pair)).into_response(),
        Err(code) => error_response(code, "refresh token invalid, expired, or already used").into_response(),
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}
