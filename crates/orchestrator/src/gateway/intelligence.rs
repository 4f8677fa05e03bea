// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Intelligence Store resource handlers: findings, AI reports, and the
//! per-asset timeline, all thin wrappers over `huntd_store::AsyncStore`.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use super::rest::error_response;
use super::AppState;
use crate::error::ErrorCode;
use huntd_store::FindingStatus;

fn map_store_err(err: huntd_store::Error) -> axum::response::Response {
    use huntd_store::Error;
    let code = match &err {
        Error::NotFound(_) => ErrorCode::NotFound,
        Error::Database(_) | Error::Io(_) | Error::TaskFailed(_) => ErrorCode::DbError,
    };
    error_response(code, err.to_string()).into_response()
}

pub async fn list_asset_findings(State(state): State<Arc<AppState>>, Path(asset_id): Path<String>) -> impl IntoResponse {
    match state.store.list_findings(Some(asset_id), None).await {
        Ok(findings) => Json(findings).into_response(),
        Err(e) => map_store_err(e),
    }
}

pub async fn get_finding(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> impl IntoResponse {
    match state.store.get_finding(id).await {
        Ok(Some(finding)) => Json(finding).into_response(),
        Ok(None) => error_response(ErrorCode::NotFound, "finding not found").into_response(),
        Err(e) => map_store_err(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_finding_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> impl IntoResponse {
    let Some(status) = FindingStatus::parse(&req.status) else {
        return error_response(ErrorCode::BadRequest, format!("unknown finding status: {}", req.status)).into_response();
    };
    match state.store.update_status(id, status).await {
        Ok(()) => axum::http::StatusCode::NO_CONTENT.into_response(),
        Err(e) => map_store_err(e),
    }
}

pub async fn delete_finding(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> impl IntoResponse {
    match state.store.delete_finding(id).await {
        Ok(()) => axum::http::StatusCode::NO_CONTENT.into_response(),
        Err(e) => map_store_err(e),
    }
}

pub async fn list_asset_reports(State(state): State<Arc<AppState>>, Path(asset_id): Path<String>) -> impl IntoResponse {
    match state.store.list_ai_reports(asset_id).await {
        Ok(reports) => Json(reports).into_response(),
        Err(e) => map_store_err(e),
    }
}

pub async fn delete_report(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> impl IntoResponse {
    match state.store.delete_ai_report(id).await {
        Ok(()) => axum::http::StatusCode::NO_CONTENT.into_response(),
        Err(e) => map_store_err(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    #[serde(default = "default_timeline_limit")]
    pub limit: usize,
}

fn default_timeline_limit() -> usize {
    200
}

pub async fn get_timeline(
    State(state): State<Arc<AppState>>,
    Path(asset_id): Path<String>,
    Query(query): Query<TimelineQuery>,
) -> impl IntoResponse {
    match state.store.get_timeline(asset_id, query.limit).await {
        Ok(events) => Json(events).into_response(),
        Err(e) => map_store_err(e),
    }
}

pub async fn clear_timeline(State(state): State<Arc<AppState>>, Path(asset_id): Path<String>) -> impl IntoResponse {
    match state.store.clear_timeline(asset_id).await {
        Ok(()) => axum::http::StatusCode::NO_CONTENT.into_response(),
        Err(e) => map_store_err(e),
    }
}
