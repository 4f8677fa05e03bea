// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JWT issuance and verification. Token verification is delegated to an
//! external auth collaborator in principle — the Gateway only checks
//! signature/expiry via a pluggable verifier; the `/auth/*` handlers issue
//! tokens against a single bootstrap credential
//! (`--auth-username`/`--auth-password`), standing in locally for that
//! collaborator so the REST surface is exercisable end to end.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ErrorCode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    /// Present only on refresh tokens; lets `verify_access` reject a
    /// refresh token presented as an access token and vice versa.
    #[serde(default)]
    pub refresh: bool,
    /// Monotonic counter burned on every refresh, so a refresh token can be
    /// rotated out from under a stolen copy.
    #[serde(default)]
    pub generation: u64,
}

pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// The analyst identity attached to a request once `auth_layer` accepts it.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

/// Verifies and issues bearer JWTs. `None` secret means auth is disabled
/// (local/dev mode, per `config.rs`'s doc comment on `jwt_secret`) — every
/// request is then accepted as the fixed `anonymous` subject.
pub struct TokenVerifier {
    secret: Option<String>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    next_generation: AtomicU64,
    current_generation: Mutex<u64>,
}

impl TokenVerifier {
    pub fn new(secret: Option<String>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self { secret, access_ttl, refresh_ttl, next_generation: AtomicU64::new(1), current_generation: Mutex::new(0) }
    }

    pub fn disabled(&self) -> bool {
        self.secret.is_none()
    }

    fn key_material(&self) -> Result<&str, ErrorCode> {
        self.secret.as_deref().ok_or(ErrorCode::AuthRequired)
    }

    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, ErrorCode> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        *self.current_generation.lock().unwrap_or_else(|p| p.into_inner()) = generation;
        self.issue_pair_with_generation(subject, generation)
    }

    fn issue_pair_with_generation(&self, subject: &str, generation: u64) -> Result<TokenPair, ErrorCode> {
        let secret = self.key_material()?;
        let now = now_secs();
        let access = Claims { sub: subject.to_string(), exp: now + self.access_ttl.as_secs(), refresh: false, generation };
        let refresh = Claims { sub: subject.to_string(), exp: now + self.refresh_ttl.as_secs(), refresh: true, generation };

        let access_token = encode(&Header::default(), &access, &EncodingKey::from_secret(secret.as_bytes()))
            .map_err(|_| ErrorCode::Invariant)?;
        let refresh_token = encode(&Header::default(), &refresh, &EncodingKey::from_secret(secret.as_bytes()))
            .map_err(|_| ErrorCode::Invariant)?;
        Ok(TokenPair { access_token, refresh_token })
    }

    /// Verify an access token. Disabled auth always succeeds as `anonymous`.
    pub fn verify_access(&self, token: &str) -> Result<Claims, ErrorCode> {
        if self.disabled() {
            return Ok(Claims { sub: "anonymous".into(), exp: u64::MAX, refresh: false, generation: 0 });
        }
        let claims = self.decode(token)?;
        if claims.refresh {
            return Err(ErrorCode::AuthRequired);
        }
        Ok(claims)
    }

    /// Verify a refresh token and, if it is still the current generation
    /// for its subject, rotate it: burn this generation and mint a new
    /// pair. A refresh token from a superseded generation (already used
    /// once) is rejected.
    pub fn refresh(&self, token: &str) -> Result<TokenPair, ErrorCode> {
        let claims = self.decode(token)?;
        if !claims.refresh {
            return Err(ErrorCode::AuthRequired);
        }
        let current = *self.current_generation.lock().unwrap_or_else(|p| p.into_inner());
        if claims.generation != current {
            return Err(ErrorCode::AuthRequired);
        }
        self.issue_pair(&claims.sub)
    }

    fn decode(&self, token: &str) -> Result<Claims, ErrorCode> {
        let secret = self.key_material()?;
        let mut validation = Validation::default();
        validation.validate_exp = true;
        decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
            .map(|data| data.claims)
            .map_err(|_| ErrorCode::AuthRequired)
    }

    /// Validate a token carried on a WebSocket handshake's `?token=...`
    /// query parameter, mirroring the bearer check but for a transport
    /// that cannot set an `Authorization` header from a browser.
    pub fn verify_ws_query(&self, query: Option<&str>) -> Result<String, ErrorCode> {
        if self.disabled() {
            return Ok("anonymous".into());
        }
        let token = query
            .and_then(|q| q.split('&').find_map(|pair| pair.strip_prefix("token=")))
            .ok_or(ErrorCode::AuthRequired)?;
        self.verify_access(token).map(|c| c.sub)
    }
}

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Enforces bearer-token auth on every HTTP request except `/healthz` and
/// `/auth/*`; WebSocket auth happens separately at handshake via
/// `verify_ws_query` since browsers cannot set `Authorization` on the
/// upgrade request.
pub async fn auth_layer(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path();
    if path == "/healthz" || path.starts_with("/api/v1/auth/") {
        return next.run(req).await;
    }

    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let subject = match token {
        Some(token) => state.tokens.verify_access(token),
        None if state.tokens.disabled() => Ok(Claims { sub: "anonymous".into(), exp: u64::MAX, refresh: false, generation: 0 }),
        None => Err(ErrorCode::AuthRequired),
    };

    match subject {
        Ok(claims) => {
            req.extensions_mut().insert(AuthenticatedUser(claims.sub));
            next.run(req).await
        }
        Err(code) => super::rest::error_response(code, "missing or invalid bearer token").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_verifier_accepts_any_token() {
        let verifier = TokenVerifier::new(None, Duration::from_secs(60), Duration::from_secs(600));
        assert!(verifier.verify_access("whatever").is_ok());
    }

    #[test]
    fn issued_access_token_round_trips() {
        let verifier = TokenVerifier::new(Some("secret".into()), Duration::from_secs(60), Duration::from_secs(600));
        let pair = verifier.issue_pair("analyst-1").unwrap();
        let claims = verifier.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.sub, "analyst-1");
    }

    #[test]
    fn refresh_token_presented_as_access_token_is_rejected() {
        let verifier = TokenVerifier::new(Some("secret".into()), Duration::from_secs(60), Duration::from_secs(600));
        let pair = verifier.issue_pair("analyst-1").unwrap();
        assert!(verifier.verify_access(&pair.refresh_token).is_err());
    }

    #[test]
    fn refresh_rotates_and_invalidates_the_old_refresh_token() {
        let verifier = TokenVerifier::new(Some("secret".into()), Duration::from_secs(60), Duration::from_secs(600));
        let first = verifier.issue_pair("analyst-1").unwrap();
        let second = verifier.refresh(&first.refresh_token).unwrap();
        assert!(verifier.refresh(&first.refresh_token).is_err());
        assert!(verifier.verify_access(&second.access_token).is_ok());
    }

    #[test]
    fn ws_query_token_is_checked_the_same_way() {
        let verifier = TokenVerifier::new(Some("secret".into()), Duration::from_secs(60), Duration::from_secs(600));
        let pair = verifier.issue_pair("analyst-1").unwrap();
        let query = format!("token={}", pair.access_token);
        assert_eq!(verifier.verify_ws_query(Some(&query)).unwrap(), "analyst-1");
        assert!(verifier.verify_ws_query(Some("token=garbage")).is_err());
    }
}
