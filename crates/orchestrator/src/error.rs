// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error taxonomy shared across the HTTP and WebSocket transports
/// No gRPC surface is specified, so this carries no `grpc_code()`/
/// `tonic::Status` conversion — see `DESIGN.md` for the drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Caller errors (4xx)
    BadRequest,
    NotFound,
    Conflict,
    IncompatibleOS,
    Busy,
    Locked,
    AuthRequired,
    Forbidden,

    // Upstream errors
    AiUnavailable,
    AiRateLimited,
    VaultUnavailable,

    // SSH errors
    Unreachable,
    AuthFailed,
    HostKeyMismatch,
    ChannelClosed,
    ExecTimeout,

    // Internal
    DbError,
    Invariant,
    Shutdown,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::IncompatibleOS => 409,
            Self::Busy => 409,
            Self::Locked => 409,
            Self::AuthRequired => 401,
            Self::Forbidden => 403,
            Self::AiUnavailable => 503,
            Self::AiRateLimited => 429,
            Self::VaultUnavailable => 503,
            Self::Unreachable => 502,
            Self::AuthFailed => 502,
            Self::HostKeyMismatch => 502,
            Self::ChannelClosed => 502,
            Self::ExecTimeout => 504,
            Self::DbError => 500,
            Self::Invariant => 500,
            Self::Shutdown => 503,
        }
    }

    /// Whether the caller should be told this is worth retrying (surfaced
    /// on `ai.error`/`system.error` payloads).
    pub fn retryable(&self) -> bool {
        matches!(self, Self::AiUnavailable | Self::AiRateLimited | Self::VaultUnavailable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::IncompatibleOS => "INCOMPATIBLE_OS",
            Self::Busy => "BUSY",
            Self::Locked => "LOCKED",
            Self::AuthRequired => "AUTH_REQUIRED",
            Self::Forbidden => "FORBIDDEN",
            Self::AiUnavailable => "AI_UNAVAILABLE",
            Self::AiRateLimited => "AI_RATE_LIMITED",
            Self::VaultUnavailable => "VAULT_UNAVAILABLE",
            Self::Unreachable => "UNREACHABLE",
            Self::AuthFailed => "AUTH_FAILED",
            Self::HostKeyMismatch => "HOST_KEY_MISMATCH",
            Self::ChannelClosed => "CHANNEL_CLOSED",
            Self::ExecTimeout => "EXEC_TIMEOUT",
            Self::DbError => "DB_ERROR",
            Self::Invariant => "INVARIANT",
            Self::Shutdown => "SHUTDOWN",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON body shape returned by the Gateway for every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl ErrorCode {
    pub fn to_error_body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody { code: self.as_str(), message: message.into(), retryable: self.retryable() }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
