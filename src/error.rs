// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for the sync core.
//!
//! Cache-layer failures never appear here: the store tier degrades to a
//! miss and logs. Everything that reaches a caller is either a remote
//! request failure, a construction failure caught before the request, or
//! an internal invariant violation.

/// Error type surfaced by repositories and sync services.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Non-2xx remote response. The raw body is kept for diagnostics.
    #[error("remote request failed with status {status}")]
    Request { status: u16, body: Option<String> },

    /// The remote call never produced a status (connection refused, DNS,
    /// timeout at the transport layer).
    #[error("transport error: {0}")]
    Transport(String),

    /// URL or payload construction failed before any remote call was made.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Entity absent both locally and remotely.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Operation requires a signed-in current user and none is set.
    #[error("no current user")]
    NotAuthenticated,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SyncError {
    /// Whether the remote rejected the request itself (4xx), as opposed to
    /// failing to serve it (5xx / transport).
    pub fn is_client_error(&self) -> bool {
        matches!(self, SyncError::Request { status, .. } if (400..500).contains(status))
    }

    /// The raw response body, when the remote sent one.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            SyncError::Request { body, .. } => body.as_deref(),
            _ => None,
        }
    }
}

/// Result type alias for repository and service methods.
pub type Result<T> = std::result::Result<T, SyncError>;
