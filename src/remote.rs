// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Remote call abstraction and the default HTTP implementation.
//!
//! The core never talks HTTP directly; it issues [`RemoteRequest`]s
//! through the [`RemoteClient`] trait and gets back raw payload bytes plus
//! a status. Retry policy, auth headers, and connection management belong
//! to the implementation behind the trait.

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// HTTP-ish method for a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// A remote call the core wants made.
#[derive(Debug, Clone)]
pub struct RemoteRequest {
    pub method: Method,
    /// Path relative to the configured base URL, starting with `/`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl RemoteRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Raw result of a successful (2xx) remote call.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    pub status: u16,
    pub payload: Vec<u8>,
}

impl RemoteResponse {
    /// Decode the payload as JSON.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| SyncError::Encoding(format!("response decode failed: {}", e)))
    }
}

/// Abstract remote collaborator.
///
/// Implementations return `Ok` only for 2xx responses; a non-2xx status
/// becomes [`SyncError::Request`] carrying the raw body.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn call(&self, request: RemoteRequest) -> Result<RemoteResponse>;
}

/// Default `RemoteClient` backed by reqwest.
#[derive(Clone)]
pub struct HttpRemote {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl RemoteClient for HttpRemote {
    async fn call(&self, request: RemoteRequest) -> Result<RemoteResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let url = reqwest::Url::parse(&url)
            .map_err(|e| SyncError::Encoding(format!("invalid request URL {}: {}", url, e)))?;

        let mut builder = match request.method {
            Method::Get => self.http.get(url),
            Method::Post => self.http.post(url),
            Method::Put => self.http.put(url),
            Method::Delete => self.http.delete(url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        let status = response.status();
        let payload = response
            .bytes()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        if !status.is_success() {
            let body = if payload.is_empty() {
                None
            } else {
                Some(String::from_utf8_lossy(&payload).into_owned())
            };
            tracing::warn!(status = status.as_u16(), path = %request.path, "Remote request failed");
            return Err(SyncError::Request {
                status: status.as_u16(),
                body,
            });
        }

        Ok(RemoteResponse {
            status: status.as_u16(),
            payload: payload.to_vec(),
        })
    }
}
