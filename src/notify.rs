// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Push-notification requests.
//!
//! The core only *emits* notification requests; delivery is someone
//! else's job. Fire-and-forget: a failed send is logged and dropped, and
//! callers must only notify after the server has confirmed the mutation
//! the notification is about.

use crate::remote::{RemoteClient, RemoteRequest};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// One notification request aimed at a set of users.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub user_ids: Vec<String>,
    /// Category slug, e.g. "comment", "reaction", "friend_request"
    pub category: String,
    pub message: String,
    /// In-app destination to open on tap
    pub deep_link: Option<String>,
    /// Delivery topic for client-side muting
    pub topic: Option<String>,
}

/// Fire-and-forget notification sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification);
}

/// Notifier that forwards requests through the remote service.
pub struct RemoteNotifier {
    remote: Arc<dyn RemoteClient>,
}

impl RemoteNotifier {
    pub fn new(remote: Arc<dyn RemoteClient>) -> Self {
        Self { remote }
    }
}

#[async_trait]
impl Notifier for RemoteNotifier {
    async fn notify(&self, notification: Notification) {
        if notification.user_ids.is_empty() {
            return;
        }
        let body = match serde_json::to_value(&notification) {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(error = %err, "Dropping unencodable notification");
                return;
            }
        };
        if let Err(err) = self
            .remote
            .call(RemoteRequest::post("/notifications").json(body))
            .await
        {
            tracing::warn!(error = %err, category = %notification.category, "Notification send failed");
        }
    }
}
