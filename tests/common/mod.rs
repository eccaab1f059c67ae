// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test fixtures: scriptable remote, recording notifier, pinned
//! clock, and a fully wired core over in-memory persistence.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use stride_feed::config::Config;
use stride_feed::error::{Result, SyncError};
use stride_feed::models::{Post, User};
use stride_feed::notify::{Notification, Notifier};
use stride_feed::remote::{Method, RemoteClient, RemoteRequest, RemoteResponse};
use stride_feed::store::{MemoryPersist, PersistentStore};
use stride_feed::time_utils::Clock;
use stride_feed::SyncCore;

enum Scripted {
    Ok(serde_json::Value),
    Err { status: u16, body: Option<String> },
}

/// Remote client that replays scripted responses per method+path and
/// records every request it sees.
#[derive(Default)]
pub struct MockRemote {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<RemoteRequest>>,
}

fn script_key(method: Method, path: &str) -> String {
    format!("{:?} {}", method, path)
}

#[allow(dead_code)]
impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a 200 response for the next call to `method path`.
    pub fn respond(&self, method: Method, path: &str, body: serde_json::Value) {
        self.scripts
            .lock()
            .unwrap()
            .entry(script_key(method, path))
            .or_default()
            .push_back(Scripted::Ok(body));
    }

    /// Queue a failure for the next call to `method path`.
    pub fn fail(&self, method: Method, path: &str, status: u16, body: Option<&str>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(script_key(method, path))
            .or_default()
            .push_back(Scripted::Err {
                status,
                body: body.map(str::to_string),
            });
    }

    /// All requests issued so far, in order.
    pub fn calls(&self) -> Vec<RemoteRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Requests issued to a given path.
    pub fn calls_to(&self, path: &str) -> Vec<RemoteRequest> {
        self.calls()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

#[async_trait]
impl RemoteClient for MockRemote {
    async fn call(&self, request: RemoteRequest) -> Result<RemoteResponse> {
        self.calls.lock().unwrap().push(request.clone());
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&script_key(request.method, &request.path))
            .and_then(VecDeque::pop_front);

        match scripted {
            Some(Scripted::Ok(body)) => Ok(RemoteResponse {
                status: 200,
                payload: serde_json::to_vec(&body).expect("scripted body encodes"),
            }),
            Some(Scripted::Err { status, body }) => Err(SyncError::Request { status, body }),
            None => Err(SyncError::Request {
                status: 599,
                body: Some(format!("unscripted call: {} {:?}", request.path, request.method)),
            }),
        }
    }
}

/// Notifier that records everything and delivers nothing.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}

/// Clock pinned to a fixed instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Persistent tier where every operation fails silently.
#[derive(Default)]
pub struct FailingPersist;

#[async_trait]
impl PersistentStore for FailingPersist {
    async fn get(&self, _namespace: &str, _key: &str) -> Option<Vec<u8>> {
        None
    }
    async fn set(&self, _namespace: &str, _key: &str, _value: Vec<u8>) {}
    async fn remove(&self, _namespace: &str, _key: &str) {}
    async fn clear(&self, _namespace: &str) {}
}

/// "Now" used by the pinned clock: Wednesday 2024-05-15 12:00 UTC.
#[allow(dead_code)]
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap()
}

/// Everything a test needs to drive and observe a core.
#[allow(dead_code)]
pub struct TestHarness {
    pub core: SyncCore,
    pub remote: Arc<MockRemote>,
    pub notifier: Arc<RecordingNotifier>,
    pub persist: Arc<MemoryPersist>,
}

/// Opt-in test logging: `RUST_LOG=debug cargo test -- --nocapture`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Wire a core over in-memory persistence, a scriptable remote, and a
/// pinned clock.
#[allow(dead_code)]
pub async fn test_core() -> TestHarness {
    init_tracing();
    let remote = Arc::new(MockRemote::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let persist = Arc::new(MemoryPersist::new());
    let core = SyncCore::new(
        Config::default(),
        persist.clone(),
        remote.clone(),
        notifier.clone(),
        Arc::new(FixedClock(test_now())),
    )
    .await;
    TestHarness {
        core,
        remote,
        notifier,
        persist,
    }
}

/// Like [`test_core`] but with a registered current user already signed
/// in.
#[allow(dead_code)]
pub async fn signed_in_core() -> TestHarness {
    let harness = test_core().await;
    harness.core.current_user.set(sample_user("u-me", "me")).await;
    harness
}

#[allow(dead_code)]
pub fn sample_user(id: &str, username: &str) -> User {
    User {
        id: id.to_string(),
        first_name: "Test".to_string(),
        last_name: "Runner".to_string(),
        username: username.to_string(),
        bio: None,
        photo_url: None,
        friend_ids: vec![],
        blocked_ids: vec![],
        friendships: vec![],
        collectibles: vec![],
        weekly_goal_meters: None,
        registration_complete: true,
    }
}

/// A live post authored by `creator`, starting Wednesday of the test
/// week.
#[allow(dead_code)]
pub fn sample_post(id: &str, creator: &str, local_activity_id: &str) -> Post {
    let start = Utc.with_ymd_and_hms(2024, 5, 15, 8, 0, 0).unwrap();
    let mut post = Post::new_draft(local_activity_id, creator, start, start);
    post.id = id.to_string();
    post.creation_date = Some(start);
    post.distance_meters = Some(5_000.0);
    post
}
