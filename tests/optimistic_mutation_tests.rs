// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Optimistic mutation protocol tests: local apply, ack patching,
//! notification ordering, and rollback on remote failure.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use stride_feed::config::Config;
use stride_feed::current_user::CurrentUser;
use stride_feed::error::SyncError;
use stride_feed::models::Friendship;
use stride_feed::remote::{Method, RemoteClient, RemoteRequest, RemoteResponse};
use stride_feed::store::MemoryPersist;
use stride_feed::SyncCore;

mod common;
use common::{sample_post, sample_user, signed_in_core, FixedClock, RecordingNotifier};

#[tokio::test]
async fn comment_ack_patches_placeholder_then_notifies() {
    let h = signed_in_core().await;
    h.core
        .posts
        .cache(&sample_post("p1", "u-alice", "act-1"), false)
        .await;

    h.remote.respond(
        Method::Post,
        "/posts/p1/comments",
        serde_json::json!({ "id": "c-77", "created_at": "2024-05-15T12:00:01Z" }),
    );

    let post = h
        .core
        .mutations
        .add_comment("p1", "nice run!", vec!["u-tagged".to_string()])
        .await
        .expect("comment should succeed");

    assert_eq!(post.comments.len(), 1);
    assert_eq!(post.comments[0].id, "c-77");
    assert!(post.comments[0].created_at.is_some());
    assert!(!post.comments[0].id.starts_with("local-"));

    // Tagged user and the post author are notified, the commenter is not.
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].category, "comment");
    let mut recipients = sent[0].user_ids.clone();
    recipients.sort();
    assert_eq!(recipients, vec!["u-alice", "u-tagged"]);
}

#[tokio::test]
async fn duplicate_tags_notify_each_recipient_once() {
    let h = signed_in_core().await;
    h.core
        .posts
        .cache(&sample_post("p1", "u-alice", "act-1"), false)
        .await;
    h.remote.respond(
        Method::Post,
        "/posts/p1/comments",
        serde_json::json!({ "id": "c-1", "created_at": null }),
    );

    // The author is tagged too, and one user twice over.
    h.core
        .mutations
        .add_comment(
            "p1",
            "hi",
            vec![
                "u-tagged".to_string(),
                "u-alice".to_string(),
                "u-tagged".to_string(),
            ],
        )
        .await
        .expect("comment should succeed");

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    let mut recipients = sent[0].user_ids.clone();
    recipients.sort();
    assert_eq!(recipients, vec!["u-alice", "u-tagged"]);
}

#[tokio::test]
async fn failed_comment_rolls_back_and_returns_the_error() {
    let h = signed_in_core().await;
    let post = sample_post("p1", "u-alice", "act-1");
    h.core.posts.cache(&post, false).await;

    h.remote
        .fail(Method::Post, "/posts/p1/comments", 500, Some("boom"));

    let err = h
        .core
        .mutations
        .add_comment("p1", "nice run!", vec![])
        .await
        .expect_err("comment should fail");

    assert!(matches!(err, SyncError::Request { status: 500, .. }));
    assert_eq!(err.response_body(), Some("boom"));

    // The UI-observable collection is exactly its pre-mutation state.
    let cached = h.core.posts.get("p1").await.expect("post still cached");
    assert!(cached.comments.is_empty());
    // And nobody was notified about a rejected mutation.
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn failed_reaction_rolls_back() {
    let h = signed_in_core().await;
    h.core
        .posts
        .cache(&sample_post("p1", "u-alice", "act-1"), false)
        .await;
    h.remote
        .fail(Method::Post, "/posts/p1/reactions", 503, None);

    let err = h
        .core
        .mutations
        .add_reaction("p1", "cheer")
        .await
        .expect_err("reaction should fail");
    assert!(matches!(err, SyncError::Request { status: 503, .. }));

    let cached = h.core.posts.get("p1").await.expect("post still cached");
    assert!(cached.reactions.is_empty());
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn own_post_reaction_sends_no_notification() {
    let h = signed_in_core().await;
    h.core
        .posts
        .cache(&sample_post("p1", "u-me", "act-1"), false)
        .await;
    h.remote.respond(
        Method::Post,
        "/posts/p1/reactions",
        serde_json::json!({ "id": "r-1", "created_at": "2024-05-15T12:00:01Z" }),
    );

    let post = h
        .core
        .mutations
        .add_reaction("p1", "cheer")
        .await
        .expect("reaction should succeed");
    assert_eq!(post.reactions[0].id, "r-1");
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn friend_request_success_confirms_identity_and_notifies() {
    let h = signed_in_core().await;
    h.remote.respond(
        Method::Post,
        "/friendships",
        serde_json::json!({ "id": "f-42", "approved_at": null }),
    );

    let friendship = h
        .core
        .mutations
        .send_friend_request("u-bob")
        .await
        .expect("request should succeed");

    assert_eq!(friendship.id, "f-42");
    assert!(friendship.approved_at.is_none());

    let me = h.core.current_user.get().await.expect("signed in");
    assert_eq!(me.friendships.len(), 1);
    assert_eq!(me.friendships[0].id, "f-42");

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].category, "friend_request");
    assert_eq!(sent[0].user_ids, vec!["u-bob"]);
}

#[tokio::test]
async fn failed_friend_request_leaves_no_pending_entry() {
    let h = signed_in_core().await;
    h.remote.fail(Method::Post, "/friendships", 422, Some("blocked"));

    let err = h
        .core
        .mutations
        .send_friend_request("u-bob")
        .await
        .expect_err("request should fail");
    assert!(err.is_client_error());

    let me = h.core.current_user.get().await.expect("signed in");
    assert!(me.friendships.is_empty());
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn approval_moves_requester_to_friends() {
    let h = signed_in_core().await;
    let mut me = sample_user("u-me", "me");
    me.friendships.push(Friendship {
        id: "f-7".to_string(),
        requesting_user_id: "u-bob".to_string(),
        target_user_id: "u-me".to_string(),
        approved_at: None,
    });
    h.core.current_user.set(me).await;

    h.remote
        .respond(Method::Post, "/friendships/f-7/approve", serde_json::json!({}));

    h.core
        .mutations
        .approve_friend_request("f-7")
        .await
        .expect("approval should succeed");

    let me = h.core.current_user.get().await.expect("signed in");
    assert!(me.friendships.is_empty());
    assert_eq!(me.friend_ids, vec!["u-bob"]);

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].category, "friend_accept");
    assert_eq!(sent[0].user_ids, vec!["u-bob"]);
}

#[tokio::test]
async fn failed_approval_restores_the_pending_request() {
    let h = signed_in_core().await;
    let mut me = sample_user("u-me", "me");
    me.friendships.push(Friendship {
        id: "f-7".to_string(),
        requesting_user_id: "u-bob".to_string(),
        target_user_id: "u-me".to_string(),
        approved_at: None,
    });
    h.core.current_user.set(me).await;

    h.remote
        .fail(Method::Post, "/friendships/f-7/approve", 500, None);

    h.core
        .mutations
        .approve_friend_request("f-7")
        .await
        .expect_err("approval should fail");

    let me = h.core.current_user.get().await.expect("signed in");
    assert_eq!(me.friendships.len(), 1);
    assert_eq!(me.friendships[0].id, "f-7");
    assert!(me.friendships[0].approved_at.is_none());
    assert!(me.friend_ids.is_empty());
    assert!(h.notifier.sent().is_empty());
}

/// Remote that signs the user out before failing every call, modeling a
/// session expiring while a mutation is in flight.
#[derive(Default)]
struct SignOutThenFailRemote {
    user: Mutex<Option<CurrentUser>>,
}

#[async_trait]
impl RemoteClient for SignOutThenFailRemote {
    async fn call(&self, _request: RemoteRequest) -> stride_feed::error::Result<RemoteResponse> {
        let handle = self.user.lock().unwrap().clone();
        if let Some(handle) = handle {
            handle.clear().await;
        }
        Err(SyncError::Request {
            status: 500,
            body: Some("session expired".to_string()),
        })
    }
}

#[tokio::test]
async fn mid_flight_sign_out_still_surfaces_the_remote_error() {
    let remote = Arc::new(SignOutThenFailRemote::default());
    let core = SyncCore::new(
        Config::default(),
        Arc::new(MemoryPersist::new()),
        remote.clone(),
        Arc::new(RecordingNotifier::new()),
        Arc::new(FixedClock(common::test_now())),
    )
    .await;
    *remote.user.lock().unwrap() = Some(core.current_user.clone());
    core.current_user.set(sample_user("u-me", "me")).await;

    let err = core
        .mutations
        .send_friend_request("u-bob")
        .await
        .expect_err("request should fail");

    // The rollback ran against a signed-out handle; the caller still sees
    // the remote failure, not the rollback's authentication error.
    assert!(matches!(err, SyncError::Request { status: 500, .. }));
}

#[tokio::test]
async fn draft_promotion_survives_live_or_draft() {
    let h = signed_in_core().await;
    let start = common::test_now();

    let mut draft = h.core.posts.live_or_draft("act-5", start, start).await;
    draft.distance_meters = Some(8_000.0);
    h.core.posts.cache(&draft, false).await;

    h.remote.respond(
        Method::Post,
        "/posts",
        serde_json::json!({ "id": "p-55", "creation_date": "2024-05-15T12:00:00Z" }),
    );

    let live = h
        .core
        .mutations
        .create_post(&draft)
        .await
        .expect("create should succeed");
    assert_eq!(live.id, "p-55");
    assert!(!live.is_draft());

    // Subsequent lookups resolve to the live post, not a recreated draft.
    let resolved = h.core.posts.live_or_draft("act-5", start, start).await;
    assert_eq!(resolved.id, "p-55");
    assert!(!resolved.is_draft());

    // The draft copy recorded the server ID for later demotion.
    let draft_copy = h.core.posts.draft("act-5").await.expect("draft kept");
    assert_eq!(draft_copy.id, "p-55");
}

#[tokio::test]
async fn delete_post_rolls_back_on_remote_failure() {
    let h = signed_in_core().await;
    let post = sample_post("p1", "u-me", "act-1");
    h.core.posts.cache(&post, false).await;

    h.remote.fail(Method::Delete, "/posts/p1", 500, None);

    h.core
        .mutations
        .delete_post(&post)
        .await
        .expect_err("delete should fail");

    // Rolled back: the post is cached and indexed again.
    assert!(h.core.posts.get("p1").await.is_some());
    assert_eq!(h.core.posts.posts_for_author("u-me").await.len(), 1);
}
