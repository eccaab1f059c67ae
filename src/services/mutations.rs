// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Optimistic mutation protocol.
//!
//! Every social mutation follows the same four steps:
//! 1. Apply locally with a placeholder identity
//! 2. Attempt the remote call
//! 3. On success, patch the placeholder from the server ack, re-cache,
//!    and only then emit notifications
//! 4. On failure, remove exactly the optimistic entry and re-raise
//!
//! Notifications never fire before server confirmation: the server may
//! have rejected the mutation, and nobody should be pinged about a
//! comment that does not exist. A started mutation always runs to
//! completion (success patch or rollback), never half-applied.

use crate::current_user::CurrentUser;
use crate::error::{Result, SyncError};
use crate::models::{
    Comment, CommentAck, Friendship, FriendshipAck, Post, PostPatch, Reaction, ReactionAck,
};
use crate::notify::{Notification, Notifier};
use crate::remote::{RemoteClient, RemoteRequest};
use crate::repo::{PostRepository, UserRepository};
use crate::services::merge::merge_post;
use crate::time_utils::Clock;
use std::sync::Arc;

/// Service driving optimistic comment, reaction, and friendship
/// mutations.
pub struct MutationService {
    posts: Arc<PostRepository>,
    users: Arc<UserRepository>,
    current_user: CurrentUser,
    remote: Arc<dyn RemoteClient>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl MutationService {
    pub fn new(
        posts: Arc<PostRepository>,
        users: Arc<UserRepository>,
        current_user: CurrentUser,
        remote: Arc<dyn RemoteClient>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            posts,
            users,
            current_user,
            remote,
            notifier,
            clock,
        }
    }

    /// Placeholder identity for an optimistic entry. Only needs to be
    /// unique within its parent until the server ack replaces it.
    fn placeholder_id(&self) -> String {
        format!(
            "local-{}",
            self.clock.now().timestamp_nanos_opt().unwrap_or_default()
        )
    }

    // ─── Posts ───────────────────────────────────────────────────

    /// Create a post from a draft. On success the draft is promoted to a
    /// live post; on failure the draft stays cached for retry.
    pub async fn create_post(&self, draft: &Post) -> Result<Post> {
        let body = serde_json::to_value(draft)
            .map_err(|e| SyncError::Encoding(format!("post encode failed: {}", e)))?;
        let response = self.remote.call(RemoteRequest::post("/posts").json(body)).await?;
        let ack: PostPatch = response.decode()?;

        let mut post = draft.clone();
        merge_post(&mut post, ack);
        post.editing = false;
        if post.id.is_empty() {
            return Err(SyncError::Internal(anyhow::anyhow!(
                "post create ack carried no id"
            )));
        }

        self.posts.cache(&post, true).await;
        tracing::info!(post_id = %post.id, "Draft promoted to live post");
        Ok(post)
    }

    /// Delete a post locally, then remotely. On remote failure the post
    /// is re-cached exactly as it was.
    pub async fn delete_post(&self, post: &Post) -> Result<()> {
        self.posts.delete(post, true).await;

        if post.id.is_empty() {
            // Pure draft, nothing server-side to delete.
            return Ok(());
        }

        let request = RemoteRequest::delete(format!(
            "/posts/{}",
            urlencoding::encode(&post.id)
        ));
        if let Err(err) = self.remote.call(request).await {
            self.posts.cache(post, true).await;
            return Err(err);
        }
        Ok(())
    }

    // ─── Comments ────────────────────────────────────────────────

    /// Append a comment to a post optimistically, confirm it remotely,
    /// then notify the post author and tagged users.
    pub async fn add_comment(
        &self,
        post_id: &str,
        text: &str,
        tagged_user_ids: Vec<String>,
    ) -> Result<Post> {
        let author = self.current_user.require_id().await?;
        let mut post = self
            .posts
            .get(post_id)
            .await
            .ok_or_else(|| SyncError::NotFound(format!("post {}", post_id)))?;

        let placeholder = self.placeholder_id();
        post.comments.push(Comment {
            id: placeholder.clone(),
            author_user_id: author.clone(),
            text: text.to_string(),
            tagged_user_ids: tagged_user_ids.clone(),
            created_at: None,
        });
        self.posts.cache(&post, true).await;

        let request = RemoteRequest::post(format!(
            "/posts/{}/comments",
            urlencoding::encode(post_id)
        ))
        .json(serde_json::json!({
            "text": text,
            "tagged_user_ids": tagged_user_ids,
        }));

        let ack: CommentAck = match self.remote.call(request).await.and_then(|r| r.decode()) {
            Ok(ack) => ack,
            Err(err) => {
                return Err(self.rollback_comment(post_id, &placeholder, err).await);
            }
        };

        let mut post = self.posts.get(post_id).await.unwrap_or(post);
        if let Some(comment) = post.comments.iter_mut().find(|c| c.id == placeholder) {
            comment.id = ack.id;
            comment.created_at = ack.created_at;
        }
        self.posts.cache(&post, true).await;

        let mut recipients = tagged_user_ids;
        if post.creator_user_id != author && !post.creator_user_id.is_empty() {
            recipients.push(post.creator_user_id.clone());
        }
        recipients.retain(|id| id != &author);
        recipients.sort();
        recipients.dedup();
        self.notifier
            .notify(Notification {
                user_ids: recipients,
                category: "comment".to_string(),
                message: format!("{} commented on a post", self.display_name().await),
                deep_link: Some(format!("stride://posts/{}", post.id)),
                topic: Some("social".to_string()),
            })
            .await;

        Ok(post)
    }

    async fn rollback_comment(
        &self,
        post_id: &str,
        placeholder: &str,
        err: SyncError,
    ) -> SyncError {
        if let Some(mut post) = self.posts.get(post_id).await {
            post.comments.retain(|c| c.id != placeholder);
            self.posts.cache(&post, true).await;
        }
        tracing::warn!(post_id, error = %err, "Comment create failed, rolled back");
        err
    }

    // ─── Reactions ───────────────────────────────────────────────

    /// Append a reaction optimistically, confirm remotely, then notify
    /// the post author.
    pub async fn add_reaction(&self, post_id: &str, kind: &str) -> Result<Post> {
        let user_id = self.current_user.require_id().await?;
        let mut post = self
            .posts
            .get(post_id)
            .await
            .ok_or_else(|| SyncError::NotFound(format!("post {}", post_id)))?;

        let placeholder = self.placeholder_id();
        post.reactions.push(Reaction {
            id: placeholder.clone(),
            user_id: user_id.clone(),
            kind: kind.to_string(),
            created_at: None,
        });
        self.posts.cache(&post, true).await;

        let request = RemoteRequest::post(format!(
            "/posts/{}/reactions",
            urlencoding::encode(post_id)
        ))
        .json(serde_json::json!({ "kind": kind }));

        let ack: ReactionAck = match self.remote.call(request).await.and_then(|r| r.decode()) {
            Ok(ack) => ack,
            Err(err) => {
                if let Some(mut post) = self.posts.get(post_id).await {
                    post.reactions.retain(|r| r.id != placeholder);
                    self.posts.cache(&post, true).await;
                }
                tracing::warn!(post_id, error = %err, "Reaction create failed, rolled back");
                return Err(err);
            }
        };

        let mut post = self.posts.get(post_id).await.unwrap_or(post);
        if let Some(reaction) = post.reactions.iter_mut().find(|r| r.id == placeholder) {
            reaction.id = ack.id;
            reaction.created_at = ack.created_at;
        }
        self.posts.cache(&post, true).await;

        if post.creator_user_id != user_id && !post.creator_user_id.is_empty() {
            self.notifier
                .notify(Notification {
                    user_ids: vec![post.creator_user_id.clone()],
                    category: "reaction".to_string(),
                    message: format!("{} cheered a post", self.display_name().await),
                    deep_link: Some(format!("stride://posts/{}", post.id)),
                    topic: Some("social".to_string()),
                })
                .await;
        }

        Ok(post)
    }

    // ─── Friend requests ─────────────────────────────────────────

    /// Send a friend request: inserted into the current user's pending
    /// list optimistically, removed again if the remote call fails.
    pub async fn send_friend_request(&self, target_user_id: &str) -> Result<Friendship> {
        let requester = self.current_user.require_id().await?;
        let placeholder = self.placeholder_id();
        let friendship = Friendship {
            id: placeholder.clone(),
            requesting_user_id: requester.clone(),
            target_user_id: target_user_id.to_string(),
            approved_at: None,
        };

        self.current_user
            .update(|user| user.friendships.push(friendship.clone()))
            .await?;

        let request = RemoteRequest::post("/friendships")
            .json(serde_json::json!({ "target_user_id": target_user_id }));
        let ack: FriendshipAck = match self.remote.call(request).await.and_then(|r| r.decode()) {
            Ok(ack) => ack,
            Err(err) => {
                // A rollback failure (user signed out mid-flight) must not
                // mask the remote error.
                if let Err(rollback_err) = self
                    .current_user
                    .update(|user| user.friendships.retain(|f| f.id != placeholder))
                    .await
                {
                    tracing::debug!(error = %rollback_err, "Rollback skipped, no current user");
                }
                tracing::warn!(target_user_id, error = %err, "Friend request failed, rolled back");
                return Err(err);
            }
        };

        let mut confirmed = friendship;
        confirmed.id = ack.id;
        confirmed.approved_at = ack.approved_at;
        {
            let confirmed = confirmed.clone();
            self.current_user
                .update(move |user| {
                    if let Some(slot) = user.friendships.iter_mut().find(|f| f.id == placeholder) {
                        *slot = confirmed;
                    }
                })
                .await?;
        }
        self.recache_current_user().await;

        self.notifier
            .notify(Notification {
                user_ids: vec![target_user_id.to_string()],
                category: "friend_request".to_string(),
                message: format!("{} sent you a friend request", self.display_name().await),
                deep_link: Some(format!("stride://users/{}", requester)),
                topic: Some("social".to_string()),
            })
            .await;

        Ok(confirmed)
    }

    /// Approve a pending request: the same pattern reversed. The request
    /// leaves the pending list and the requester joins the friend list
    /// optimistically; failure reinserts the request and removes the
    /// friend.
    pub async fn approve_friend_request(&self, friendship_id: &str) -> Result<()> {
        let current = self
            .current_user
            .get()
            .await
            .ok_or(SyncError::NotAuthenticated)?;
        let friendship = current
            .friendships
            .iter()
            .find(|f| f.id == friendship_id && f.approved_at.is_none())
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("friendship {}", friendship_id)))?;
        let requester = friendship.requesting_user_id.clone();

        self.current_user
            .update(|user| {
                user.friendships.retain(|f| f.id != friendship_id);
                if !user.friend_ids.contains(&requester) {
                    user.friend_ids.push(requester.clone());
                }
            })
            .await?;

        let request = RemoteRequest::post(format!(
            "/friendships/{}/approve",
            urlencoding::encode(friendship_id)
        ));
        if let Err(err) = self.remote.call(request).await {
            let restored = friendship.clone();
            if let Err(rollback_err) = self
                .current_user
                .update(move |user| {
                    user.friend_ids.retain(|id| id != &restored.requesting_user_id);
                    user.friendships.push(restored);
                })
                .await
            {
                tracing::debug!(error = %rollback_err, "Rollback skipped, no current user");
            }
            tracing::warn!(friendship_id, error = %err, "Approval failed, rolled back");
            return Err(err);
        }

        self.recache_current_user().await;
        self.notifier
            .notify(Notification {
                user_ids: vec![friendship.requesting_user_id],
                category: "friend_accept".to_string(),
                message: format!(
                    "{} accepted your friend request",
                    self.display_name().await
                ),
                deep_link: Some(format!("stride://users/{}", current.id)),
                topic: Some("social".to_string()),
            })
            .await;
        Ok(())
    }

    /// Decline or withdraw a pending request. Optimistic removal with
    /// reinsertion on failure; no notification either way.
    pub async fn delete_friend_request(&self, friendship_id: &str) -> Result<()> {
        let current = self
            .current_user
            .get()
            .await
            .ok_or(SyncError::NotAuthenticated)?;
        let friendship = current
            .friendships
            .iter()
            .find(|f| f.id == friendship_id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("friendship {}", friendship_id)))?;

        self.current_user
            .update(|user| user.friendships.retain(|f| f.id != friendship_id))
            .await?;

        let request = RemoteRequest::delete(format!(
            "/friendships/{}",
            urlencoding::encode(friendship_id)
        ));
        if let Err(err) = self.remote.call(request).await {
            if let Err(rollback_err) = self
                .current_user
                .update(move |user| user.friendships.push(friendship))
                .await
            {
                tracing::debug!(error = %rollback_err, "Rollback skipped, no current user");
            }
            tracing::warn!(friendship_id, error = %err, "Request delete failed, rolled back");
            return Err(err);
        }

        self.recache_current_user().await;
        Ok(())
    }

    // ─── Helpers ─────────────────────────────────────────────────

    async fn recache_current_user(&self) {
        if let Some(user) = self.current_user.get().await {
            self.users.cache(user).await;
        }
    }

    async fn display_name(&self) -> String {
        match self.current_user.get().await {
            Some(user) if !user.first_name.is_empty() => user.first_name,
            Some(user) => user.username,
            None => "Someone".to_string(),
        }
    }
}
