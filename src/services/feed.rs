// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Feed refresh and social-graph loading.
//!
//! Week refreshes walk the server's cursor pagination, merge every
//! returned post into the cache, and then reconcile: a cached ID absent
//! from the fresh page set was deleted server-side and is dropped locally.
//! That reconciliation is the only deletion signal the protocol has for
//! other users' posts.
//!
//! Social-graph loading fans out sibling profile fetches and funnels the
//! results through one mutex-guarded accumulator before anything is
//! published to the repositories.

use crate::current_user::CurrentUser;
use crate::error::{Result, SyncError};
use crate::models::{Post, PostPatch, UserPatch};
use crate::remote::{RemoteClient, RemoteRequest};
use crate::repo::{PostRepository, UserRepository};
use crate::services::merge::{self, merge_post, merge_user, CollectibleScope};
use crate::time_utils::week_key;
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Concurrent profile fetches during a social-graph load.
const MAX_CONCURRENT_FETCHES: usize = 8;

/// Hard ceiling on pages per week refresh.
const MAX_FEED_PAGES: u32 = 20;

/// One page of a paginated feed response.
#[derive(Debug, Deserialize)]
struct FeedPage {
    posts: Vec<PostPatch>,
    next_cursor: Option<String>,
}

/// Service for pull-based synchronization with the feed.
pub struct FeedService {
    posts: Arc<PostRepository>,
    users: Arc<UserRepository>,
    current_user: CurrentUser,
    remote: Arc<dyn RemoteClient>,
    page_size: u32,
    utc_offset_minutes: i32,
}

impl FeedService {
    pub fn new(
        posts: Arc<PostRepository>,
        users: Arc<UserRepository>,
        current_user: CurrentUser,
        remote: Arc<dyn RemoteClient>,
        page_size: u32,
        utc_offset_minutes: i32,
    ) -> Self {
        Self {
            posts,
            users,
            current_user,
            remote,
            page_size,
            utc_offset_minutes,
        }
    }

    /// Refresh the feed week containing `date` from the server, merging
    /// every returned post and deleting cached posts the server no longer
    /// returns. Returns the refreshed, read-time-sorted week.
    ///
    /// Reconciliation only runs when pagination completed: an incomplete
    /// `fresh_ids` set would delete posts that live on the unfetched
    /// pages.
    pub async fn refresh_week(&self, date: DateTime<Utc>) -> Result<Vec<Post>> {
        let week = week_key(date, self.utc_offset_minutes);
        let mut fresh_ids: HashSet<String> = HashSet::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_FEED_PAGES {
            let mut request = RemoteRequest::get("/feed")
                .query("week", &week)
                .query("limit", self.page_size.to_string());
            if let Some(cursor) = &cursor {
                request = request.query("cursor", cursor);
            }

            let page: FeedPage = self.remote.call(request).await?.decode()?;
            let page_len = page.posts.len();

            for patch in page.posts {
                if let Some(post) = self.merge_patch(patch).await {
                    fresh_ids.insert(post.id.clone());
                    // Quiet per-post caching; listeners hear about the
                    // refresh through reconciliation and re-reads.
                    self.posts.cache(&post, false).await;
                }
            }

            match page.next_cursor {
                Some(next) if page_len > 0 => cursor = Some(next),
                _ => {
                    cursor = None;
                    break;
                }
            }
        }

        if cursor.is_some() {
            tracing::warn!(week = %week, "Feed refresh hit page ceiling, skipping reconciliation");
        } else {
            self.posts.reconcile_week(date, &fresh_ids, true).await;
        }
        Ok(self.posts.posts_for_week(date).await)
    }

    /// Merge a feed payload into its cached post, or materialize a new
    /// post for a first sighting. Payloads without a server ID are
    /// dropped.
    async fn merge_patch(&self, patch: PostPatch) -> Option<Post> {
        let id = patch.id.clone().filter(|id| !id.is_empty())?;
        match self.posts.get(&id).await {
            Some(mut post) => {
                merge_post(&mut post, patch);
                Some(post)
            }
            None => {
                let post = merge::post_from_patch(patch)?;
                (!post.id.is_empty()).then_some(post)
            }
        }
    }

    /// Load the current user and their social graph.
    ///
    /// The profile fetch runs first (it defines who the friends are);
    /// friend and pending-requester profiles are then fetched as sibling
    /// tasks. Results are collected in a single mutex-guarded accumulator
    /// and published to the user repository only after every sibling has
    /// finished.
    pub async fn load_social_graph(&self) -> Result<()> {
        let patch: UserPatch = self
            .remote
            .call(RemoteRequest::get("/users/me"))
            .await?
            .decode()?;

        let current = match self.current_user.get().await {
            Some(mut user) => {
                merge_user(&mut user, patch, CollectibleScope::Full);
                self.current_user.set(user.clone()).await;
                user
            }
            None => {
                let user = merge::user_from_patch(patch, CollectibleScope::Full)
                    .ok_or_else(|| SyncError::NotFound("current user".to_string()))?;
                self.current_user.set(user.clone()).await;
                user
            }
        };
        self.users.cache(current.clone()).await;

        let mut to_fetch: Vec<String> = current.friend_ids.clone();
        for friendship in current.pending_friendships() {
            if friendship.requesting_user_id != current.id {
                to_fetch.push(friendship.requesting_user_id.clone());
            }
        }
        to_fetch.sort();
        to_fetch.dedup();

        let accumulator: Arc<Mutex<Vec<(String, UserPatch)>>> = Arc::new(Mutex::new(Vec::new()));
        stream::iter(to_fetch)
            .map(|user_id| {
                let remote = self.remote.clone();
                let accumulator = accumulator.clone();
                async move {
                    let request = RemoteRequest::get(format!(
                        "/users/{}",
                        urlencoding::encode(&user_id)
                    ));
                    match remote.call(request).await.and_then(|r| r.decode::<UserPatch>()) {
                        Ok(patch) => accumulator.lock().await.push((user_id, patch)),
                        Err(err) => {
                            tracing::debug!(user_id, error = %err, "Skipping failed profile fetch")
                        }
                    }
                }
            })
            .buffer_unordered(MAX_CONCURRENT_FETCHES)
            .collect::<Vec<()>>()
            .await;

        // Join barrier passed: publish the accumulated results.
        let results = std::mem::take(&mut *accumulator.lock().await);
        let loaded = results.len();
        for (user_id, patch) in results {
            self.users.merge_cached(&user_id, patch).await;
        }
        tracing::info!(loaded, "Social graph loaded");
        Ok(())
    }
}
