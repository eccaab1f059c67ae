// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post repository.
//!
//! Owns four stores:
//! - canonical posts, keyed by server ID
//! - drafts, keyed by local activity ID
//! - posts-by-author index (author ID -> post IDs, creation date desc)
//! - posts-by-week index (feed-week key -> post IDs, insertion order)
//!
//! Writes are ordered canonical-then-index, so a reader never observes an
//! index entry without its entity during normal operation. Index reads
//! still drop dangling IDs defensively to tolerate crash-time partial
//! writes. Change events go out only after both indices are updated.

use crate::config::Config;
use crate::current_user::CurrentUser;
use crate::models::Post;
use crate::store::{namespaces, KeyedStore, PersistentStore};
use crate::time_utils::{week_key, Clock};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Bump to wipe every cached draft once at startup (live posts are
/// untouched). Used to migrate away from corrupted draft data.
const DRAFT_CLEAR_TOKEN: u32 = 2;

const DRAFT_CLEAR_TOKEN_KEY: &str = "draft_clear_token";

/// Change notification for repository listeners.
#[derive(Debug, Clone)]
pub enum PostEvent {
    Cached {
        id: String,
        local_activity_id: String,
    },
    Deleted {
        id: String,
        local_activity_id: String,
    },
}

/// Repository for posts, drafts, and their secondary indices.
pub struct PostRepository {
    posts: KeyedStore<Post>,
    drafts: KeyedStore<Post>,
    by_author: KeyedStore<Vec<String>>,
    by_week: KeyedStore<Vec<String>>,
    meta: KeyedStore<u32>,
    current_user: CurrentUser,
    clock: Arc<dyn Clock>,
    utc_offset_minutes: i32,
    events: broadcast::Sender<PostEvent>,
}

impl PostRepository {
    /// Build the repository and run the one-time draft wipe if the
    /// persisted clear token is stale.
    pub async fn new(
        config: &Config,
        persist: Arc<dyn PersistentStore>,
        current_user: CurrentUser,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        let repo = Self {
            posts: KeyedStore::new(namespaces::POSTS, config.cache_capacity, persist.clone()),
            drafts: KeyedStore::new(namespaces::DRAFTS, config.cache_capacity, persist.clone()),
            by_author: KeyedStore::new(
                namespaces::POSTS_BY_AUTHOR,
                config.cache_capacity,
                persist.clone(),
            ),
            by_week: KeyedStore::new(
                namespaces::POSTS_BY_WEEK,
                config.cache_capacity,
                persist.clone(),
            ),
            meta: KeyedStore::new(namespaces::META, 8, persist),
            current_user,
            clock,
            utc_offset_minutes: config.utc_offset_minutes,
            events,
        };

        let stored = repo.meta.get(DRAFT_CLEAR_TOKEN_KEY).await;
        if stored != Some(DRAFT_CLEAR_TOKEN) {
            tracing::info!(
                stored_token = ?stored,
                current_token = DRAFT_CLEAR_TOKEN,
                "Clearing draft store"
            );
            repo.drafts.remove_all().await;
            repo.meta.set(DRAFT_CLEAR_TOKEN_KEY, DRAFT_CLEAR_TOKEN).await;
        }

        repo
    }

    /// Subscribe to repository change events.
    pub fn subscribe(&self) -> broadcast::Receiver<PostEvent> {
        self.events.subscribe()
    }

    // ─── Reads ───────────────────────────────────────────────────

    /// The post to show for a local activity: the live post if the server
    /// already knows it, else the cached draft (registration required),
    /// else a freshly cached draft.
    pub async fn live_or_draft(
        &self,
        local_activity_id: &str,
        activity_start_utc: DateTime<Utc>,
        activity_end_utc: DateTime<Utc>,
    ) -> Post {
        let user_id = self
            .current_user
            .get()
            .await
            .map(|u| u.id)
            .unwrap_or_default();

        if !user_id.is_empty() {
            if let Some(live) = self.live_post_for_activity(&user_id, local_activity_id).await {
                return live;
            }
        }

        if self.current_user.is_registered().await {
            if let Some(mut draft) = self.drafts.get(local_activity_id).await {
                // Drafts created before sign-in have no author; patch and
                // re-cache so downstream code can rely on the field.
                if draft.creator_user_id.is_empty() && !user_id.is_empty() {
                    draft.creator_user_id = user_id.clone();
                    self.drafts.set(local_activity_id, draft.clone()).await;
                }
                return draft;
            }
        }

        let draft = Post::new_draft(
            local_activity_id,
            &user_id,
            activity_start_utc,
            activity_end_utc,
        );
        self.drafts.set(local_activity_id, draft.clone()).await;
        draft
    }

    /// Whether a server-confirmed post exists for the local activity.
    pub async fn live_post_exists(&self, local_activity_id: &str) -> bool {
        let Some(user) = self.current_user.get().await else {
            return false;
        };
        self.live_post_for_activity(&user.id, local_activity_id)
            .await
            .is_some()
    }

    async fn live_post_for_activity(
        &self,
        author_id: &str,
        local_activity_id: &str,
    ) -> Option<Post> {
        let ids = self.by_author.get(author_id).await.unwrap_or_default();
        for id in ids {
            if let Some(post) = self.posts.get(&id).await {
                if post.local_activity_id == local_activity_id && !post.is_draft() {
                    return Some(post);
                }
            }
        }
        None
    }

    /// Cached live post by server ID.
    pub async fn get(&self, id: &str) -> Option<Post> {
        if id.is_empty() {
            return None;
        }
        self.posts.get(id).await
    }

    /// Cached draft by local activity ID.
    pub async fn draft(&self, local_activity_id: &str) -> Option<Post> {
        self.drafts.get(local_activity_id).await
    }

    /// All cached posts for an author, index order. Dangling index IDs
    /// are dropped.
    pub async fn posts_for_author(&self, author_id: &str) -> Vec<Post> {
        let ids = self.by_author.get(author_id).await.unwrap_or_default();
        self.resolve(&ids).await
    }

    /// Posts in the feed week containing `date`, blocked authors removed,
    /// creation date descending. A post whose start time has since moved
    /// into a different week is excluded here; its stale index entry is
    /// cleaned up by the next reconciliation.
    pub async fn posts_for_week(&self, date: DateTime<Utc>) -> Vec<Post> {
        let key = week_key(date, self.utc_offset_minutes);
        let ids = self.by_week.get(&key).await.unwrap_or_default();
        let blocked: HashSet<String> = self
            .current_user
            .get()
            .await
            .map(|u| u.blocked_ids.into_iter().collect())
            .unwrap_or_default();

        let now = self.clock.now();
        let mut posts: Vec<Post> = self
            .resolve(&ids)
            .await
            .into_iter()
            .filter(|p| !blocked.contains(&p.creator_user_id))
            .filter(|p| week_key(p.activity_start_utc, self.utc_offset_minutes) == key)
            .collect();
        posts.sort_by_key(|p| std::cmp::Reverse(p.creation_date.unwrap_or(now)));
        posts
    }

    /// IDs currently indexed for the feed week containing `date`.
    pub async fn week_index(&self, date: DateTime<Utc>) -> Vec<String> {
        let key = week_key(date, self.utc_offset_minutes);
        self.by_week.get(&key).await.unwrap_or_default()
    }

    async fn resolve(&self, ids: &[String]) -> Vec<Post> {
        let mut posts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(post) = self.posts.get(id).await {
                posts.push(post);
            }
        }
        posts
    }

    // ─── Writes ──────────────────────────────────────────────────

    /// Cache a post. Drafts go to the draft store only and never touch
    /// the indices; live posts update the canonical store, then the
    /// author index, then the feed-week index.
    pub async fn cache(&self, post: &Post, notify: bool) {
        if post.is_draft() {
            self.drafts
                .set(&post.local_activity_id, post.clone())
                .await;
            if notify {
                self.emit(PostEvent::Cached {
                    id: post.id.clone(),
                    local_activity_id: post.local_activity_id.clone(),
                });
            }
            return;
        }

        self.posts.set(&post.id, post.clone()).await;

        // Draft promotion: once the server confirms an ID, the draft copy
        // records it so a later delete can demote it back cleanly.
        if !post.local_activity_id.is_empty() {
            if let Some(mut draft) = self.drafts.get(&post.local_activity_id).await {
                if draft.id != post.id {
                    draft.id = post.id.clone();
                    self.drafts.set(&post.local_activity_id, draft).await;
                }
            }
        }

        self.update_author_index(post).await;
        self.update_week_index(post).await;

        if notify {
            self.emit(PostEvent::Cached {
                id: post.id.clone(),
                local_activity_id: post.local_activity_id.clone(),
            });
        }
    }

    /// Prepend the post to its author's index if absent, then resort the
    /// whole index by creation date descending. Posts whose entity or
    /// creation date cannot be resolved sort as "now" so they cannot
    /// silently reorder older content.
    async fn update_author_index(&self, post: &Post) {
        let mut ids = self
            .by_author
            .get(&post.creator_user_id)
            .await
            .unwrap_or_default();
        if !ids.contains(&post.id) {
            ids.insert(0, post.id.clone());
        }

        let now = self.clock.now();
        let mut dated: Vec<(String, DateTime<Utc>)> = Vec::with_capacity(ids.len());
        for id in ids {
            let date = if id == post.id {
                post.creation_date
            } else {
                self.posts.get(&id).await.and_then(|p| p.creation_date)
            };
            dated.push((id, date.unwrap_or(now)));
        }
        dated.sort_by_key(|(_, date)| std::cmp::Reverse(*date));

        let sorted: Vec<String> = dated.into_iter().map(|(id, _)| id).collect();
        self.by_author.set(&post.creator_user_id, sorted).await;
    }

    /// Append the post to its feed-week index if absent. Insertion
    /// ordered; week reads sort and filter at read time.
    async fn update_week_index(&self, post: &Post) {
        let key = week_key(post.activity_start_utc, self.utc_offset_minutes);
        let mut ids = self.by_week.get(&key).await.unwrap_or_default();
        if !ids.contains(&post.id) {
            ids.push(post.id.clone());
            self.by_week.set(&key, ids).await;
        }
    }

    /// Delete a post: demote any cached draft back to draft state and
    /// unlink the server ID from the canonical store and both indices.
    /// Idempotent.
    pub async fn delete(&self, post: &Post, notify: bool) {
        if let Some(mut draft) = self.drafts.get(&post.local_activity_id).await {
            if !draft.id.is_empty() {
                draft.id.clear();
                self.drafts
                    .set(&post.local_activity_id, draft)
                    .await;
            }
        }

        if !post.id.is_empty() {
            self.posts.remove(&post.id).await;

            let mut author_ids = self
                .by_author
                .get(&post.creator_user_id)
                .await
                .unwrap_or_default();
            if author_ids.iter().any(|id| id == &post.id) {
                author_ids.retain(|id| id != &post.id);
                self.by_author.set(&post.creator_user_id, author_ids).await;
            }

            let key = week_key(post.activity_start_utc, self.utc_offset_minutes);
            let mut week_ids = self.by_week.get(&key).await.unwrap_or_default();
            if week_ids.iter().any(|id| id == &post.id) {
                week_ids.retain(|id| id != &post.id);
                self.by_week.set(&key, week_ids).await;
            }
        }

        if notify {
            self.emit(PostEvent::Deleted {
                id: post.id.clone(),
                local_activity_id: post.local_activity_id.clone(),
            });
        }
    }

    /// Reconcile a feed week against a freshly fetched full page: every
    /// cached ID absent from `fresh_ids` was deleted server-side (by its
    /// author or moderation) and is dropped locally. Returns the deleted
    /// IDs.
    pub async fn reconcile_week(
        &self,
        date: DateTime<Utc>,
        fresh_ids: &HashSet<String>,
        notify: bool,
    ) -> Vec<String> {
        let key = week_key(date, self.utc_offset_minutes);
        let cached = self.by_week.get(&key).await.unwrap_or_default();
        let stale: Vec<String> = cached
            .iter()
            .filter(|id| !fresh_ids.contains(*id))
            .cloned()
            .collect();

        for id in &stale {
            match self.posts.get(id).await {
                Some(post) => self.delete(&post, notify).await,
                None => {
                    // Dangling index entry: unlink it directly.
                    let mut ids = self.by_week.get(&key).await.unwrap_or_default();
                    ids.retain(|cached_id| cached_id != id);
                    self.by_week.set(&key, ids).await;
                }
            }
        }

        if !stale.is_empty() {
            tracing::debug!(week = %key, deleted = stale.len(), "Reconciled feed week");
        }
        stale
    }

    fn emit(&self, event: PostEvent) {
        // Zero receivers is fine.
        let _ = self.events.send(event);
    }
}
