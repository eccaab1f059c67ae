// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Field-level merge of remote payloads into cached entities.
//!
//! Remote payloads are partial: a field that is absent preserves the local
//! value, a field that is present wins. This is deliberately not a
//! whole-object replace, so a comment-creation ack cannot blank out an
//! unrelated field. Two exceptions:
//!
//! - social-graph lists (`friend_ids`, `blocked_ids`, `friendships`) are
//!   replaced wholesale whenever present; the server is authoritative for
//!   membership and partial merges of membership lists are meaningless;
//! - collectible lists are replaced wholesale only for the current user or
//!   on explicit request; for anyone else they are truncated with
//!   duplicate-type suppression to bound memory.

use crate::models::{Collectible, Post, PostPatch, User, UserPatch};
use std::collections::HashSet;

/// How to treat a collectible list during a user merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectibleScope {
    /// Current user or explicit request: keep everything.
    Full,
    /// Any other user: dedupe by type and cap at the given count.
    Truncated(usize),
}

fn coalesce<T>(local: &mut T, remote: Option<T>) {
    if let Some(value) = remote {
        *local = value;
    }
}

fn coalesce_opt<T>(local: &mut Option<T>, remote: Option<T>) {
    if remote.is_some() {
        *local = remote;
    }
}

/// Merge a partial user payload into a cached user.
pub fn merge_user(local: &mut User, patch: UserPatch, scope: CollectibleScope) {
    coalesce(&mut local.first_name, patch.first_name);
    coalesce(&mut local.last_name, patch.last_name);
    coalesce(&mut local.username, patch.username);
    coalesce_opt(&mut local.bio, patch.bio);
    coalesce_opt(&mut local.photo_url, patch.photo_url);
    coalesce_opt(&mut local.weekly_goal_meters, patch.weekly_goal_meters);
    coalesce(&mut local.registration_complete, patch.registration_complete);

    // Social graph: wholesale replacement, never element-wise merge.
    coalesce(&mut local.friend_ids, patch.friend_ids);
    coalesce(&mut local.blocked_ids, patch.blocked_ids);
    coalesce(&mut local.friendships, patch.friendships);

    if let Some(collectibles) = patch.collectibles {
        local.collectibles = match scope {
            CollectibleScope::Full => collectibles,
            CollectibleScope::Truncated(max) => truncate_collectibles(collectibles, max),
        };
    }
}

/// Merge a partial post payload into a cached post.
pub fn merge_post(local: &mut Post, patch: PostPatch) {
    if let Some(id) = patch.id {
        if !id.is_empty() {
            local.id = id;
        }
    }
    coalesce(&mut local.creator_user_id, patch.creator_user_id);
    coalesce(&mut local.local_activity_id, patch.local_activity_id);
    coalesce_opt(&mut local.distance_meters, patch.distance_meters);
    coalesce_opt(&mut local.duration_secs, patch.duration_secs);
    coalesce_opt(&mut local.elevation_meters, patch.elevation_meters);
    coalesce_opt(&mut local.pace_secs_per_km, patch.pace_secs_per_km);
    coalesce_opt(&mut local.creation_date, patch.creation_date);
    coalesce(&mut local.activity_start_utc, patch.activity_start_utc);
    coalesce(&mut local.activity_end_utc, patch.activity_end_utc);
    coalesce(&mut local.comments, patch.comments);
    coalesce(&mut local.reactions, patch.reactions);
    coalesce(&mut local.hidden_stat_types, patch.hidden_stat_types);
    coalesce(&mut local.metadata, patch.metadata);
}

/// Materialize a brand-new post from a server payload with no cached
/// counterpart.
pub fn post_from_patch(patch: PostPatch) -> Option<Post> {
    let start = patch.activity_start_utc?;
    let end = patch.activity_end_utc.unwrap_or(start);
    let mut post = Post::new_draft(
        patch.local_activity_id.as_deref().unwrap_or_default(),
        patch.creator_user_id.as_deref().unwrap_or_default(),
        start,
        end,
    );
    merge_post(&mut post, patch);
    Some(post)
}

/// Materialize a brand-new user from a server payload with no cached
/// counterpart. Requires a non-empty ID.
pub fn user_from_patch(patch: UserPatch, scope: CollectibleScope) -> Option<User> {
    let id = patch.id.clone().filter(|id| !id.is_empty())?;
    let mut user = User {
        id,
        first_name: String::new(),
        last_name: String::new(),
        username: String::new(),
        bio: None,
        photo_url: None,
        friend_ids: Vec::new(),
        blocked_ids: Vec::new(),
        friendships: Vec::new(),
        collectibles: Vec::new(),
        weekly_goal_meters: None,
        registration_complete: false,
    };
    merge_user(&mut user, patch, scope);
    Some(user)
}

/// Keep the first collectible of each type, capped at `max` entries.
pub fn truncate_collectibles(collectibles: Vec<Collectible>, max: usize) -> Vec<Collectible> {
    let mut seen = HashSet::new();
    collectibles
        .into_iter()
        .filter(|c| seen.insert(c.collectible_type.clone()))
        .take(max)
        .collect()
}
