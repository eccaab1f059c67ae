// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User repository.
//!
//! Canonical user store plus a username -> ID index, with a cache-first
//! remote fallback for lookups. Payloads for the current user merge into
//! the shared [`CurrentUser`] handle as well as the store, so every holder
//! sees the update.

use crate::config::Config;
use crate::current_user::CurrentUser;
use crate::error::{Result, SyncError};
use crate::models::{User, UserPatch};
use crate::remote::{RemoteClient, RemoteRequest};
use crate::services::merge::{merge_user, user_from_patch, CollectibleScope};
use crate::store::{namespaces, KeyedStore, PersistentStore};
use std::sync::Arc;

/// Repository for cached users.
pub struct UserRepository {
    users: KeyedStore<User>,
    usernames: KeyedStore<String>,
    remote: Arc<dyn RemoteClient>,
    current_user: CurrentUser,
    max_other_collectibles: usize,
}

impl UserRepository {
    pub fn new(
        config: &Config,
        persist: Arc<dyn PersistentStore>,
        remote: Arc<dyn RemoteClient>,
        current_user: CurrentUser,
    ) -> Self {
        Self {
            users: KeyedStore::new(namespaces::USERS, config.cache_capacity, persist.clone()),
            usernames: KeyedStore::new(namespaces::USERNAMES, config.cache_capacity, persist),
            remote,
            current_user,
            max_other_collectibles: config.max_other_user_collectibles,
        }
    }

    /// Merge scope for a user: the current user keeps full collectible
    /// history, everyone else is truncated.
    async fn scope_for(&self, user_id: &str) -> CollectibleScope {
        match self.current_user.get().await {
            Some(current) if current.id == user_id => CollectibleScope::Full,
            _ => CollectibleScope::Truncated(self.max_other_collectibles),
        }
    }

    /// Cache a user and maintain the username index. A payload for the
    /// current user also updates the shared handle in place.
    pub async fn cache(&self, user: User) {
        self.users.set(&user.id, user.clone()).await;
        if !user.username.is_empty() {
            self.usernames
                .set(&user.username.to_lowercase(), user.id.clone())
                .await;
        }
        if let Some(current) = self.current_user.get().await {
            if current.id == user.id {
                self.current_user.set(user).await;
            }
        }
    }

    /// Merge a partial payload into the cached user (creating one when the
    /// payload is the first sighting) and re-cache. Returns the merged
    /// user, or `None` when the payload carries no usable identity.
    pub async fn merge_cached(&self, user_id: &str, patch: UserPatch) -> Option<User> {
        let scope = self.scope_for(user_id).await;
        let local = match self.users.get(user_id).await {
            Some(user) => Some(user),
            // The handle may hold the current user before the store does.
            None => self
                .current_user
                .get()
                .await
                .filter(|user| user.id == user_id),
        };
        let merged = match local {
            Some(mut user) => {
                merge_user(&mut user, patch, scope);
                user
            }
            None => {
                let mut patch = patch;
                patch.id.get_or_insert_with(|| user_id.to_string());
                user_from_patch(patch, scope)?
            }
        };
        self.cache(merged.clone()).await;
        Some(merged)
    }

    /// Get a user by ID, fetching from the remote service on a cache miss.
    pub async fn get(&self, user_id: &str) -> Result<User> {
        if let Some(user) = self.users.get(user_id).await {
            return Ok(user);
        }

        let response = self
            .remote
            .call(RemoteRequest::get(format!(
                "/users/{}",
                urlencoding::encode(user_id)
            )))
            .await?;
        let patch: UserPatch = response.decode()?;
        self.merge_cached(user_id, patch)
            .await
            .ok_or_else(|| SyncError::NotFound(format!("user {}", user_id)))
    }

    /// Get a user by username via the local index, falling back to a
    /// remote lookup.
    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        let key = username.to_lowercase();
        if let Some(id) = self.usernames.get(&key).await {
            if let Some(user) = self.users.get(&id).await {
                return Ok(user);
            }
        }

        let response = self
            .remote
            .call(RemoteRequest::get("/users/lookup").query("username", &key))
            .await?;
        let patch: UserPatch = response.decode()?;
        let id = patch
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SyncError::NotFound(format!("username {}", username)))?;
        self.merge_cached(&id, patch)
            .await
            .ok_or_else(|| SyncError::NotFound(format!("username {}", username)))
    }

    /// Filter the current user's friends by a case-insensitive term over
    /// name and username. Friends missing from the cache are fetched;
    /// individual fetch failures drop that friend from the result.
    pub async fn search_friends(&self, term: &str) -> Result<Vec<User>> {
        let current = self
            .current_user
            .get()
            .await
            .ok_or(SyncError::NotAuthenticated)?;
        let needle = term.trim().to_lowercase();

        let mut matches = Vec::new();
        for friend_id in &current.friend_ids {
            let friend = match self.get(friend_id).await {
                Ok(friend) => friend,
                Err(err) => {
                    tracing::debug!(friend_id, error = %err, "Skipping unresolvable friend");
                    continue;
                }
            };
            if needle.is_empty() || friend_matches(&friend, &needle) {
                matches.push(friend);
            }
        }
        Ok(matches)
    }
}

fn friend_matches(user: &User, needle: &str) -> bool {
    user.username.to_lowercase().contains(needle)
        || user.first_name.to_lowercase().contains(needle)
        || user.last_name.to_lowercase().contains(needle)
}
