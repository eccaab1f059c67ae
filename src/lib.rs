// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Stride feed sync core.
//!
//! Client-side synchronization and caching for a social activity feed:
//! two-tier entity stores, post and user repositories with denormalized
//! indices, field-level merge of partial server payloads, optimistic
//! rollback-capable social mutations, and hashed contact matching.
//!
//! The transport, persistence, push delivery, and clock are all injected
//! collaborators; the core owns only the caching and reconciliation
//! rules.

pub mod config;
pub mod current_user;
pub mod error;
pub mod models;
pub mod notify;
pub mod remote;
pub mod repo;
pub mod services;
pub mod store;
pub mod time_utils;

use config::Config;
use current_user::CurrentUser;
use notify::Notifier;
use remote::RemoteClient;
use repo::{PostRepository, UserRepository};
use services::{ContactMatchService, FeedService, MutationService};
use std::sync::Arc;
use store::PersistentStore;
use time_utils::Clock;

/// Composition root wiring the repositories and services over one set of
/// injected collaborators.
pub struct SyncCore {
    pub config: Config,
    pub current_user: CurrentUser,
    pub posts: Arc<PostRepository>,
    pub users: Arc<UserRepository>,
    pub mutations: MutationService,
    pub feed: FeedService,
    pub contacts: ContactMatchService,
}

impl SyncCore {
    /// Wire a core from its collaborators. Runs the draft-store clear
    /// token check as part of construction.
    pub async fn new(
        config: Config,
        persist: Arc<dyn PersistentStore>,
        remote: Arc<dyn RemoteClient>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let current_user = CurrentUser::new();

        let posts = Arc::new(
            PostRepository::new(&config, persist.clone(), current_user.clone(), clock.clone())
                .await,
        );
        let users = Arc::new(UserRepository::new(
            &config,
            persist.clone(),
            remote.clone(),
            current_user.clone(),
        ));

        let mutations = MutationService::new(
            posts.clone(),
            users.clone(),
            current_user.clone(),
            remote.clone(),
            notifier,
            clock,
        );
        let feed = FeedService::new(
            posts.clone(),
            users.clone(),
            current_user.clone(),
            remote.clone(),
            config.feed_page_size,
            config.utc_offset_minutes,
        );
        let contacts = ContactMatchService::new(
            users.clone(),
            current_user.clone(),
            remote,
            persist,
            config.default_country_code.clone(),
            config.spam_prefixes.clone(),
        );

        Self {
            config,
            current_user,
            posts,
            users,
            mutations,
            feed,
            contacts,
        }
    }
}
