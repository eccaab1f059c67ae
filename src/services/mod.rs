// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - synchronization protocols on top of the repositories.

pub mod contacts;
pub mod feed;
pub mod merge;
pub mod mutations;

pub use contacts::{ContactMatchOutcome, ContactMatchService};
pub use feed::FeedService;
pub use merge::CollectibleScope;
pub use mutations::MutationService;
