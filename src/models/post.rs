// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post model: a user-authored activity record in the feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Activity statistic kinds that a post author can hide from the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatType {
    Distance,
    Duration,
    Elevation,
    Pace,
}

/// A user-authored activity record.
///
/// A post is a *draft* until the server has confirmed it: drafts carry an
/// empty `id` and are keyed by `local_activity_id` in a separate store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Server-assigned ID; empty string for an unsaved draft
    pub id: String,
    /// Author's user ID
    pub creator_user_id: String,
    /// Device-local activity identifier (join key for drafts)
    pub local_activity_id: String,
    /// Distance in meters, if applicable to the activity type
    pub distance_meters: Option<f64>,
    /// Moving duration in seconds
    pub duration_secs: Option<f64>,
    /// Elevation gain in meters
    pub elevation_meters: Option<f64>,
    /// Average pace in seconds per kilometer
    pub pace_secs_per_km: Option<f64>,
    /// When the post was created server-side; None until confirmed
    pub creation_date: Option<DateTime<Utc>>,
    /// Activity start time (UTC)
    pub activity_start_utc: DateTime<Utc>,
    /// Activity end time (UTC)
    pub activity_end_utc: DateTime<Utc>,
    /// Ordered comments, oldest first
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Ordered reactions, oldest first
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    /// Stats the author chose to hide
    #[serde(default)]
    pub hidden_stat_types: Vec<StatType>,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Set while the author is editing an already-live post
    #[serde(default)]
    pub editing: bool,
}

impl Post {
    /// A post is a draft iff it has no server identity or is mid-edit.
    pub fn is_draft(&self) -> bool {
        self.id.is_empty() || self.editing
    }

    /// New empty draft for a local activity.
    pub fn new_draft(
        local_activity_id: &str,
        creator_user_id: &str,
        activity_start_utc: DateTime<Utc>,
        activity_end_utc: DateTime<Utc>,
    ) -> Self {
        Self {
            id: String::new(),
            creator_user_id: creator_user_id.to_string(),
            local_activity_id: local_activity_id.to_string(),
            distance_meters: None,
            duration_secs: None,
            elevation_meters: None,
            pace_secs_per_km: None,
            creation_date: None,
            activity_start_utc,
            activity_end_utc,
            comments: Vec::new(),
            reactions: Vec::new(),
            hidden_stat_types: Vec::new(),
            metadata: HashMap::new(),
            editing: false,
        }
    }
}

/// A comment on a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// Server-assigned ID; locally generated placeholder until confirmed
    pub id: String,
    /// Comment author's user ID
    pub author_user_id: String,
    /// Comment body
    pub text: String,
    /// Users @-tagged in the comment
    #[serde(default)]
    pub tagged_user_ids: Vec<String>,
    /// Server-side creation time; None until confirmed
    pub created_at: Option<DateTime<Utc>>,
}

/// A reaction ("cheer") on a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    /// Server-assigned ID; locally generated placeholder until confirmed
    pub id: String,
    /// Reacting user's ID
    pub user_id: String,
    /// Reaction kind (e.g. "cheer", "fire")
    pub kind: String,
    /// Server-side creation time; None until confirmed
    pub created_at: Option<DateTime<Utc>>,
}
