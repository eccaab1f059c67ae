// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wire-patch payloads.
//!
//! Remote responses are partial by design: a comment-creation ack carries
//! only the new comment's server identity, a profile update only the fields
//! that changed. Every field is therefore `Option`, and the merge layer
//! decides per field whether "absent" preserves the local value (scalars)
//! or whether presence replaces wholesale (social-graph lists).

use crate::models::post::{Comment, Reaction, StatType};
use crate::models::user::{Collectible, Friendship};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Partial user payload merged into a cached [`crate::models::User`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    /// Wholesale replacement when present; the server is authoritative
    pub friend_ids: Option<Vec<String>>,
    /// Wholesale replacement when present
    pub blocked_ids: Option<Vec<String>>,
    /// Wholesale replacement when present
    pub friendships: Option<Vec<Friendship>>,
    /// Replaced or truncated per merge scope
    pub collectibles: Option<Vec<Collectible>>,
    pub weekly_goal_meters: Option<f64>,
    pub registration_complete: Option<bool>,
}

/// Partial post payload merged into a cached [`crate::models::Post`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostPatch {
    pub id: Option<String>,
    pub creator_user_id: Option<String>,
    pub local_activity_id: Option<String>,
    pub distance_meters: Option<f64>,
    pub duration_secs: Option<f64>,
    pub elevation_meters: Option<f64>,
    pub pace_secs_per_km: Option<f64>,
    pub creation_date: Option<DateTime<Utc>>,
    pub activity_start_utc: Option<DateTime<Utc>>,
    pub activity_end_utc: Option<DateTime<Utc>>,
    pub comments: Option<Vec<Comment>>,
    pub reactions: Option<Vec<Reaction>>,
    pub hidden_stat_types: Option<Vec<StatType>>,
    pub metadata: Option<HashMap<String, String>>,
}

/// Server acknowledgement of a created comment.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentAck {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Server acknowledgement of a created reaction.
#[derive(Debug, Clone, Deserialize)]
pub struct ReactionAck {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Server acknowledgement of a friendship transition.
#[derive(Debug, Clone, Deserialize)]
pub struct FriendshipAck {
    pub id: String,
    pub approved_at: Option<DateTime<Utc>>,
}
