//! User model: profile, social graph, and collectible summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached user.
///
/// Exactly one user is the "current user" per core; everyone else is a
/// snapshot cached by ID with a username index on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Canonical user ID
    pub id: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Unique handle
    pub username: String,
    /// Profile bio
    pub bio: Option<String>,
    /// Profile photo URL
    pub photo_url: Option<String>,
    /// IDs of confirmed friends
    #[serde(default)]
    pub friend_ids: Vec<String>,
    /// IDs of blocked users
    #[serde(default)]
    pub blocked_ids: Vec<String>,
    /// Pending and approved friend requests involving this user
    #[serde(default)]
    pub friendships: Vec<Friendship>,
    /// Earned collectibles; truncated for non-current users
    #[serde(default)]
    pub collectibles: Vec<Collectible>,
    /// Weekly distance goal in meters
    pub weekly_goal_meters: Option<f64>,
    /// Whether onboarding/registration finished
    #[serde(default)]
    pub registration_complete: bool,
}

impl User {
    /// Friendships still awaiting approval.
    pub fn pending_friendships(&self) -> impl Iterator<Item = &Friendship> {
        self.friendships.iter().filter(|f| f.approved_at.is_none())
    }
}

/// A friend request between two users. `approved_at == None` means pending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friendship {
    /// Server-assigned ID; locally generated placeholder until confirmed
    pub id: String,
    /// User who sent the request
    pub requesting_user_id: String,
    /// User who received the request
    pub target_user_id: String,
    /// When the request was approved; None while pending
    pub approved_at: Option<DateTime<Utc>>,
}

/// A denormalized collectible summary carried on the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collectible {
    /// Collectible kind (e.g. "week_streak_4")
    pub collectible_type: String,
    /// When it was earned
    pub earned_at: DateTime<Utc>,
}
