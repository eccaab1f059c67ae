//! Data model: cached entities and the wire-patch payloads merged into them.

pub mod contact;
pub mod patch;
pub mod post;
pub mod user;

pub use contact::LeaderboardItem;
pub use patch::{CommentAck, FriendshipAck, PostPatch, ReactionAck, UserPatch};
pub use post::{Comment, Post, Reaction, StatType};
pub use user::{Collectible, Friendship, User};
