//! Storage layer: persistent tier trait plus the two-tier keyed store.

pub mod keyed;
pub mod persist;

pub use keyed::KeyedStore;
pub use persist::{MemoryPersist, PersistentStore};

/// Store namespace names as constants.
pub mod namespaces {
    pub const POSTS: &str = "posts";
    pub const DRAFTS: &str = "drafts";
    pub const POSTS_BY_AUTHOR: &str = "posts_by_author";
    pub const POSTS_BY_WEEK: &str = "posts_by_week";
    pub const USERS: &str = "users";
    pub const USERNAMES: &str = "usernames";
    /// Previously-upserted contact hashes (single-key namespace)
    pub const CONTACT_HASHES: &str = "contact_hashes";
    /// Store metadata, e.g. the draft clear token
    pub const META: &str = "meta";
}
