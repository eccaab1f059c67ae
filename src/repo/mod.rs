//! Repository layer: the sole writers of the post and user stores.

pub mod posts;
pub mod users;

pub use posts::{PostEvent, PostRepository};
pub use users::UserRepository;
