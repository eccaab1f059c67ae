//! The shared current-user handle.
//!
//! One signed-in user exists per core. Every component holds the same
//! handle, so a merge applied here is immediately visible to all of them.
//! The handle is created by the composition root and passed in; nothing
//! reaches for it ambiently.

use crate::error::{Result, SyncError};
use crate::models::User;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cloneable handle to the signed-in user.
#[derive(Clone, Default)]
pub struct CurrentUser {
    inner: Arc<RwLock<Option<User>>>,
}

impl CurrentUser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the signed-in user (sign-in, account switch).
    pub async fn set(&self, user: User) {
        *self.inner.write().await = Some(user);
    }

    /// Clear on sign-out.
    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }

    /// Snapshot of the signed-in user, if any.
    pub async fn get(&self) -> Option<User> {
        self.inner.read().await.clone()
    }

    /// The signed-in user's ID, or [`SyncError::NotAuthenticated`].
    pub async fn require_id(&self) -> Result<String> {
        self.inner
            .read()
            .await
            .as_ref()
            .map(|u| u.id.clone())
            .ok_or(SyncError::NotAuthenticated)
    }

    /// Whether a user is signed in and finished registration.
    pub async fn is_registered(&self) -> bool {
        self.inner
            .read()
            .await
            .as_ref()
            .is_some_and(|u| u.registration_complete)
    }

    /// Mutate the signed-in user in place under the write lock.
    ///
    /// The mutation is visible to every holder of the handle as soon as
    /// this returns.
    pub async fn update<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut User),
    {
        let mut guard = self.inner.write().await;
        match guard.as_mut() {
            Some(user) => {
                mutate(user);
                Ok(())
            }
            None => Err(SyncError::NotAuthenticated),
        }
    }
}
