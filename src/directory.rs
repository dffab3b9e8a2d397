//! Seeded user accounts.

use tracing::debug;

use crate::{
    core::store::{DocumentStore, StoreError},
    record::{User, UserProfile},
};

/// Lookup and profile edits over the `users` collection.
pub struct UserDirectory<'a> {
    store: &'a mut DocumentStore,
}

impl<'a> UserDirectory<'a> {
    /// View over `store`.
    pub fn new(store: &'a mut DocumentStore) -> Self {
        Self { store }
    }

    /// Every user in insertion order.
    pub fn list(&self) -> &[User] {
        self.store.list::<User>()
    }

    /// Account named `username`.
    pub fn find_user(&self, username: &str) -> Result<&User, StoreError> {
        self.store.find::<User>(|u| u.username == username)
    }

    /// Public view of `username`.
    pub fn profile(&self, username: &str) -> Result<UserProfile, StoreError> {
        self.find_user(username).map(User::profile)
    }

    /// Updates the stored nickname and flushes. Live sessions are not touched.
    pub fn change_nickname(&mut self, username: &str, nickname: &str) -> Result<(), StoreError> {
        self.store.mutate::<User, _>(
            |u| u.username == username,
            |u| u.nickname = nickname.to_string(),
        )?;
        debug!(username, "nickname changed");
        Ok(())
    }
}
