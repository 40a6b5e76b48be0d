//! Shared user registry
//!
//! A single mutex around an ordered map. Every operation takes the lock for
//! its whole duration and never holds it across an await point.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::AppError;
use crate::user::{Mailbox, User};
use crate::types::UserId;

/// Directory of connected users
///
/// Cheap to clone; all clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    users: Arc<Mutex<BTreeMap<UserId, User>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user for a new connection
    ///
    /// Fails if a live entry already uses this id.
    pub fn register(
        &self,
        id: UserId,
        name: String,
        mailbox: Mailbox,
    ) -> Result<User, AppError> {
        let mut users = self.users.lock();
        if users.contains_key(&id) {
            return Err(AppError::AlreadyRegistered(id));
        }

        let user = User::new(id, name, mailbox);
        users.insert(id, user.clone());
        debug!("Registered {} (total users: {})", id, users.len());
        Ok(user)
    }

    /// Change a user's display name
    pub fn rename(&self, id: UserId, name: &str) -> Result<(), AppError> {
        let mut users = self.users.lock();
        let user = users.get_mut(&id).ok_or(AppError::UserNotFound(id))?;
        user.set_name(name.to_string());
        Ok(())
    }

    /// Remove a user, returning the record as it was at removal time
    pub fn remove(&self, id: UserId) -> Result<User, AppError> {
        let mut users = self.users.lock();
        let user = users.remove(&id).ok_or(AppError::UserNotFound(id))?;
        debug!("Removed {} (total users: {})", id, users.len());
        Ok(user)
    }

    /// Roster of `(id, name)` pairs ordered by id
    pub fn snapshot(&self) -> Vec<(UserId, String)> {
        self.users
            .lock()
            .values()
            .map(|u| (u.id, u.name.clone()))
            .collect()
    }

    /// Mailbox handles of every live user, ordered by id
    pub fn mailboxes(&self) -> Vec<(UserId, Mailbox)> {
        self.users
            .lock()
            .values()
            .map(|u| (u.id, u.mailbox.clone()))
            .collect()
    }

    /// Current display name of a user
    pub fn name_of(&self, id: UserId) -> Option<String> {
        self.users.lock().get(&id).map(|u| u.name.clone())
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.users.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.users.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.lock().is_empty()
    }
}
