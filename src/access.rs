//! The list of users allowed to talk to the bot.

use serde::{Deserialize, Serialize};

use crate::{Error, store::DocumentStore, user::UserId};

/// The identifiers of every user allowed to use the bot.
///
/// Stored as a JSON array of identifier strings, in the order they were
/// granted access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessList(Vec<UserId>);

impl AccessList {
    /// Create an access list holding `users`.
    pub fn new(users: Vec<UserId>) -> Self {
        Self(users)
    }

    /// Whether `user` is allowed to use the bot.
    pub fn contains(&self, user: &UserId) -> bool {
        self.0.contains(user)
    }

    /// Allow `user` to use the bot.
    ///
    /// Returns `false` if the user already had access.
    pub fn grant(&mut self, user: UserId) -> bool {
        if self.contains(&user) {
            false
        } else {
            self.0.push(user);
            true
        }
    }
}

/// Check whether `user` is on the stored access list.
///
/// # Errors
///
/// Returns an error if the access list could not be loaded.
pub fn is_authorized(store: &dyn DocumentStore<AccessList>, user: &UserId) -> Result<bool, Error> {
    Ok(store.load()?.contains(user))
}

/// Add `user` to the stored access list unless it is already there.
///
/// Returns `true` if the user was added. The list is only written when it
/// changes.
///
/// # Errors
///
/// Returns an error if the access list could not be loaded or saved.
pub fn grant_access(store: &dyn DocumentStore<AccessList>, user: UserId) -> Result<bool, Error> {
    let mut access_list = store.load()?;

    if !access_list.grant(user) {
        return Ok(false);
    }

    store.save(&access_list)?;

    Ok(true)
}
