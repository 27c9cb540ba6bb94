//! Identifiers for the people talking to the bot.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The server suffix the messaging network uses for personal accounts.
pub const USER_SERVER: &str = "s.whatsapp.net";

/// The legacy server suffix some clients still report for personal accounts.
const LEGACY_USER_SERVER: &str = "c.us";

/// A newtype wrapper for the messaging network's user identifiers, e.g.
/// `5511912345678@s.whatsapp.net`.
///
/// This is both the key of the ledger and the entry type of the access list.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap an identifier exactly as the transport delivered it.
    pub fn new(raw: &str) -> Self {
        Self(raw.to_owned())
    }

    /// Normalize an identifier reported by the transport.
    ///
    /// Drops the device part (`user:12@server` becomes `user@server`) and maps
    /// the legacy `c.us` server to [USER_SERVER], so that every device of one
    /// account shares a ledger.
    pub fn normalized(raw: &str) -> Self {
        let Some((user, server)) = raw.split_once('@') else {
            return Self::new(raw);
        };

        let user = user.split_once(':').map_or(user, |(user, _device)| user);
        let server = if server == LEGACY_USER_SERVER {
            USER_SERVER
        } else {
            server
        };

        Self(format!("{user}@{server}"))
    }

    /// Derive the identifier of the account registered to `phone_number`.
    ///
    /// Everything but digits is stripped, so "+55 11 91234-5678" becomes
    /// `5511912345678@s.whatsapp.net`. Returns `None` if there are no digits.
    pub fn from_phone_number(phone_number: &str) -> Option<Self> {
        let digits: String = phone_number
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();

        if digits.is_empty() {
            None
        } else {
            Some(Self(format!("{digits}@{USER_SERVER}")))
        }
    }

    /// The part of the identifier before the `@`, usually a phone number.
    pub fn local_part(&self) -> &str {
        self.0.split_once('@').map_or(&self.0, |(user, _)| user)
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
