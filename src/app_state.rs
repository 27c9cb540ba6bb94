//! Implements a struct that holds the state shared by the webhook server and the bot.

use std::sync::{Arc, Mutex};

use crate::{
    Error, access::AccessList, ledger::Ledger, store::DocumentStore,
    timezone::get_local_offset,
};

/// A document store shared between tasks.
///
/// Hold the lock for the whole load-change-save sequence so that concurrent
/// commands cannot overwrite each other's changes.
pub type SharedStore<T> = Arc<Mutex<dyn DocumentStore<T>>>;

/// The state of the application.
#[derive(Clone)]
pub struct AppState {
    /// Every user's expenses.
    pub ledger: SharedStore<Ledger>,

    /// The users allowed to talk to the bot.
    pub access_list: SharedStore<AccessList>,

    /// The shared secret webhook callers must present.
    pub webhook_token: Arc<str>,

    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
}

impl AppState {
    /// Create a new [AppState] from the two document stores.
    ///
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "America/Sao_Paulo".
    ///
    /// # Errors
    /// Returns an [Error::InvalidTimezone] if `local_timezone` is not a known timezone.
    pub fn new(
        ledger: impl DocumentStore<Ledger> + 'static,
        access_list: impl DocumentStore<AccessList> + 'static,
        webhook_token: &str,
        local_timezone: &str,
    ) -> Result<Self, Error> {
        if get_local_offset(local_timezone).is_none() {
            return Err(Error::InvalidTimezone(local_timezone.to_owned()));
        }

        let ledger: SharedStore<Ledger> = Arc::new(Mutex::new(ledger));
        let access_list: SharedStore<AccessList> = Arc::new(Mutex::new(access_list));

        Ok(Self {
            ledger,
            access_list,
            webhook_token: Arc::from(webhook_token),
            local_timezone: local_timezone.to_owned(),
        })
    }
}
