//! The ledger: every user's expenses, grouped by month.
//!
//! The ledger is loaded whole from a [DocumentStore](crate::DocumentStore),
//! changed in memory with the methods below and saved whole again.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{expense::Expense, month::MonthKey, user::UserId};

/// A mapping from user to month to the expenses logged in that month.
///
/// A user or month entry only exists while it holds at least one expense.
/// Expenses are kept in the order they were logged and are addressed by their
/// position in that order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger(BTreeMap<UserId, BTreeMap<MonthKey, Vec<Expense>>>);

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `expense` to the end of the user's list for `month`.
    pub fn append(&mut self, user: &UserId, month: MonthKey, expense: Expense) {
        self.0
            .entry(user.clone())
            .or_default()
            .entry(month)
            .or_default()
            .push(expense);
    }

    /// Remove the expense at the zero-based `index` of the user's list for `month`.
    ///
    /// Returns `false` and leaves the ledger untouched if there is no expense at
    /// `index`. Removing the last expense of a month removes the month.
    pub fn delete_at(&mut self, user: &UserId, month: MonthKey, index: usize) -> bool {
        let Some(months) = self.0.get_mut(user) else {
            return false;
        };

        let Some(expenses) = months.get_mut(&month) else {
            return false;
        };

        if index >= expenses.len() {
            return false;
        }

        expenses.remove(index);

        if expenses.is_empty() {
            months.remove(&month);
        }

        if months.is_empty() {
            self.0.remove(user);
        }

        true
    }

    /// Remove every expense the user logged in `month`.
    ///
    /// Returns `false` if there was nothing to remove.
    pub fn clear_month(&mut self, user: &UserId, month: MonthKey) -> bool {
        let Some(months) = self.0.get_mut(user) else {
            return false;
        };

        let removed = months.remove(&month).is_some();

        if months.is_empty() {
            self.0.remove(user);
        }

        removed
    }

    /// The expenses the user logged in `month`, oldest first.
    pub fn get_month(&self, user: &UserId, month: MonthKey) -> &[Expense] {
        self.0
            .get(user)
            .and_then(|months| months.get(&month))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
