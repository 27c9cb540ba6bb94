//! The expense record and the parser that turns chat messages into expenses.

use std::{fmt::Display, str::FromStr, sync::OnceLock};

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::category::Category;

/// One logged expense.
///
/// The serialized field names match the ledger files written by earlier
/// versions of the bot, so existing data loads unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// What the money was spent on, e.g. "cafezinho".
    #[serde(rename = "descricao")]
    pub description: String,
    /// The amount spent in reais. Always greater than zero.
    #[serde(rename = "valor", with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// The day the expense happened.
    #[serde(rename = "data")]
    pub date: ExpenseDate,
    /// The category used to group the expense in summaries.
    #[serde(rename = "categoria", default)]
    pub category: Category,
}

/// An expense read from a message that has not been categorized yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseCandidate {
    /// The text before the amount, trimmed. May be empty.
    pub description: String,
    /// The amount, greater than zero.
    pub amount: Decimal,
    /// The date written after the amount, or the day the message was parsed.
    pub date: Date,
}

impl ExpenseCandidate {
    /// Attach a category, producing a record ready to be stored.
    pub fn into_expense(self, category: Category) -> Expense {
        Expense {
            description: self.description,
            amount: self.amount,
            date: ExpenseDate::Day(self.date),
            category,
        }
    }
}

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// The date stored with an expense.
///
/// Older ledger files may hold dates that are not real calendar days, such as
/// "2025-02-30". Those are kept verbatim so that one bad record does not make
/// the whole ledger unreadable, and they are written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpenseDate {
    /// A valid calendar day.
    Day(Date),
    /// Text that could not be read as a calendar day.
    Unrecognized(String),
}

impl ExpenseDate {
    /// The day of the month as two digits, e.g. "05", used in month listings.
    pub fn day_label(&self) -> String {
        match self {
            ExpenseDate::Day(date) => format!("{:02}", date.day()),
            ExpenseDate::Unrecognized(raw) => raw
                .rsplit_once('-')
                .map_or(raw.as_str(), |(_, day)| day)
                .to_owned(),
        }
    }
}

impl From<Date> for ExpenseDate {
    fn from(date: Date) -> Self {
        ExpenseDate::Day(date)
    }
}

impl Display for ExpenseDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpenseDate::Day(date) => {
                let text = date.format(ISO_DATE).map_err(|_| std::fmt::Error)?;
                f.write_str(&text)
            }
            ExpenseDate::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for ExpenseDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ExpenseDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;

        match Date::parse(&raw, ISO_DATE) {
            Ok(date) => Ok(ExpenseDate::Day(date)),
            Err(error) => {
                tracing::warn!("keeping unreadable expense date \"{raw}\" as text: {error}");
                Ok(ExpenseDate::Unrecognized(raw))
            }
        }
    }
}

fn expense_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();

    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(.+?)\s+(\d+[.,]?\d*)(?:\s*(?:reais|real|R\$))?(?:\s+(\d{4}-\d{2}-\d{2}))?")
            .unwrap()
    })
}

/// Parse an expense from free text such as "cafezinho 7,50" or
/// "cinema lazer 50 reais 2025-05-20".
///
/// The message is read as a description, an amount using either `.` or `,` as
/// the decimal separator, an optional currency word (ignored) and an optional
/// ISO date. Without a date the expense is dated `today`.
///
/// Returns `None` if there is no amount, if the amount is zero, or if the date
/// is not a real calendar day.
pub fn parse(text: &str, today: Date) -> Option<ExpenseCandidate> {
    let captures = expense_pattern().captures(text)?;

    let description = captures.get(1)?.as_str().trim().to_owned();
    let amount = parse_amount(captures.get(2)?.as_str())?;
    let date = match captures.get(3) {
        Some(date) => Date::parse(date.as_str(), ISO_DATE).ok()?,
        None => today,
    };

    Some(ExpenseCandidate {
        description,
        amount,
        date,
    })
}

fn parse_amount(raw: &str) -> Option<Decimal> {
    let normalized = raw.replace(',', ".");
    // "7," and "7." are whole amounts.
    let amount = Decimal::from_str(normalized.trim_end_matches('.')).ok()?;

    if amount > Decimal::ZERO {
        Some(amount)
    } else {
        None
    }
}
