//! The fixed set of expense categories and the rule for picking one from a message.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The category an expense is grouped under in summaries and charts.
///
/// The serialized names are the Portuguese words users type in their messages,
/// which is also how they are shown back in replies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Groceries, restaurants, snacks.
    #[serde(rename = "alimentação")]
    Food,
    /// Fuel, fares, rides.
    #[serde(rename = "transporte")]
    Transport,
    /// Pharmacy, appointments, insurance.
    #[serde(rename = "saúde")]
    Health,
    /// Cinema, trips, hobbies.
    #[serde(rename = "lazer")]
    Leisure,
    /// Rent, bills, maintenance.
    #[serde(rename = "moradia")]
    Housing,
    /// Anything that does not mention one of the other categories.
    #[default]
    #[serde(rename = "outros")]
    Other,
}

impl Category {
    /// Every category, in the order they are matched against message text.
    pub const ALL: [Category; 6] = [
        Category::Food,
        Category::Transport,
        Category::Health,
        Category::Leisure,
        Category::Housing,
        Category::Other,
    ];

    /// The lower-case name users write to pick this category.
    pub fn name(&self) -> &'static str {
        match self {
            Category::Food => "alimentação",
            Category::Transport => "transporte",
            Category::Health => "saúde",
            Category::Leisure => "lazer",
            Category::Housing => "moradia",
            Category::Other => "outros",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Pick the category for a message.
///
/// The first category whose name appears anywhere in `text` (ignoring case)
/// wins, so "mercado alimentação 150" is [Category::Food]. The whole message is
/// searched, not just the parsed description.
pub fn categorize(text: &str) -> Category {
    let text = text.to_lowercase();

    Category::ALL
        .into_iter()
        .find(|category| text.contains(category.name()))
        .unwrap_or_default()
}
