//! Gift classification for the wish-list tabs.
//!
//! A category stored on the gift at data entry always wins. Gifts without
//! one are classified by the first rule whose keyword occurs in the
//! lowercased name; gifts no rule matches stay in [`GiftCategory::All`].

use crate::domain::{Gift, GiftCategory, GiftId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy)]
pub struct CategoryRule {
    pub category: GiftCategory,
    pub keywords: &'static [&'static str],
}

/// Evaluated top to bottom; order is significant.
pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: GiftCategory::Money,
        keywords: &["money"],
    },
    CategoryRule {
        category: GiftCategory::Fashion,
        keywords: &["sneaker", "wear", "hoodie", "bag", "cologne"],
    },
    CategoryRule {
        category: GiftCategory::Tech,
        keywords: &["laptop", "tablet", "phone"],
    },
    CategoryRule {
        category: GiftCategory::Experience,
        keywords: &["getaway", "course", "seat"],
    },
];

pub fn classify_name(name: &str) -> GiftCategory {
    let name = name.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|kw| name.contains(kw)))
        .map(|rule| rule.category)
        .unwrap_or(GiftCategory::All)
}

pub fn effective_category(gift: &Gift) -> GiftCategory {
    gift.category.unwrap_or_else(|| classify_name(&gift.name))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTab {
    pub category: GiftCategory,
    pub label: String,
    pub gift_ids: Vec<GiftId>,
    pub available_count: usize,
}

/// Builds one tab per category in display order. The `all` tab holds every
/// gift; the others hold the gifts classified into them. Input order is kept.
pub fn partition(gifts: &[Gift]) -> Vec<CategoryTab> {
    GiftCategory::TAB_ORDER
        .iter()
        .map(|&category| {
            let members: Vec<&Gift> = gifts
                .iter()
                .filter(|gift| category == GiftCategory::All || effective_category(gift) == category)
                .collect();
            CategoryTab {
                category,
                label: category.label().to_string(),
                available_count: members.iter().filter(|g| !g.is_reserved()).count(),
                gift_ids: members.iter().map(|g| g.gift_id).collect(),
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/categories_tests.rs"]
mod tests;
