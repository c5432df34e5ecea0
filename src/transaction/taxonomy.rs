//! Fixed two-level category taxonomy.

use serde::{Deserialize, Serialize};

/// Top-level category. Declaration order is the order prompts offer them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Transport,
    Food,
    Essentials,
    Shopping,
}

/// Rendering hint for a category's control. Surfaces are free to ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
}

const TRANSPORT_SUBCATEGORIES: [&str; 4] = ["Cab", "Auto", "Bike", "Others"];
const FOOD_SUBCATEGORIES: [&str; 4] = ["Breakfast", "Lunch", "Dinner", "Snacks"];
const ESSENTIALS_SUBCATEGORIES: [&str; 4] = ["Household", "Groceries", "Utilities", "Others"];
const SHOPPING_SUBCATEGORIES: [&str; 4] = ["Apparel", "Gadgets", "Gifts", "Others"];

impl Category {
    /// All categories in prompt order.
    pub const ALL: [Category; 4] = [
        Category::Transport,
        Category::Food,
        Category::Essentials,
        Category::Shopping,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "Transport",
            Self::Food => "Food",
            Self::Essentials => "Essentials",
            Self::Shopping => "Shopping",
        }
    }

    /// Parse a category from its display name (exact match).
    pub fn from_name(name: &str) -> Option<Category> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// This category's subcategories, in prompt order.
    pub fn subcategories(&self) -> &'static [&'static str] {
        match self {
            Self::Transport => &TRANSPORT_SUBCATEGORIES,
            Self::Food => &FOOD_SUBCATEGORIES,
            Self::Essentials => &ESSENTIALS_SUBCATEGORIES,
            Self::Shopping => &SHOPPING_SUBCATEGORIES,
        }
    }

    /// Resolve `name` to this category's canonical subcategory string.
    pub fn subcategory(&self, name: &str) -> Option<&'static str> {
        self.subcategories().iter().copied().find(|s| *s == name)
    }

    pub fn button_style(&self) -> ButtonStyle {
        match self {
            Self::Transport => ButtonStyle::Secondary,
            Self::Food | Self::Essentials => ButtonStyle::Primary,
            Self::Shopping => ButtonStyle::Success,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_categories_with_four_subcategories_each() {
        assert_eq!(Category::ALL.len(), 4);
        for category in Category::ALL {
            assert_eq!(category.subcategories().len(), 4, "{category}");
        }
    }

    #[test]
    fn subcategory_lists_are_fixed_and_ordered() {
        assert_eq!(Category::Food.subcategories(), ["Breakfast", "Lunch", "Dinner", "Snacks"]);
        assert_eq!(Category::Transport.subcategories(), ["Cab", "Auto", "Bike", "Others"]);
        assert_eq!(
            Category::Shopping.subcategories(),
            ["Apparel", "Gadgets", "Gifts", "Others"]
        );
        assert_eq!(
            Category::Essentials.subcategories(),
            ["Household", "Groceries", "Utilities", "Others"]
        );
    }

    #[test]
    fn subcategory_lookup_is_scoped_to_category() {
        assert_eq!(Category::Food.subcategory("Lunch"), Some("Lunch"));
        assert_eq!(Category::Food.subcategory("Cab"), None);
        assert_eq!(Category::Transport.subcategory("lunch"), None);
    }

    #[test]
    fn name_roundtrip_matches_serde() {
        for category in Category::ALL {
            assert_eq!(Category::from_name(category.as_str()), Some(category));
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{category}\""));
        }
        assert_eq!(Category::from_name("food"), None);
    }
}
