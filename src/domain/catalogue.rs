//! Category reference data.
//!
//! Categories are fixed seed data loaded once at initialisation and treated
//! as read-only by every service in this backend.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Stable category identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(Uuid);

impl CategoryId {
    /// Generate a new random [`CategoryId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for CategoryId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A list category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Stable category identifier.
    #[schema(value_type = String)]
    pub id: CategoryId,
    /// Display name, e.g. "Movies".
    pub name: String,
    /// URL slug, e.g. "movies".
    pub slug: String,
    /// Short description shown in category pickers.
    pub description: Option<String>,
    /// Emoji icon.
    pub icon: Option<String>,
}

/// A category together with its number of lists, for browse pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    /// The category itself.
    #[serde(flatten)]
    pub category: Category,
    /// Number of lists filed under this category.
    pub list_count: i64,
}

/// Seed row for the fixed category catalogue.
#[derive(Debug, Clone, Copy)]
pub struct CategorySeed {
    pub name: &'static str,
    pub slug: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

/// The category catalogue shipped with the application.
pub const CATEGORY_SEEDS: &[CategorySeed] = &[
    CategorySeed {
        name: "Movies",
        slug: "movies",
        description: "Top ten lists about movies, films, and cinema",
        icon: "\u{1F3AC}",
    },
    CategorySeed {
        name: "Music",
        slug: "music",
        description: "Top ten lists about songs, albums, artists, and bands",
        icon: "\u{1F3B5}",
    },
    CategorySeed {
        name: "Books",
        slug: "books",
        description: "Top ten lists about books, novels, and literature",
        icon: "\u{1F4DA}",
    },
    CategorySeed {
        name: "TV Shows",
        slug: "tv-shows",
        description: "Top ten lists about television series and shows",
        icon: "\u{1F4FA}",
    },
    CategorySeed {
        name: "Video Games",
        slug: "video-games",
        description: "Top ten lists about video games and gaming",
        icon: "\u{1F3AE}",
    },
    CategorySeed {
        name: "Food & Drinks",
        slug: "food-drinks",
        description: "Top ten lists about food, restaurants, and beverages",
        icon: "\u{1F355}",
    },
    CategorySeed {
        name: "Sports",
        slug: "sports",
        description: "Top ten lists about sports, athletes, and teams",
        icon: "\u{26BD}",
    },
    CategorySeed {
        name: "Travel",
        slug: "travel",
        description: "Top ten lists about travel destinations and places",
        icon: "\u{2708}\u{FE0F}",
    },
    CategorySeed {
        name: "Technology",
        slug: "technology",
        description: "Top ten lists about tech, gadgets, and innovation",
        icon: "\u{1F4BB}",
    },
    CategorySeed {
        name: "Fashion",
        slug: "fashion",
        description: "Top ten lists about fashion, style, and trends",
        icon: "\u{1F457}",
    },
    CategorySeed {
        name: "Animals",
        slug: "animals",
        description: "Top ten lists about animals and wildlife",
        icon: "\u{1F43E}",
    },
    CategorySeed {
        name: "History",
        slug: "history",
        description: "Top ten lists about historical events and figures",
        icon: "\u{1F3DB}\u{FE0F}",
    },
    CategorySeed {
        name: "Science",
        slug: "science",
        description: "Top ten lists about science and discoveries",
        icon: "\u{1F52C}",
    },
    CategorySeed {
        name: "Art",
        slug: "art",
        description: "Top ten lists about art, artists, and creativity",
        icon: "\u{1F3A8}",
    },
    CategorySeed {
        name: "Other",
        slug: "other",
        description: "Top ten lists that don't fit other categories",
        icon: "\u{1F4CB}",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn seed_slugs_are_unique_and_canonical() {
        let mut seen = HashSet::new();
        for seed in CATEGORY_SEEDS {
            assert!(seen.insert(seed.slug), "duplicate slug {}", seed.slug);
            assert_eq!(
                crate::domain::credentials::slugify(seed.slug),
                seed.slug,
                "slug {} is not canonical",
                seed.slug
            );
        }
    }
}
