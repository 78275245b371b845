//! The closed category/subcategory taxonomy (spec §4.1 step 5, §4.3).
//!
//! Grounded in `rss_config.py`'s `RSS_FEEDS_CONFIG`/`CATEGORY_ORDER`: this
//! is the fixed table the clustering judge's subcategory is validated
//! against, and the source of the world-news-region list used by the
//! article selector's Phase 1(b) guarantee.

/// A category and the subcategories that belong to it, in declaration
/// order (used to order script topics by `(category, topic name)`).
pub struct Category {
    pub name: &'static str,
    pub subcategories: &'static [&'static str],
}

pub const CATEGORIES: &[Category] = &[
    Category {
        name: "World News",
        subcategories: &[
            "Africa",
            "Asia",
            "Europe",
            "Middle East",
            "North America",
            "South America",
            "Oceania",
        ],
    },
    Category {
        name: "Politics & Government",
        subcategories: &[
            "US Politics",
            "International Politics",
            "Elections",
            "Policy & Legislation",
            "Government Affairs",
        ],
    },
    Category {
        name: "Business",
        subcategories: &[
            "Markets",
            "Corporations & Earnings",
            "Startups & Entrepreneurship",
            "Economy and Policy",
        ],
    },
    Category {
        name: "Technology",
        subcategories: &[
            "AI & Machine Learning",
            "Gadgets & Consumer Tech",
            "Software & Apps",
            "Cybersecurity",
            "Hardware & Infrastructure",
        ],
    },
    Category {
        name: "Science & Environment",
        subcategories: &[
            "Space & Astronomy",
            "Biology",
            "Physics & Chemistry",
            "Research & Academia",
            "Climate & Weather",
            "Sustainability",
            "Conservation & Wildlife",
        ],
    },
    Category {
        name: "Sports",
        subcategories: &[
            "Football (Soccer)",
            "American Football",
            "Basketball",
            "Baseball",
            "Cricket",
            "Tennis",
            "F1",
            "Boxing",
            "MMA",
            "Golf",
            "Ice hockey",
            "Rugby",
            "Volleyball",
            "Table Tennis (Ping Pong)",
            "Athletics",
        ],
    },
    Category {
        name: "Arts & Culture",
        subcategories: &[
            "Celebrity News",
            "Gaming",
            "Film & TV",
            "Music",
            "Literature",
            "Art & Design",
            "Fashion",
        ],
    },
    Category {
        name: "Health",
        subcategories: &[
            "Public Health",
            "Medicine & Healthcare",
            "Fitness & Wellness",
            "Mental Health",
        ],
    },
    Category {
        name: "Lifestyle",
        subcategories: &[
            "Travel",
            "Food & Dining",
            "Home & Garden",
            "Relationships & Family",
            "Hobbies",
        ],
    },
];

pub const WORLD_NEWS: &str = "World News";
pub const GENERAL: &str = "General";

/// The seven World News regions (spec §4.1, §4.3). Any of these acting
/// as a `subcategory` folds into the single virtual topic `"World News"`
/// at the script-orchestration stage.
pub fn is_world_news_region(subcategory: &str) -> bool {
    CATEGORIES[0].subcategories.contains(&subcategory)
}

/// Maps a subcategory to its owning category via the fixed table. Falls
/// back to `"General"` (with the subcategory treated as unknown) when
/// the subcategory isn't in the closed taxonomy — spec §4.1 step 5.
pub fn category_for_subcategory(subcategory: &str) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .find(|c| c.subcategories.contains(&subcategory))
        .map(|c| c.name)
}

/// Per-category exponential decay rate used by the article selector's
/// combined-score formula (spec §4.3). Falls back to the table's
/// `default` entry for any category not explicitly listed.
pub fn decay_rate(category: &str) -> f64 {
    match category {
        "World News" => 0.05,
        "Politics & Government" => 0.02,
        "Business" => 0.025,
        "Technology" => 0.01,
        "Science & Environment" => 0.005,
        "Sports" => 0.03,
        "Arts & Culture" => 0.005,
        "Health" => 0.008,
        "Lifestyle" => 0.005,
        _ => 0.02,
    }
}

/// All declared subcategories in taxonomy order, flattened.
pub fn all_subcategories() -> Vec<&'static str> {
    CATEGORIES.iter().flat_map(|c| c.subcategories.iter().copied()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_news_regions_match_spec_list() {
        for region in [
            "Africa",
            "Asia",
            "Europe",
            "Middle East",
            "North America",
            "South America",
            "Oceania",
        ] {
            assert!(is_world_news_region(region));
        }
        assert!(!is_world_news_region("Tennis"));
    }

    #[test]
    fn category_lookup_resolves_known_subcategory() {
        assert_eq!(category_for_subcategory("AI & Machine Learning"), Some("Technology"));
        assert_eq!(category_for_subcategory("Tennis"), Some("Sports"));
        assert_eq!(category_for_subcategory("nonexistent-subcategory"), None);
    }

    #[test]
    fn decay_rate_falls_back_to_default_for_unknown_category() {
        assert_eq!(decay_rate("Totally Unknown"), 0.02);
        assert_eq!(decay_rate("World News"), 0.05);
    }
}
